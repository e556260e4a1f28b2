//! Scan session state machine
//!
//! One scan walks `Start -> Confirm -> Analyzing -> Result`. Transitions are
//! pure: each takes the current session by reference and returns the next one,
//! so a front end can persist the session (JSON) between requests.
//!
//! ```rust
//! use objectscan_core::session::{Session, StepKind};
//!
//! let session = Session::new();
//! let session = session.capture("object.jpg", "Gemeente Arnhem").unwrap();
//! assert_eq!(session.kind(), StepKind::Confirm);
//!
//! let session = session.retake().unwrap();
//! assert_eq!(session.kind(), StepKind::Start);
//! assert_eq!(session.location(), "Gemeente Arnhem");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ObjectScanError, Result};
use crate::record::ScanRecord;
use crate::reply::ParsedReply;
use crate::taxonomy::Resolution;

/// Image and location chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub image: PathBuf,
    pub location: String,
}

/// Everything produced by analysing one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Raw reply text (the degraded placeholder when the API failed)
    pub reply: String,
    pub parsed: ParsedReply,
    pub resolution: Resolution,
    pub record: ScanRecord,
    /// The API call failed and the placeholder reply was used
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Start,
    Confirm {
        capture: Capture,
    },
    Analyzing {
        capture: Capture,
    },
    Result {
        capture: Capture,
        outcome: Box<ScanOutcome>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Start,
    Confirm,
    Analyzing,
    Result,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Confirm => "confirm",
            Self::Analyzing => "analyzing",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Start => StepKind::Start,
            Self::Confirm { .. } => StepKind::Confirm,
            Self::Analyzing { .. } => StepKind::Analyzing,
            Self::Result { .. } => StepKind::Result,
        }
    }
}

/// Per-user scan session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    step: Step,
    /// Last location entered, prefilled on the next capture
    #[serde(default)]
    location: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            step: Step::Start,
            location: String::new(),
        }
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn kind(&self) -> StepKind {
        self.step.kind()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Capture of the current step, if any
    pub fn capture_ref(&self) -> Option<&Capture> {
        match &self.step {
            Step::Start => None,
            Step::Confirm { capture }
            | Step::Analyzing { capture }
            | Step::Result { capture, .. } => Some(capture),
        }
    }

    pub fn outcome(&self) -> Option<&ScanOutcome> {
        match &self.step {
            Step::Result { outcome, .. } => Some(&**outcome),
            _ => None,
        }
    }

    fn with_step(&self, step: Step) -> Self {
        Self {
            step,
            location: self.location.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> ObjectScanError {
        ObjectScanError::InvalidTransition {
            action,
            step: self.kind(),
        }
    }

    /// Start -> Confirm
    pub fn capture(&self, image: impl AsRef<Path>, location: &str) -> Result<Self> {
        match self.step {
            Step::Start => {
                let location = location.trim().to_string();
                Ok(Self {
                    step: Step::Confirm {
                        capture: Capture {
                            image: image.as_ref().to_path_buf(),
                            location: location.clone(),
                        },
                    },
                    location,
                })
            }
            _ => Err(self.invalid("capture")),
        }
    }

    /// Confirm -> Start
    pub fn retake(&self) -> Result<Self> {
        match self.step {
            Step::Confirm { .. } => Ok(self.with_step(Step::Start)),
            _ => Err(self.invalid("retake")),
        }
    }

    /// Confirm -> Analyzing
    pub fn submit(&self) -> Result<Self> {
        match &self.step {
            Step::Confirm { capture } => Ok(self.with_step(Step::Analyzing {
                capture: capture.clone(),
            })),
            _ => Err(self.invalid("submit")),
        }
    }

    /// Analyzing -> Result
    pub fn complete(&self, outcome: ScanOutcome) -> Result<Self> {
        match &self.step {
            Step::Analyzing { capture } => Ok(self.with_step(Step::Result {
                capture: capture.clone(),
                outcome: Box::new(outcome),
            })),
            _ => Err(self.invalid("complete")),
        }
    }

    /// Any step -> Start
    pub fn restart(&self) -> Self {
        self.with_step(Step::Start)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Score;
    use crate::taxonomy::CategoryResolver;

    fn outcome() -> ScanOutcome {
        let reply = "Beschrijving: Stoel\nScore: 4\nCategorie: stoel".to_string();
        let parsed = ParsedReply::parse(&reply);
        let resolution = CategoryResolver::builtin().resolve("stoel");
        let record = ScanRecord::new(
            "Arnhem",
            Path::new("object.jpg"),
            &parsed.description,
            parsed.label.as_deref().unwrap_or_default(),
            &resolution,
            Score::Known(4),
        );
        ScanOutcome {
            reply,
            parsed,
            resolution,
            record,
            degraded: false,
        }
    }

    #[test]
    fn test_happy_path() {
        let session = Session::new()
            .capture("object.jpg", " Arnhem ")
            .unwrap()
            .submit()
            .unwrap();
        assert_eq!(session.kind(), StepKind::Analyzing);
        assert_eq!(session.capture_ref().unwrap().location, "Arnhem");

        let session = session.complete(outcome()).unwrap();
        assert_eq!(session.kind(), StepKind::Result);
        assert_eq!(session.outcome().unwrap().resolution.category, "Meubels");

        let session = session.restart();
        assert_eq!(session.kind(), StepKind::Start);
        assert_eq!(session.location(), "Arnhem");
        assert!(session.capture_ref().is_none());
    }

    #[test]
    fn test_invalid_transitions() {
        let start = Session::new();
        assert!(start.submit().is_err());
        assert!(start.retake().is_err());
        assert!(start.complete(outcome()).is_err());

        let confirm = start.capture("a.jpg", "").unwrap();
        assert!(confirm.capture("b.jpg", "").is_err());
        assert!(confirm.complete(outcome()).is_err());

        let analyzing = confirm.submit().unwrap();
        assert!(analyzing.retake().is_err());
        assert!(analyzing.submit().is_err());
    }

    #[test]
    fn test_invalid_transition_error_names_step() {
        let err = Session::new().submit().unwrap_err();
        match err {
            ObjectScanError::InvalidTransition { action, step } => {
                assert_eq!(action, "submit");
                assert_eq!(step, StepKind::Start);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transitions_do_not_mutate_input() {
        let start = Session::new();
        let confirm = start.capture("a.jpg", "Ede").unwrap();
        assert_eq!(start.kind(), StepKind::Start);
        assert_eq!(start.location(), "");
        assert_eq!(confirm.location(), "Ede");
    }

    #[test]
    fn test_json_roundtrip() {
        let session = Session::new()
            .capture("object.jpg", "Arnhem")
            .unwrap()
            .submit()
            .unwrap()
            .complete(outcome())
            .unwrap();

        let json = session.to_json().unwrap();
        assert!(json.contains("\"step\": \"result\""));
        let restored = Session::from_json(&json).unwrap();
        assert_eq!(restored, session);
    }
}
