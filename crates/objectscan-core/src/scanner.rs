//! Per-scan pipeline
//!
//! `Analyzing` session in, `Result` session out: call the vision client, parse
//! the reply, resolve the category and append the record to the results log.

use std::path::Path;

use crate::config::Config;
use crate::error::{ObjectScanError, Result};
use crate::record::{CsvLog, ResultLog, ScanRecord};
use crate::reply::ParsedReply;
use crate::session::{Capture, ScanOutcome, Session, Step};
use crate::taxonomy::{CategoryResolver, Taxonomy};
use crate::vision::{build_prompt, ChatCompletionClient, VisionClient, DEGRADED_REPLY};

pub struct Scanner<C, L> {
    resolver: CategoryResolver,
    client: C,
    log: L,
    prompt: String,
}

impl Scanner<ChatCompletionClient, CsvLog> {
    /// Scanner wired from configuration: taxonomy file, API client and CSV log
    pub fn from_config(config: &Config, base_dir: &Path) -> Result<Self> {
        let taxonomy = Taxonomy::load_or_builtin(config.taxonomy_path(base_dir).as_deref())?;
        let resolver = CategoryResolver::new(taxonomy, config.resolver.threshold);
        let client = ChatCompletionClient::new(&config.api)?;
        let log = CsvLog::new(config.log_path(base_dir), config.score.missing);
        Ok(Self::new(resolver, client, log))
    }
}

impl<C: VisionClient, L: ResultLog> Scanner<C, L> {
    pub fn new(resolver: CategoryResolver, client: C, log: L) -> Self {
        let prompt = build_prompt(&resolver.taxonomy().category_names());
        Self {
            resolver,
            client,
            log,
            prompt,
        }
    }

    pub fn resolver(&self) -> &CategoryResolver {
        &self.resolver
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Analyse the capture of an `Analyzing` session and log the result.
    ///
    /// An API failure degrades to the placeholder reply. Any other client
    /// error (unreadable image) and any log failure abort the action and leave
    /// the session untouched.
    pub fn analyze(&mut self, session: &Session) -> Result<Session> {
        let capture = match session.step() {
            Step::Analyzing { capture } => capture,
            _ => {
                return Err(ObjectScanError::InvalidTransition {
                    action: "analyze",
                    step: session.kind(),
                })
            }
        };

        let (reply, degraded) = match self.client.describe(&capture.image, &self.prompt) {
            Ok(reply) => (reply, false),
            Err(e @ ObjectScanError::Api { .. }) => {
                tracing::warn!(
                    error = %e,
                    image = %capture.image.display(),
                    "analysis failed, using placeholder"
                );
                (DEGRADED_REPLY.to_string(), true)
            }
            Err(e) => return Err(e),
        };

        let outcome = self.evaluate(capture, reply, degraded);
        self.log.append(&outcome.record)?;

        tracing::info!(
            category = %outcome.record.category,
            kind = %outcome.record.match_kind,
            score = %outcome.record.score,
            degraded,
            "scan logged"
        );
        session.complete(outcome)
    }

    /// Parse and resolve a reply without touching the client or the log
    pub fn evaluate(&self, capture: &Capture, reply: String, degraded: bool) -> ScanOutcome {
        let parsed = ParsedReply::parse(&reply);
        let label = parsed.label.clone().unwrap_or_default();
        let resolution = self.resolver.resolve(&label);

        if !parsed.is_structured() {
            tracing::debug!(
                label_source = ?parsed.label_source,
                score_source = ?parsed.score_source,
                "reply not in requested format"
            );
        }

        let record = ScanRecord::new(
            &capture.location,
            &capture.image,
            &parsed.description,
            &label,
            &resolution,
            parsed.score,
        );

        ScanOutcome {
            reply,
            parsed,
            resolution,
            record,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Score;
    use crate::session::StepKind;
    use crate::taxonomy::{MatchKind, UNKNOWN_CATEGORY};
    use std::cell::RefCell;

    struct FakeClient {
        reply: Option<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl VisionClient for FakeClient {
        fn describe(&self, _image: &Path, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone().ok_or_else(|| ObjectScanError::Api {
                message: "connection refused".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryLog {
        records: Vec<ScanRecord>,
    }

    impl ResultLog for MemoryLog {
        fn append(&mut self, record: &ScanRecord) -> Result<()> {
            self.records.push(record.clone());
            Ok(())
        }
    }

    struct MissingImageClient;

    impl VisionClient for MissingImageClient {
        fn describe(&self, image: &Path, _prompt: &str) -> Result<String> {
            Err(ObjectScanError::ImageNotFound {
                path: image.to_path_buf(),
            })
        }
    }

    struct LockedLog;

    impl ResultLog for LockedLog {
        fn append(&mut self, _record: &ScanRecord) -> Result<()> {
            Err(ObjectScanError::LogLocked {
                path: "resultaten_log.csv".into(),
            })
        }
    }

    fn analyzing() -> Session {
        Session::new()
            .capture("object.jpg", "Gemeente Arnhem")
            .unwrap()
            .submit()
            .unwrap()
    }

    #[test]
    fn test_analyze_structured_reply() {
        let client =
            FakeClient::replying("Beschrijving: Houten kruk\nScore: 3\nCategorie: zitmeubel");
        let mut scanner = Scanner::new(CategoryResolver::builtin(), client, MemoryLog::default());

        let session = scanner.analyze(&analyzing()).unwrap();
        assert_eq!(session.kind(), StepKind::Result);

        let outcome = session.outcome().unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.resolution.category, "Meubels");
        assert_eq!(outcome.resolution.kind, MatchKind::Synonym);
        assert_eq!(outcome.record.score, Score::Known(3));
        assert_eq!(outcome.record.location, "Gemeente Arnhem");
        assert_eq!(outcome.record.description, "Houten kruk");

        assert_eq!(scanner.log().records.len(), 1);
        assert_eq!(scanner.log().records[0].id, outcome.record.id);
    }

    #[test]
    fn test_prompt_contains_taxonomy_categories() {
        let client = FakeClient::replying("Categorie: mok");
        let mut scanner = Scanner::new(CategoryResolver::builtin(), client, MemoryLog::default());
        scanner.analyze(&analyzing()).unwrap();

        let prompts = scanner.client.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Meubels"));
        assert!(prompts[0].contains("Keukengerei"));
    }

    #[test]
    fn test_api_failure_degrades_and_still_logs() {
        let mut scanner = Scanner::new(
            CategoryResolver::builtin(),
            FakeClient::failing(),
            MemoryLog::default(),
        );

        let session = scanner.analyze(&analyzing()).unwrap();
        let outcome = session.outcome().unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.reply, DEGRADED_REPLY);
        assert_eq!(outcome.resolution.category, UNKNOWN_CATEGORY);
        assert_eq!(outcome.record.score, Score::Known(0));
        assert_eq!(scanner.log().records.len(), 1);
    }

    #[test]
    fn test_missing_image_is_not_degraded() {
        let mut scanner = Scanner::new(
            CategoryResolver::builtin(),
            MissingImageClient,
            MemoryLog::default(),
        );

        let session = analyzing();
        let err = scanner.analyze(&session).unwrap_err();
        assert!(matches!(err, ObjectScanError::ImageNotFound { .. }));
        assert_eq!(session.kind(), StepKind::Analyzing);
        assert!(scanner.log().records.is_empty());
    }

    #[test]
    fn test_unparseable_reply_defaults_to_unknown() {
        let client = FakeClient::replying("");
        let mut scanner = Scanner::new(CategoryResolver::builtin(), client, MemoryLog::default());

        let session = scanner.analyze(&analyzing()).unwrap();
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.resolution.kind, MatchKind::None);
        assert_eq!(outcome.record.score, Score::Unknown);
    }

    #[test]
    fn test_locked_log_abandons_action() {
        let client = FakeClient::replying("Categorie: stoel\nScore: 4");
        let mut scanner = Scanner::new(CategoryResolver::builtin(), client, LockedLog);

        let session = analyzing();
        let err = scanner.analyze(&session).unwrap_err();
        assert!(matches!(err, ObjectScanError::LogLocked { .. }));
        assert_eq!(session.kind(), StepKind::Analyzing);
    }

    #[test]
    fn test_analyze_requires_analyzing_step() {
        let client = FakeClient::replying("Categorie: stoel");
        let mut scanner = Scanner::new(CategoryResolver::builtin(), client, MemoryLog::default());

        let confirm = Session::new().capture("object.jpg", "").unwrap();
        assert!(matches!(
            scanner.analyze(&confirm),
            Err(ObjectScanError::InvalidTransition { .. })
        ));
        assert!(scanner.log().records.is_empty());
        assert!(scanner.client.prompts.borrow().is_empty());
    }

    #[test]
    fn test_evaluate_fuzzy_label() {
        let scanner = Scanner::new(
            CategoryResolver::builtin(),
            FakeClient::failing(),
            MemoryLog::default(),
        );
        let capture = Capture {
            image: "object.jpg".into(),
            location: String::new(),
        };
        let reply = "Score: 2\nCategorie: stoeltje".to_string();
        let outcome = scanner.evaluate(&capture, reply, false);
        assert_eq!(outcome.resolution.kind, MatchKind::Fuzzy);
        assert_eq!(outcome.resolution.category, "Meubels");
        assert_eq!(outcome.record.label, "stoeltje");
    }
}
