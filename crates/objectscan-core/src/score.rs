//! Condition score (0-5) and keyword normalization
//!
//! ```rust
//! use objectscan_core::score::{score_from_keywords, Score};
//!
//! assert_eq!(score_from_keywords("Nieuwstaat"), Score::Known(5));
//! assert_eq!(score_from_keywords("zo goed als nieuw"), Score::Known(5));
//! assert_eq!(score_from_keywords("onduidelijk"), Score::Unknown);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ObjectScanError, Result};

pub const MAX_SCORE: u8 = 5;

/// Fixed keyword table, including the inflected forms used before a noun
/// ("in goede staat"). When several keywords occur, the longest one wins.
pub const SCORE_KEYWORDS: &[(&str, u8)] = &[
    ("nieuwstaat", 5),
    ("als nieuw", 5),
    ("nieuw", 5),
    ("nieuwe", 5),
    ("zeer goed", 4),
    ("zeer goede", 4),
    ("uitstekend", 4),
    ("uitstekende", 4),
    ("goed", 3),
    ("goede", 3),
    ("redelijk", 2),
    ("redelijke", 2),
    ("matig", 2),
    ("matige", 2),
    ("slecht", 1),
    ("slechte", 1),
    ("beschadigd", 1),
    ("beschadigde", 1),
    ("zeer slecht", 0),
    ("zeer slechte", 0),
    ("kapot", 0),
    ("kapotte", 0),
    ("niet bruikbaar", 0),
    ("niet", 0),
];

/// Condition score of a scanned object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Known(u8),
    #[default]
    Unknown,
}

impl Score {
    /// `None` when the value is outside 0-5
    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_SCORE).then_some(Self::Known(value))
    }

    pub fn value(&self) -> Option<u8> {
        match self {
            Self::Known(v) => Some(*v),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Integer written to the results log
    pub fn persisted(&self, missing: MissingScore) -> i32 {
        match self {
            Self::Known(v) => i32::from(*v),
            Self::Unknown => missing.value(),
        }
    }

    /// Inverse of [`Score::persisted`]. Out-of-range values read back as unknown.
    pub fn from_persisted(value: i64, missing: MissingScore) -> Self {
        if missing == MissingScore::MinusOne && value == -1 {
            return Self::Unknown;
        }
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{}/{}", v, MAX_SCORE),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Value persisted for an unknown score.
///
/// Both values occur in existing logs, so the choice is left to configuration.
/// With `Zero`, an unknown score is indistinguishable from a real 0 once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MissingScore {
    #[default]
    Zero,
    MinusOne,
}

impl MissingScore {
    pub fn value(&self) -> i32 {
        match self {
            Self::Zero => 0,
            Self::MinusOne => -1,
        }
    }
}

impl TryFrom<i64> for MissingScore {
    type Error = ObjectScanError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Zero),
            -1 => Ok(Self::MinusOne),
            other => Err(ObjectScanError::ConfigValue {
                key: "score.missing".to_string(),
                message: format!("expected 0 or -1, got {}", other),
            }),
        }
    }
}

impl From<MissingScore> for i64 {
    fn from(missing: MissingScore) -> Self {
        i64::from(missing.value())
    }
}

/// Map a free-text condition description onto the 0-5 scale
pub fn score_from_keywords(text: &str) -> Score {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    if words.is_empty() {
        return Score::Unknown;
    }
    let haystack = format!(" {} ", words.join(" "));

    SCORE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| haystack.contains(&format!(" {} ", keyword)))
        .max_by_key(|(keyword, _)| keyword.len())
        .map(|&(_, score)| Score::Known(score))
        .unwrap_or(Score::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_maps_to_its_score() {
        for &(keyword, score) in SCORE_KEYWORDS {
            assert_eq!(
                score_from_keywords(keyword),
                Score::Known(score),
                "keyword {}",
                keyword
            );
        }
    }

    #[test]
    fn test_unmapped_text_is_unknown() {
        assert_eq!(score_from_keywords(""), Score::Unknown);
        assert_eq!(score_from_keywords("   "), Score::Unknown);
        assert_eq!(score_from_keywords("blauw en rond"), Score::Unknown);
        // substring of a word is not a keyword hit
        assert_eq!(score_from_keywords("goedkoop"), Score::Unknown);
    }

    #[test]
    fn test_longest_keyword_wins() {
        assert_eq!(score_from_keywords("Zeer slecht!"), Score::Known(0));
        assert_eq!(score_from_keywords("in zeer goede staat"), Score::Known(4));
        assert_eq!(score_from_keywords("Staat: zeer goed."), Score::Known(4));
        assert_eq!(score_from_keywords("niet bruikbaar meer"), Score::Known(0));
        assert_eq!(score_from_keywords("niet slecht"), Score::Known(1));
    }

    #[test]
    fn test_inflected_adjectives() {
        let cases = [
            ("in goede staat", 3),
            ("een nieuwe stoel", 5),
            ("uitstekende staat", 4),
            ("redelijke staat", 2),
            ("matige kwaliteit", 2),
            ("slechte staat", 1),
            ("beschadigde tafel", 1),
            ("in zeer slechte staat", 0),
            ("kapotte lamp", 0),
        ];
        for (text, score) in cases {
            assert_eq!(score_from_keywords(text), Score::Known(score), "{}", text);
        }
    }

    #[test]
    fn test_score_new_range() {
        assert_eq!(Score::new(0), Some(Score::Known(0)));
        assert_eq!(Score::new(5), Some(Score::Known(5)));
        assert_eq!(Score::new(6), None);
    }

    #[test]
    fn test_persisted_uses_sentinel() {
        assert_eq!(Score::Known(3).persisted(MissingScore::MinusOne), 3);
        assert_eq!(Score::Unknown.persisted(MissingScore::Zero), 0);
        assert_eq!(Score::Unknown.persisted(MissingScore::MinusOne), -1);
    }

    #[test]
    fn test_from_persisted() {
        assert_eq!(
            Score::from_persisted(-1, MissingScore::MinusOne),
            Score::Unknown
        );
        assert_eq!(
            Score::from_persisted(0, MissingScore::Zero),
            Score::Known(0)
        );
        assert_eq!(Score::from_persisted(4, MissingScore::Zero), Score::Known(4));
        assert_eq!(Score::from_persisted(9, MissingScore::Zero), Score::Unknown);
        assert_eq!(Score::from_persisted(-1, MissingScore::Zero), Score::Unknown);
    }

    #[test]
    fn test_missing_score_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            missing: MissingScore,
        }
        let w: Wrapper = toml::from_str("missing = -1").unwrap();
        assert_eq!(w.missing, MissingScore::MinusOne);
        let w: Wrapper = toml::from_str("missing = 0").unwrap();
        assert_eq!(w.missing, MissingScore::Zero);
        assert!(toml::from_str::<Wrapper>("missing = 7").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Score::Known(4).to_string(), "4/5");
        assert_eq!(Score::Unknown.to_string(), "unknown");
    }
}
