//! Category Resolver
//!
//! Maps a free-text label from the model's reply onto a taxonomy category.
//! Precedence: primary label, synonym, category name, then fuzzy similarity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::store::{normalize, Taxonomy};

/// Category reported when nothing in the taxonomy matches.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Minimum similarity for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

/// How a resolution was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Fuzzy,
    None,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Synonym => "synonym",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Self::Exact),
            "synonym" => Some(Self::Synonym),
            "fuzzy" => Some(Self::Fuzzy),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Matched category, or [`UNKNOWN_CATEGORY`]
    pub category: String,
    /// Taxonomy term that matched (label or synonym)
    pub term: Option<String>,
    pub kind: MatchKind,
    /// 1.0 for exact/synonym, the similarity for fuzzy, 0.0 for none
    pub confidence: f64,
}

impl Resolution {
    pub fn unknown() -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            term: None,
            kind: MatchKind::None,
            confidence: 0.0,
        }
    }

    fn matched(category: &str, term: &str, kind: MatchKind, confidence: f64) -> Self {
        Self {
            category: category.to_string(),
            term: Some(term.to_string()),
            kind,
            confidence,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == MatchKind::None
    }
}

/// Resolves labels against a [`Taxonomy`]
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    taxonomy: Taxonomy,
    threshold: f64,
}

impl CategoryResolver {
    pub fn new(taxonomy: Taxonomy, threshold: f64) -> Self {
        Self {
            taxonomy,
            threshold,
        }
    }

    /// Resolver over the builtin taxonomy with the default threshold
    pub fn builtin() -> Self {
        Self::new(Taxonomy::builtin(), DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        let input = normalize(raw);
        if input.is_empty() {
            return Resolution::unknown();
        }

        if let Some(entry) = self.taxonomy.by_label(&input) {
            return Resolution::matched(&entry.category, &entry.label, MatchKind::Exact, 1.0);
        }

        if let Some(entry) = self.taxonomy.by_synonym(&input) {
            return Resolution::matched(&entry.category, &input, MatchKind::Synonym, 1.0);
        }

        if let Some(entry) = self.taxonomy.by_category(&input) {
            return Resolution::matched(&entry.category, &entry.category, MatchKind::Exact, 1.0);
        }

        self.resolve_fuzzy(&input).unwrap_or_else(Resolution::unknown)
    }

    /// Best candidate by similarity. Ties keep the earliest candidate in load order.
    fn resolve_fuzzy(&self, input: &str) -> Option<Resolution> {
        let mut best: Option<(f64, &str, &str)> = None;

        for entry in self.taxonomy.entries() {
            let terms = std::iter::once(&entry.label).chain(entry.synonyms.iter());
            for term in terms {
                let score = similarity(input, term);
                if best.map_or(true, |(best_score, _, _)| score > best_score) {
                    best = Some((score, entry.category.as_str(), term.as_str()));
                }
            }
        }

        let (score, category, term) = best?;
        tracing::debug!(input, term, score, "best fuzzy candidate");
        if score >= self.threshold {
            Some(Resolution::matched(category, term, MatchKind::Fuzzy, score))
        } else {
            None
        }
    }
}

impl Default for CategoryResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Normalized Levenshtein similarity in 0.0..=1.0
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
