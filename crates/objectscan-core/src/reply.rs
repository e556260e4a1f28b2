//! Parsing of the model's free-text reply
//!
//! The model is asked for a `Beschrijving / Score / Categorie` block but does
//! not always comply, so each field falls back to a looser extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::score::{score_from_keywords, Score};

static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*_#-]*(?:beschrijving|description)[\s*_]*:[\s*_]*(.+)$").unwrap()
});

static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*_#-]*(?:categorie|category|objecttype)[\s*_]*:[\s*_]*(.+)$").unwrap()
});

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)score[\s*_]*:[\s*_]*([0-5])\b").unwrap());

static BARE_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-5])\b").unwrap());

/// Where a parsed field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// `Field: value` line
    Field,
    /// Recovered by a fallback rule
    Fallback,
    Missing,
}

/// Fields extracted from one reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub description: String,
    /// Lower-cased object label or category as written by the model
    pub label: Option<String>,
    pub score: Score,
    pub label_source: FieldSource,
    pub score_source: FieldSource,
}

impl ParsedReply {
    pub fn parse(text: &str) -> Self {
        let (description, _) = extract_description(text);
        let (label, label_source) = extract_label(text);
        let (score, score_source) = extract_score(text);
        Self {
            description,
            label,
            score,
            label_source,
            score_source,
        }
    }

    /// Both label and score were given in the requested format
    pub fn is_structured(&self) -> bool {
        self.label_source == FieldSource::Field && self.score_source == FieldSource::Field
    }
}

pub fn extract_description(text: &str) -> (String, FieldSource) {
    if let Some(caps) = DESCRIPTION_RE.captures(text) {
        return (clean_value(&caps[1]).to_string(), FieldSource::Field);
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        (String::new(), FieldSource::Missing)
    } else {
        (trimmed.to_string(), FieldSource::Fallback)
    }
}

/// `Categorie:` line, else the last non-empty line
pub fn extract_label(text: &str) -> (Option<String>, FieldSource) {
    if let Some(caps) = LABEL_RE.captures(text) {
        let label = clean_value(&caps[1]).to_lowercase();
        if !label.is_empty() {
            return (Some(label), FieldSource::Field);
        }
    }

    text.lines()
        .rev()
        .map(clean_value)
        .find(|line| !line.is_empty())
        .map(|line| (Some(line.to_lowercase()), FieldSource::Fallback))
        .unwrap_or((None, FieldSource::Missing))
}

/// `Score:` line, else the first standalone digit 0-5, else the keyword table
pub fn extract_score(text: &str) -> (Score, FieldSource) {
    if let Some(score) = first_digit(&SCORE_RE, text) {
        return (score, FieldSource::Field);
    }
    if let Some(score) = first_digit(&BARE_DIGIT_RE, text) {
        return (score, FieldSource::Fallback);
    }
    match score_from_keywords(text) {
        Score::Unknown => (Score::Unknown, FieldSource::Missing),
        score => (score, FieldSource::Fallback),
    }
}

fn first_digit(re: &Regex, text: &str) -> Option<Score> {
    re.captures(text)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .and_then(Score::new)
}

fn clean_value(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`' | '"' | '\'' | '<' | '>'))
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | '!'))
        .trim()
}
