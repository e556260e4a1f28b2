//! Read-only reporting over the results log
//!
//! Filters by location and date range, then summarises: scan count, mean
//! score, distinct categories, counts per category and score distribution.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::ScanRecord;
use crate::score::{Score, MAX_SCORE};

/// Record filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub location: Option<String>,
    /// Inclusive start date
    pub from: Option<NaiveDate>,
    /// Inclusive end date
    pub to: Option<NaiveDate>,
}

impl ReportFilter {
    pub fn matches(&self, record: &ScanRecord) -> bool {
        let date = record.timestamp.date_naive();
        self.location
            .as_deref()
            .map_or(true, |loc| record.location == loc)
            && self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub scans: usize,
    /// Mean over known scores, rounded to two decimals
    pub mean_score: Option<f64>,
    pub distinct_categories: usize,
    /// First and last scan date
    pub period: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// Index is the score (0-5)
    pub counts: [usize; MAX_SCORE as usize + 1],
    pub unknown: usize,
}

/// One line of the detailed results table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    /// `YYYY-MM-DD HH:MM`
    pub time: String,
    pub location: String,
    pub category: String,
    pub score: Score,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    records: Vec<ScanRecord>,
}

impl Report {
    pub fn new(records: Vec<ScanRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn filtered(&self, filter: &ReportFilter) -> Self {
        Self::new(
            self.records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
        )
    }

    /// Distinct non-empty locations, sorted
    pub fn locations(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.location.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> Summary {
        let known: Vec<u8> = self.records.iter().filter_map(|r| r.score.value()).collect();
        let mean_score = (!known.is_empty()).then(|| {
            let mean = known.iter().map(|&s| f64::from(s)).sum::<f64>() / known.len() as f64;
            (mean * 100.0).round() / 100.0
        });

        let distinct_categories = self
            .records
            .iter()
            .map(|r| r.category.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let dates = self.records.iter().map(|r| r.timestamp.date_naive());
        let period = dates
            .clone()
            .min()
            .zip(dates.max());

        Summary {
            scans: self.records.len(),
            mean_score,
            distinct_categories,
            period,
        }
    }

    /// Scans per category, most frequent first, ties by name
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.category.as_str()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Every scan, newest first
    pub fn detail_rows(&self) -> Vec<DetailRow> {
        let mut records: Vec<&ScanRecord> = self.records.iter().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
            .into_iter()
            .map(|r| DetailRow {
                time: r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                location: r.location.clone(),
                category: r.category.clone(),
                score: r.score,
                description: r.description.clone(),
            })
            .collect()
    }

    pub fn score_distribution(&self) -> ScoreDistribution {
        let mut dist = ScoreDistribution::default();
        for record in &self.records {
            match record.score.value() {
                Some(score) => dist.counts[usize::from(score)] += 1,
                None => dist.unknown += 1,
            }
        }
        dist
    }
}
