//! Scan records and the append-only results log

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ObjectScanError, Result};
use crate::score::{MissingScore, Score};
use crate::taxonomy::{MatchKind, Resolution};

/// One logged scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub location: String,
    pub image_path: PathBuf,
    pub description: String,
    /// Label as written by the model
    pub label: String,
    pub category: String,
    pub match_kind: MatchKind,
    pub score: Score,
}

impl ScanRecord {
    pub fn new(
        location: &str,
        image_path: &Path,
        description: &str,
        label: &str,
        resolution: &Resolution,
        score: Score,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            location: location.to_string(),
            image_path: image_path.to_path_buf(),
            description: description.to_string(),
            label: label.to_string(),
            category: resolution.category.clone(),
            match_kind: resolution.kind,
            score,
        }
    }

    fn to_row(&self, missing: MissingScore) -> LogRow {
        LogRow {
            id: Some(self.id),
            timestamp: self.timestamp.to_rfc3339(),
            location: self.location.clone(),
            image_path: self.image_path.display().to_string(),
            description: self.description.clone(),
            label: self.label.clone(),
            category: self.category.clone(),
            match_kind: self.match_kind.as_str().to_string(),
            score: Some(i64::from(self.score.persisted(missing))),
        }
    }

    fn from_row(row: LogRow, missing: MissingScore) -> Result<Self> {
        let timestamp =
            parse_timestamp(&row.timestamp).ok_or_else(|| ObjectScanError::InvalidRecord {
                message: format!("unrecognised timestamp '{}'", row.timestamp),
            })?;
        Ok(Self {
            id: row.id.unwrap_or_else(Uuid::nil),
            timestamp,
            location: row.location,
            image_path: PathBuf::from(row.image_path),
            description: row.description,
            label: row.label,
            category: row.category,
            match_kind: MatchKind::parse(&row.match_kind).unwrap_or(MatchKind::None),
            score: row
                .score
                .map(|s| Score::from_persisted(s, missing))
                .unwrap_or(Score::Unknown),
        })
    }
}

/// CSV row layout. Dutch aliases accept logs exported from the spreadsheet.
#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(alias = "Tijd")]
    timestamp: String,
    #[serde(default, alias = "Locatie")]
    location: String,
    #[serde(default, alias = "Afbeelding")]
    image_path: String,
    #[serde(default, alias = "Beschrijving")]
    description: String,
    #[serde(default)]
    label: String,
    #[serde(default, alias = "Categorie")]
    category: String,
    #[serde(default)]
    match_kind: String,
    #[serde(default, alias = "Score")]
    score: Option<i64>,
}

impl LogRow {
    /// Value for a column of an existing log, by name or spreadsheet alias
    fn field(&self, column: &str) -> Option<String> {
        let value = match column.trim() {
            "id" => self.id.map(|id| id.to_string()).unwrap_or_default(),
            "timestamp" | "Tijd" => self.timestamp.clone(),
            "location" | "Locatie" => self.location.clone(),
            "image_path" | "Afbeelding" => self.image_path.clone(),
            "description" | "Beschrijving" => self.description.clone(),
            "label" => self.label.clone(),
            "category" | "Categorie" => self.category.clone(),
            "match_kind" => self.match_kind.clone(),
            "score" | "Score" => self.score.map(|s| s.to_string()).unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }
}

/// RFC 3339, or a naive ISO timestamp interpreted as local time
fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Local));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// Append-only sink for scan records
pub trait ResultLog {
    fn append(&mut self, record: &ScanRecord) -> Result<()>;
}

/// Results log stored as CSV
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    missing: MissingScore,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>, missing: MissingScore) -> Self {
        Self {
            path: path.into(),
            missing,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in file order
    pub fn read_all(&self) -> Result<Vec<ScanRecord>> {
        if !self.path.exists() {
            return Err(ObjectScanError::LogNotFound {
                path: self.path.clone(),
            });
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<LogRow>() {
            records.push(ScanRecord::from_row(row?, self.missing)?);
        }
        Ok(records)
    }

    /// Header row of a non-empty log
    fn existing_header(&self) -> Result<Option<csv::StringRecord>> {
        let has_rows = fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !has_rows {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.map_csv(e))?;
        let header = reader.headers().map_err(|e| self.map_csv(e))?.clone();
        Ok(Some(header))
    }

    fn locked(&self) -> ObjectScanError {
        ObjectScanError::LogLocked {
            path: self.path.clone(),
        }
    }

    fn map_io(&self, err: io::Error) -> ObjectScanError {
        if is_lock_error(&err) {
            self.locked()
        } else {
            err.into()
        }
    }

    fn map_csv(&self, err: csv::Error) -> ObjectScanError {
        match err.kind() {
            csv::ErrorKind::Io(io_err) if is_lock_error(io_err) => self.locked(),
            _ => err.into(),
        }
    }
}

impl ResultLog for CsvLog {
    fn append(&mut self, record: &ScanRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // rows follow the header already in the file, e.g. a spreadsheet export
        let header = self.existing_header()?;
        let row = record.to_row(self.missing);
        let values = match &header {
            Some(header) => {
                if !header.iter().any(|c| matches!(c.trim(), "timestamp" | "Tijd")) {
                    return Err(ObjectScanError::InvalidRecord {
                        message: format!(
                            "{} has no timestamp column (found: {})",
                            self.path.display(),
                            header.iter().collect::<Vec<_>>().join(",")
                        ),
                    });
                }
                Some(
                    header
                        .iter()
                        .map(|c| row.field(c).unwrap_or_default())
                        .collect::<Vec<_>>(),
                )
            }
            None => None,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.map_io(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(values.is_none())
            .from_writer(file);
        let written = match values {
            Some(values) => writer.write_record(&values),
            None => writer.serialize(row),
        };
        written.map_err(|e| self.map_csv(e))?;
        writer.flush().map_err(|e| self.map_io(e))?;

        tracing::debug!(path = %self.path.display(), id = %record.id, "appended scan record");
        Ok(())
    }
}

/// Write records to a fresh CSV file (used for filtered exports)
pub fn write_csv(path: &Path, records: &[ScanRecord], missing: MissingScore) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record.to_row(missing))?;
    }
    writer.flush()?;
    Ok(())
}

/// A file held open by a spreadsheet program surfaces as one of these
fn is_lock_error(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}
