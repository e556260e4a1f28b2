use std::path::PathBuf;

use thiserror::Error;

use crate::session::StepKind;

#[derive(Debug, Error)]
pub enum ObjectScanError {
    #[error("Taxonomy file not found: {path}")]
    TaxonomyNotFound { path: PathBuf },

    #[error("Invalid taxonomy {path}: {message}")]
    TaxonomyParse { path: PathBuf, message: String },

    #[error("Taxonomy is empty")]
    EmptyTaxonomy,

    #[error("Image not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("Cannot {action} while session is in step '{step}'")]
    InvalidTransition {
        action: &'static str,
        step: StepKind,
    },

    #[error("Classification API failed: {message}")]
    Api { message: String },

    #[error("API key missing - set api.key in config or export {env}")]
    ApiKeyMissing { env: String },

    #[error("Results log is locked by another program (close it and retry): {path}")]
    LogLocked { path: PathBuf },

    #[error("Results log not found: {path}")]
    LogNotFound { path: PathBuf },

    #[error("Invalid log record: {message}")]
    InvalidRecord { message: String },

    #[error("Config parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Unknown config key: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    ConfigValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, ObjectScanError>;

impl ObjectScanError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TaxonomyNotFound { .. } | Self::TaxonomyParse { .. } | Self::EmptyTaxonomy => 2,
            Self::ImageNotFound { .. } => 3,
            Self::LogLocked { .. } => 4,
            Self::Api { .. } | Self::ApiKeyMissing { .. } => 5,
            Self::InvalidTransition { .. } => 6,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_error_message_has_single_prefix() {
        let inner = csv::Reader::from_reader("a,b\n1,2,3\n".as_bytes())
            .records()
            .find_map(|r| r.err())
            .unwrap();
        let message = ObjectScanError::from(inner).to_string();
        assert_eq!(message.matches("CSV error").count(), 1, "{}", message);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ObjectScanError::EmptyTaxonomy.exit_code(), 2);
        assert_eq!(
            ObjectScanError::LogLocked {
                path: "log.csv".into()
            }
            .exit_code(),
            4
        );
        assert_eq!(ObjectScanError::HomeNotFound.exit_code(), 1);
    }
}
