use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ObjectScanError, Result};
use crate::score::MissingScore;
use crate::taxonomy::DEFAULT_FUZZY_THRESHOLD;

const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_LOG_FILE: &str = "resultaten_log.csv";
const BASE_DIR_NAME: &str = ".objectscan";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# objectscan configuration file
# Location: ~/.objectscan/config.toml

[api]
# Chat-completion endpoint that accepts image input
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o"
max_tokens = 400
timeout_secs = 60
# Environment variable holding the API key (used when `key` is not set)
key_env = "OPENAI_API_KEY"
# key = "sk-..."

[paths]
# Taxonomy file (.toml or .csv with Label,Synoniemen,Categorie columns)
# Default: builtin taxonomy
# taxonomy = "categorie_mapping.csv"

# Append-only results log, relative paths are resolved against this directory
log = "resultaten_log.csv"

[resolver]
# Minimum similarity (0.0-1.0) for a fuzzy category match
threshold = 0.6

[score]
# Value written to the log when no score could be read: 0 or -1
missing = 0
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub score: ScoreConfig,
}

/// Classification API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable to read the key from
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Inline key, takes precedence over `key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_key_env() -> String {
    DEFAULT_KEY_ENV.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            key_env: default_key_env(),
            key: None,
        }
    }
}

impl ApiConfig {
    /// Inline key, else the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
        std::env::var(&self.key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ObjectScanError::ApiKeyMissing {
                env: self.key_env.clone(),
            })
    }
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Taxonomy file; builtin taxonomy when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<PathBuf>,

    #[serde(default = "default_log")]
    pub log: PathBuf,
}

fn default_log() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            taxonomy: None,
            log: default_log(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreConfig {
    #[serde(default)]
    pub missing: MissingScore,
}

/// `~/.objectscan`
pub fn default_base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(BASE_DIR_NAME))
        .ok_or(ObjectScanError::HomeNotFound)
}

impl Config {
    /// Load config from base directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content).map_err(|e| ObjectScanError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Save config to base directory
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        let content = toml::to_string_pretty(self).map_err(|e| ObjectScanError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::write(&path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.resolver.threshold) {
            return Err(ObjectScanError::ConfigValue {
                key: "resolver.threshold".to_string(),
                message: format!("must be between 0.0 and 1.0, got {}", self.resolver.threshold),
            });
        }
        Ok(())
    }

    /// Taxonomy path resolved against `base_dir`
    pub fn taxonomy_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.paths.taxonomy.as_ref().map(|p| base_dir.join(p))
    }

    /// Results log path resolved against `base_dir`
    pub fn log_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.paths.log)
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        self.list()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "api.endpoint" => self.api.endpoint = value.to_string(),
            "api.model" => self.api.model = value.to_string(),
            "api.max_tokens" => self.api.max_tokens = parse_value(key, value)?,
            "api.timeout_secs" => self.api.timeout_secs = parse_value(key, value)?,
            "api.key_env" => self.api.key_env = value.to_string(),
            "api.key" => self.api.key = non_empty(value),
            "paths.taxonomy" => self.paths.taxonomy = non_empty(value).map(PathBuf::from),
            "paths.log" => self.paths.log = PathBuf::from(value),
            "resolver.threshold" => self.resolver.threshold = parse_value(key, value)?,
            "score.missing" => {
                let raw: i64 = parse_value(key, value)?;
                self.score.missing = MissingScore::try_from(raw)?;
            }
            _ => {
                return Err(ObjectScanError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        self.validate()
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("api.endpoint".to_string(), self.api.endpoint.clone()),
            ("api.model".to_string(), self.api.model.clone()),
            ("api.max_tokens".to_string(), self.api.max_tokens.to_string()),
            (
                "api.timeout_secs".to_string(),
                self.api.timeout_secs.to_string(),
            ),
            ("api.key_env".to_string(), self.api.key_env.clone()),
            (
                "api.key".to_string(),
                match &self.api.key {
                    Some(_) => "********".to_string(),
                    None => "(unset)".to_string(),
                },
            ),
            (
                "paths.taxonomy".to_string(),
                self.paths
                    .taxonomy
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(builtin)".to_string()),
            ),
            ("paths.log".to_string(), self.paths.log.display().to_string()),
            (
                "resolver.threshold".to_string(),
                self.resolver.threshold.to_string(),
            ),
            (
                "score.missing".to_string(),
                self.score.missing.value().to_string(),
            ),
        ]
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ObjectScanError::ConfigValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
