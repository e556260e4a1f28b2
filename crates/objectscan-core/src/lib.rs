pub mod config;
pub mod error;
pub mod record;
pub mod reply;
pub mod report;
pub mod scanner;
pub mod score;
pub mod session;
pub mod taxonomy;
pub mod vision;

pub use config::Config;
pub use error::{ObjectScanError, Result};
pub use record::{write_csv, CsvLog, ResultLog, ScanRecord};
pub use reply::{FieldSource, ParsedReply};
pub use report::{Report, ReportFilter, ScoreDistribution, Summary};
pub use scanner::Scanner;
pub use score::{score_from_keywords, MissingScore, Score, MAX_SCORE};
pub use session::{Capture, ScanOutcome, Session, Step, StepKind};
pub use vision::{build_prompt, ChatCompletionClient, VisionClient, DEGRADED_REPLY};

// Category taxonomy
pub use taxonomy::{
    CategoryResolver, MatchKind, Resolution, Taxonomy, TaxonomyEntry, BUILTIN_TAXONOMY,
    DEFAULT_FUZZY_THRESHOLD, UNKNOWN_CATEGORY,
};
