use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "objectscan")]
#[command(about = "Categorise photographed objects for reuse and log the results")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base directory (default: ~/.objectscan)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse a photo, resolve its category and append it to the results log
    Scan {
        /// Photo of the object
        image: PathBuf,

        /// Location or municipality where the object was found
        #[arg(short, long, default_value = "")]
        location: String,

        /// Skip the confirmation step
        #[arg(short, long)]
        yes: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a free-text label to a taxonomy category
    Resolve {
        /// Label as returned by the model (e.g., "zitmeubel")
        label: String,

        /// Override the fuzzy match threshold (0.0-1.0)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Parse a model reply (file or stdin) into description, score and category
    Parse {
        /// Reply file (default: read stdin)
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the category taxonomy
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },

    /// Summarise the results log
    Report {
        /// Only scans from this location
        #[arg(short, long)]
        location: Option<String>,

        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Write the filtered scans to a CSV file
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Also list every matching scan
        #[arg(long)]
        rows: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TaxonomyAction {
    /// List entries grouped by category
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Validate a taxonomy file (default: the configured one)
    Check {
        /// Taxonomy file (.toml or .csv)
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g., resolver.threshold)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., score.missing)
        key: String,

        /// Value to set (e.g., "-1")
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// List all config values
    List,

    /// Show config file path
    Path,

    /// Create config file with commented defaults
    Init,
}
