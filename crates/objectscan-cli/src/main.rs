use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use tracing_subscriber::prelude::*;

use objectscan_core::config::{default_base_dir, Config};
use objectscan_core::record::{write_csv, CsvLog};
use objectscan_core::report::{Report, ReportFilter};
use objectscan_core::taxonomy::{CategoryResolver, MatchKind, Resolution, Taxonomy};
use objectscan_core::{ObjectScanError, ParsedReply, Result, ScanOutcome, Scanner, Session};

mod args;
use args::{Cli, Commands, ConfigAction, Shell, TaxonomyAction};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let base_dir = resolve_base_dir(cli.base_dir);

    let result = match cli.command {
        Some(Commands::Scan {
            image,
            location,
            yes,
            json,
        }) => handle_scan(&base_dir, image, &location, yes, json),
        Some(Commands::Resolve { label, threshold }) => {
            handle_resolve(&base_dir, &label, threshold)
        }
        Some(Commands::Parse { file, json }) => handle_parse(&base_dir, file.as_deref(), json),
        Some(Commands::Taxonomy { action }) => handle_taxonomy(action, &base_dir),
        Some(Commands::Report {
            location,
            from,
            to,
            export,
            rows,
        }) => handle_report(
            &base_dir,
            ReportFilter { location, from, to },
            export.as_deref(),
            rows,
        ),
        Some(Commands::Config { action }) => handle_config(action, &base_dir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` enables debug and `-q` errors only
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "objectscan_cli=debug,objectscan_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "objectscan", &mut io::stdout());
}

fn resolve_base_dir(cli_base: Option<PathBuf>) -> PathBuf {
    if let Some(base) = cli_base {
        return base;
    }

    if let Ok(base) = std::env::var("OBJECTSCAN_BASE") {
        return PathBuf::from(base);
    }

    default_base_dir().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to ./.objectscan");
        PathBuf::from(".objectscan")
    })
}

fn load_resolver(config: &Config, base_dir: &Path) -> Result<CategoryResolver> {
    // load warnings are already reported by the taxonomy store
    let taxonomy = Taxonomy::load_or_builtin(config.taxonomy_path(base_dir).as_deref())?;
    Ok(CategoryResolver::new(taxonomy, config.resolver.threshold))
}

// =============================================================================
// Scan
// =============================================================================

enum Confirm {
    Yes,
    Retake,
    No,
}

fn handle_scan(
    base_dir: &Path,
    mut image: PathBuf,
    location: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let config = Config::load(base_dir)?;
    let mut scanner = Scanner::from_config(&config, base_dir)?;

    let mut session = Session::new();
    let session = loop {
        if !image.exists() {
            return Err(ObjectScanError::ImageNotFound { path: image });
        }
        let confirm = session.capture(&image, location)?;
        if yes {
            break confirm.submit()?;
        }

        match ask_confirm(&image, confirm.location())? {
            Confirm::Yes => break confirm.submit()?,
            Confirm::Retake => {
                session = confirm.retake()?;
                image = PathBuf::from(prompt_line("New photo: ")?);
            }
            Confirm::No => {
                println!("Cancelled.");
                return Ok(());
            }
        }
    };

    if !json {
        println!("{} {}", "Analysing".cyan(), image.display());
    }
    let session = scanner.analyze(&session)?;
    let Some(outcome) = session.outcome() else {
        return Err(ObjectScanError::InvalidTransition {
            action: "show result",
            step: session.kind(),
        });
    };

    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print_outcome(outcome);
        println!(
            "{} {}",
            "Logged:".green(),
            config.log_path(base_dir).display()
        );
    }
    Ok(())
}

fn ask_confirm(image: &Path, location: &str) -> Result<Confirm> {
    println!();
    println!("Photo:    {}", image.display().to_string().cyan());
    if !location.is_empty() {
        println!("Location: {}", location.cyan());
    }
    loop {
        let answer = prompt_line("Analyse this photo? [Y/n/r(etake)] ")?;
        match answer.to_lowercase().as_str() {
            "" | "y" | "yes" | "j" | "ja" => return Ok(Confirm::Yes),
            "r" | "retake" => return Ok(Confirm::Retake),
            "n" | "no" | "nee" => return Ok(Confirm::No),
            _ => println!("Please answer y, n or r."),
        }
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_outcome(outcome: &ScanOutcome) {
    let record = &outcome.record;
    println!();
    if outcome.degraded {
        println!(
            "{} analysis failed, placeholder result recorded",
            "[WARN]".yellow().bold()
        );
    }
    println!("Description: {}", record.description);
    if !record.label.is_empty() {
        println!("Label:       {}", record.label);
    }
    println!("Category:    {}", format_resolution(&outcome.resolution));
    println!("Score:       {}", record.score.to_string().bold());
    println!();
}

fn format_resolution(resolution: &Resolution) -> String {
    let kind = match resolution.kind {
        MatchKind::Exact => "exact".green(),
        MatchKind::Synonym => "synonym".green(),
        MatchKind::Fuzzy => format!("fuzzy {:.2}", resolution.confidence).yellow(),
        MatchKind::None => "none".red(),
    };
    let via = resolution
        .term
        .as_deref()
        .map(|t| format!(" via '{}'", t))
        .unwrap_or_default();
    format!("{} ({}{})", resolution.category.bold(), kind, via)
}

// =============================================================================
// Resolve / Parse
// =============================================================================

fn handle_resolve(base_dir: &Path, label: &str, threshold: Option<f64>) -> Result<()> {
    let mut config = Config::load(base_dir)?;
    if let Some(threshold) = threshold {
        config.set("resolver.threshold", &threshold.to_string())?;
    }
    let resolver = load_resolver(&config, base_dir)?;
    println!("{}", format_resolution(&resolver.resolve(label)));
    Ok(())
}

fn handle_parse(base_dir: &Path, file: Option<&Path>, json: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = Config::load(base_dir)?;
    let resolver = load_resolver(&config, base_dir)?;
    let parsed = ParsedReply::parse(&text);
    let resolution = resolver.resolve(parsed.label.as_deref().unwrap_or_default());

    if json {
        let value = serde_json::json!({
            "parsed": parsed,
            "resolution": resolution,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Description: {}", parsed.description);
    println!(
        "Label:       {} {}",
        parsed.label.as_deref().unwrap_or("-"),
        format!("[{:?}]", parsed.label_source).dimmed()
    );
    println!("Category:    {}", format_resolution(&resolution));
    println!(
        "Score:       {} {}",
        parsed.score,
        format!("[{:?}]", parsed.score_source).dimmed()
    );
    Ok(())
}

// =============================================================================
// Taxonomy
// =============================================================================

fn handle_taxonomy(action: TaxonomyAction, base_dir: &Path) -> Result<()> {
    match action {
        TaxonomyAction::List { category } => {
            let config = Config::load(base_dir)?;
            let resolver = load_resolver(&config, base_dir)?;
            let taxonomy = resolver.taxonomy();

            for name in taxonomy.category_names() {
                if let Some(filter) = &category {
                    if !filter.eq_ignore_ascii_case(name) {
                        continue;
                    }
                }
                println!("{}", name.bold());
                for entry in taxonomy.entries().iter().filter(|e| e.category == name) {
                    if entry.synonyms.is_empty() {
                        println!("  {}", entry.label.cyan());
                    } else {
                        println!(
                            "  {} {}",
                            entry.label.cyan(),
                            format!("({})", entry.synonyms.join(", ")).dimmed()
                        );
                    }
                }
            }
        }
        TaxonomyAction::Check { file } => {
            let config = Config::load(base_dir)?;
            let path = file.or_else(|| config.taxonomy_path(base_dir));
            let taxonomy = Taxonomy::load_or_builtin(path.as_deref())?;

            let source = path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(builtin)".to_string());
            let synonyms: usize = taxonomy.entries().iter().map(|e| e.synonyms.len()).sum();

            println!("Taxonomy:   {}", source.cyan());
            println!("Entries:    {}", taxonomy.len());
            println!("Synonyms:   {}", synonyms);
            println!("Categories: {}", taxonomy.category_names().len());

            if taxonomy.warnings().is_empty() {
                println!("{}", "OK".green().bold());
            } else {
                println!();
                for warning in taxonomy.warnings() {
                    println!("{} {}", "[WARN]".yellow().bold(), warning);
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Report
// =============================================================================

fn handle_report(
    base_dir: &Path,
    filter: ReportFilter,
    export: Option<&Path>,
    rows: bool,
) -> Result<()> {
    let config = Config::load(base_dir)?;
    let log = CsvLog::new(config.log_path(base_dir), config.score.missing);
    let all = Report::new(log.read_all()?);
    let report = all.filtered(&filter);

    if report.records().is_empty() {
        println!("No scans match.");
        if filter.location.is_some() {
            println!("Known locations: {}", all.locations().join(", "));
        }
        return Ok(());
    }

    let summary = report.summary();
    println!();
    println!("Scans:       {}", summary.scans.to_string().bold());
    println!(
        "Mean score:  {}",
        summary
            .mean_score
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Categories:  {}", summary.distinct_categories);
    if let Some((first, last)) = summary.period {
        println!("Period:      {} .. {}", first, last);
    }

    println!();
    println!("{}", "Per category".bold());
    for (name, count) in report.category_counts() {
        println!("  {:<24} {:>5}", name, count);
    }

    let dist = report.score_distribution();
    println!();
    println!("{}", "Score distribution".bold());
    for (score, count) in dist.counts.iter().enumerate() {
        println!("  {:<7} {:>5}  {}", score, count, "#".repeat(*count).cyan());
    }
    if dist.unknown > 0 {
        println!("  {:<7} {:>5}", "unknown", dist.unknown);
    }
    println!();

    if rows {
        println!("{}", "Scans".bold());
        for row in report.detail_rows() {
            println!(
                "  {}  {:<20} {:<20} {:>7}  {}",
                row.time.dimmed(),
                row.location,
                row.category,
                row.score.to_string(),
                row.description
            );
        }
        println!();
    }

    if let Some(path) = export {
        write_csv(path, report.records(), config.score.missing)?;
        println!(
            "{} {} scans to {}",
            "Exported".green(),
            report.records().len(),
            path.display()
        );
    }
    Ok(())
}

// =============================================================================
// Config
// =============================================================================

fn handle_config(action: ConfigAction, base_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(base_dir)?;
            match config.get(&key) {
                Some(value) => println!("{}", value),
                None => return Err(ObjectScanError::ConfigKeyNotFound { key }),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(base_dir)?;
            config.set(&key, &value)?;
            config.save(base_dir)?;
            let shown = config.get(&key).unwrap_or(value);
            println!("{} {} = {}", "Set:".green(), key, shown);
        }
        ConfigAction::List => {
            let config = Config::load(base_dir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            println!("{}", Config::path(base_dir).display());
        }
        ConfigAction::Init => {
            let path = Config::init(base_dir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }

    Ok(())
}
