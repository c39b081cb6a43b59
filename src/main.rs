use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use disaster_etl::config::AppConfig;
use disaster_etl::logging::init_logging;
use disaster_etl::models::{IfExists, OutOfRangePolicy};
use disaster_etl::pipeline::{Pipeline, PipelineReport, Stage};
use disaster_etl::validation::InputValidator;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Example: disaster-etl disaster_messages.csv disaster_categories.csv DisasterResponse.db"
)]
struct Cli {
    /// Messages CSV file (must contain the join key column)
    #[arg(required_unless_present = "print_config")]
    messages: Option<PathBuf>,

    /// Categories CSV file (join key plus the packed category column)
    #[arg(required_unless_present = "print_config")]
    categories: Option<PathBuf>,

    /// SQLite database file to write the cleaned data to
    #[arg(required_unless_present = "print_config")]
    database: Option<PathBuf>,

    /// Name of the output table
    #[arg(long)]
    table: Option<String>,

    /// What to do when the output table already exists (fail, replace, append)
    #[arg(long)]
    if_exists: Option<IfExists>,

    /// Handling of category values other than 0/1 (pass_through, clamp, drop_row, reject)
    #[arg(long)]
    out_of_range: Option<OutOfRangePolicy>,

    /// Additional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print a JSON run report on stdout when done
    #[arg(long)]
    report_json: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments; usage errors exit with status 2
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if let Some(table) = &cli.table {
        config.output.table_name.clone_from(table);
    }
    if let Some(if_exists) = cli.if_exists {
        config.output.if_exists = if_exists;
    }
    if let Some(policy) = cli.out_of_range {
        config.pipeline.out_of_range = policy;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    config.validate()?;

    if cli.print_config {
        print_stdout(&config.to_yaml()?);
        return Ok(());
    }

    // Initialize logging
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;

    let (Some(messages), Some(categories), Some(database)) = (cli.messages, cli.categories, cli.database) else {
        anyhow::bail!("messages, categories and database paths are all required");
    };
    InputValidator::validate_run_paths(&messages, &categories, &database)?;

    info!("Starting disaster-etl");
    let report = run(&config, &messages, &categories, &database)?;

    if cli.report_json {
        print_stdout(&serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Run the three stages, announcing each on stdout
fn run(config: &AppConfig, messages: &Path, categories: &Path, database: &Path) -> Result<PipelineReport> {
    let pipeline = Pipeline::new(config.normalize_options(), config.write_options());
    let report = pipeline
        .run_with(messages, categories, database, |stage| match stage {
            Stage::Loading { messages, categories } => print_stdout(&format!(
                "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
                messages.display(),
                categories.display()
            )),
            Stage::Cleaning => print_stdout("Cleaning data..."),
            Stage::Saving { destination } => {
                print_stdout(&format!("Saving data...\n    DATABASE: {}", destination.display()));
            }
            Stage::Saved => print_stdout("Cleaned data saved to database!"),
        })
        .with_context(|| format!("Failed to build {} from the input files", database.display()))?;
    Ok(report)
}

#[allow(clippy::print_stdout)]
fn print_stdout(line: &str) {
    println!("{line}");
}
