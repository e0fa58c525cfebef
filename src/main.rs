//! # Reuters Summary
//!
//! Collects article text from Reuters section pages and attaches short
//! machine-generated summaries for downstream storage.
//!
//! ## Usage
//!
//! ```sh
//! reuters_summary scrape                       # step 0
//! reuters_summary summarize --date 20240307    # step 1
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: one listing page per section yields a bounded list of article URLs
//! 2. **Fetching**: each article page is reduced to a title and body text
//! 3. **Aggregation**: sections are flattened into one dated table, deduplicated on title
//! 4. **Persistence**: the table is appended to the date-partitioned raw dataset
//! 5. **Summarization** (separate run): every raw row of a date is summarized
//!    and appended to the processed dataset
//!
//! Everything runs sequentially; the first failure aborts the run.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod export;
mod models;
mod scrapers;
mod storage;
mod summarizer;
mod utils;

use aggregate::{build_run_table, run_date};
use cli::{Cli, Command};
use config::Config;
use scrapers::{build_client, reuters::scrape_sections};
use summarizer::{AwfulJadeSummarizer, summarize_table};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("reuters_summary starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let result = run(args).await;

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(?elapsed, secs = elapsed.as_secs(), "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    result
}

/// Load the pipeline config and dispatch to the requested step.
async fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Scrape { json_output_dir } => scrape(&config, json_output_dir.as_deref()).await,
        Command::Summarize {
            date,
            llm_config,
            json_output_dir,
        } => {
            summarize(
                &config,
                date,
                llm_config.as_deref(),
                json_output_dir.as_deref(),
            )
            .await
        }
    }
}

/// Step 0: scrape every section and append the run to the raw dataset.
#[instrument(level = "info", skip_all)]
async fn scrape(config: &Config, json_output_dir: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let date = run_date(Local::now().date_naive());
    ensure_writable_dir(&dataset_parent(&config.raw_data_path)).await?;

    let client = build_client(config)?;
    let sections = config.sections();
    info!(
        sections = sections.len(),
        max_rows = config.max_rows(),
        date,
        "Scraping sections"
    );

    let scraped = scrape_sections(&client, sections, &config.story_selector).await?;
    let table = build_run_table(&scraped, date);

    info!(
        rows = table.len(),
        columns = table.column_count(),
        path = %config.raw_data_path.display(),
        "Saving raw articles"
    );
    storage::save_partitioned(&table, &config.raw_data_path, &config.partition_column)?;

    if let Some(dir) = json_output_dir {
        export::write_run_json(&table, dir, date).await?;
    }
    Ok(())
}

/// Step 1: summarize one day of raw rows and append them to the processed dataset.
///
/// Running this twice for the same date appends a second summarized copy of
/// that day's rows.
#[instrument(level = "info", skip_all)]
async fn summarize(
    config: &Config,
    date: Option<i32>,
    llm_config: Option<&str>,
    json_output_dir: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let date = date.unwrap_or_else(|| run_date(Local::now().date_naive()));
    let raw = storage::load_partitioned(&config.raw_data_path, &config.partition_column, Some(date))?;
    if raw.is_empty() {
        warn!(date, path = %config.raw_data_path.display(), "No raw articles for date; nothing to summarize");
        return Ok(());
    }
    ensure_writable_dir(&dataset_parent(&config.summarised_data_path)).await?;

    let summarizer = AwfulJadeSummarizer::load(llm_config, &config.summarizer_template).await?;
    let processed = summarize_table(&summarizer, raw, config.summary_input_chars).await?;

    info!(
        rows = processed.len(),
        columns = processed.column_count(),
        path = %config.summarised_data_path.display(),
        "Saving summarised articles"
    );
    storage::save_partitioned(&processed, &config.summarised_data_path, &config.partition_column)?;

    if let Some(dir) = json_output_dir {
        export::write_run_json(&processed, dir, date).await?;
    }
    Ok(())
}

/// Directory holding a dataset root; `.` for a bare relative name.
fn dataset_parent(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
