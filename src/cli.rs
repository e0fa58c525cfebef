//! Command-line interface definitions.
//!
//! The pipeline runs as two separate invocations, usually from a scheduler:
//!
//! ```sh
//! reuters_summary scrape
//! reuters_summary summarize --date 20240307
//! ```

use crate::aggregate::parse_run_date;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to the pipeline config.yaml
    #[arg(short, long, global = true, env = "REUTERS_SUMMARY_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Scrape every configured section and append the articles to the raw dataset
    Scrape {
        /// Also write the run as JSON into this directory
        #[arg(short, long)]
        json_output_dir: Option<PathBuf>,
    },
    /// Summarize one day of raw articles and append them to the processed dataset
    Summarize {
        /// Run date to summarize as YYYYMMDD (defaults to today)
        #[arg(short, long, value_parser = parse_date_stamp)]
        date: Option<i32>,

        /// Path to the aj config.yaml holding the model endpoint
        #[arg(long, env = "AJ_CONFIG")]
        llm_config: Option<String>,

        /// Also write the summarized run as JSON into this directory
        #[arg(short, long)]
        json_output_dir: Option<PathBuf>,
    },
}

fn parse_date_stamp(s: &str) -> Result<i32, String> {
    let stamp: i32 = s
        .parse()
        .map_err(|_| format!("{s:?} is not a YYYYMMDD date"))?;
    parse_run_date(stamp)
        .map(|_| stamp)
        .ok_or_else(|| format!("{s:?} is not a valid calendar date"))
}
