//! Pipeline configuration.
//!
//! Every field has a default so the pipeline runs without a config file.
//! A YAML file passed with `--config` overrides any subset of the keys:
//!
//! ```yaml
//! base_url: https://www.reuters.com/news/archive
//! sections: [world, africa, europe]
//! primary_section_articles: 5
//! raw_data_path: ./data/raw/raw_articles.parquet
//! ```

use crate::models::Section;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Runtime configuration for both pipeline steps.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Archive root; section listing URLs are built beneath it.
    pub base_url: String,
    /// Sections to scrape, in order.
    pub sections: Vec<String>,
    /// The section that gets the larger article budget.
    pub primary_section: String,
    pub primary_section_articles: usize,
    pub other_section_articles: usize,
    /// Appended to every listing URL.
    pub listing_query: String,
    /// CSS selector for one story block on a listing page; its first link is taken.
    pub story_selector: String,
    pub raw_data_path: PathBuf,
    pub summarised_data_path: PathBuf,
    pub partition_column: String,
    /// Article text is cut to this many characters before summarization.
    pub summary_input_chars: usize,
    /// Name of the `aj` chat template used for summarization.
    pub summarizer_template: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.reuters.com/news/archive".to_string(),
            sections: ["world", "africa", "usa", "asia", "europe", "middle-east"]
                .into_iter()
                .map(String::from)
                .collect(),
            primary_section: "world".to_string(),
            primary_section_articles: 10,
            other_section_articles: 3,
            listing_query: "?date=today".to_string(),
            story_selector: "div.story-content".to_string(),
            raw_data_path: PathBuf::from("./data/raw/raw_articles.parquet"),
            summarised_data_path: PathBuf::from("./data/processed/summarised_articles.parquet"),
            partition_column: "date".to_string(),
            summary_input_chars: 1024,
            summarizer_template: "summarizer".to_string(),
            user_agent: concat!("reuters_summary/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, or defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config = Self::from_yaml(&raw)?;
                info!(path, sections = config.sections.len(), "Loaded configuration file");
                Ok(config)
            }
            None => {
                info!("No configuration file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, Box<dyn Error>> {
        let config: Config = serde_yaml::from_str(raw)?;
        if config.partition_column.trim().is_empty() {
            return Err("partition_column must not be empty".into());
        }
        Ok(config)
    }

    /// Build the sections to scrape with their listing URLs and article budgets.
    pub fn sections(&self) -> Vec<Section> {
        let base = self.base_url.trim_end_matches('/');
        self.sections
            .iter()
            .map(|name| {
                let max_articles = if *name == self.primary_section {
                    self.primary_section_articles
                } else {
                    self.other_section_articles
                };
                let listing_url = format!("{}/{}/{}", base, name, self.listing_query);
                Section::new(name.clone(), listing_url, max_articles)
            })
            .collect()
    }

    /// Upper bound on the number of rows a single scrape run can produce.
    pub fn max_rows(&self) -> usize {
        self.sections().iter().map(|s| s.max_articles).sum()
    }
}
