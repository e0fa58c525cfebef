//! News site scrapers.
//!
//! Scraping happens in two phases:
//!
//! 1. **Indexing**: download one listing page per section and take a
//!    bounded number of article URLs from it
//! 2. **Fetching**: download each article and extract its title and body
//!
//! Both phases share a single [`reqwest::Client`] built by [`build_client`].
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Reuters archive | [`reuters`] | HTML scraping of section listing pages |

pub mod reuters;

use crate::config::Config;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Build the HTTP client shared by all requests of a run.
pub fn build_client(config: &Config) -> Result<Client, Box<dyn Error>> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(client)
}
