//! Abstractive summarization through an OpenAI-compatible model.
//!
//! The model is a black box reached through `awful_aj`: its config file
//! names the endpoint and model, and a chat template supplies the system
//! prompt. Article text is cut to the model's supported input length
//! before it is sent.
//!
//! # Architecture
//!
//! - [`Summarize`]: core trait, one text in, one summary out
//! - [`AwfulJadeSummarizer`]: wraps `awful_aj::api::ask`
//! - [`summarize_table`]: drives a [`Summarize`] over every row of a run

use crate::models::RunTable;
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Anything that turns an article body into a summary.
pub trait Summarize {
    /// Summarize `text`, which the caller has already truncated.
    async fn summarize(&self, text: &str) -> Result<String, Box<dyn Error>>;
}

/// Summarizer backed by an `awful_aj` config and chat template.
#[derive(Debug)]
pub struct AwfulJadeSummarizer {
    /// Endpoint, API key and model settings.
    pub config: AwfulJadeConfig,
    /// Chat template carrying the summarization prompt.
    pub template: ChatTemplate,
}

impl AwfulJadeSummarizer {
    /// Load the `aj` config file and the named template.
    ///
    /// Without an explicit path the config is read from
    /// `<aj config dir>/config.yaml`.
    #[instrument(level = "info")]
    pub async fn load(config_path: Option<&str>, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let config_path = match config_path {
            Some(path) => PathBuf::from(path),
            None => config_dir()?.join("config.yaml"),
        };
        let config_path = config_path
            .to_str()
            .ok_or("LLM config path is not valid UTF-8")?;
        let config = config::load_config(config_path)
            .map_err(|e| format!("failed to load LLM config {config_path}: {e}"))?;
        info!(config_path, "Loaded LLM configuration");

        let template = template::load_template(template_name).await?;
        info!(template_name, "Loaded template");

        Ok(Self { config, template })
    }
}

impl Summarize for AwfulJadeSummarizer {
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn summarize(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed");
                return Err(e);
            }
        };

        let summary = response.trim();
        if summary.is_empty() {
            return Err("model returned an empty summary".into());
        }
        debug!(elapsed_ms = dt.as_millis(), summary = %truncate_for_log(summary, 200), "Model answered");
        Ok(summary.to_string())
    }
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Attach a summary to every row of `table`, one model call at a time.
///
/// Rows with an empty body get an empty summary without calling the model.
///
/// # Arguments
///
/// * `summarizer` - Model backend
/// * `table` - Rows to summarize, usually one day of the raw dataset
/// * `max_chars` - Each body is cut to this many characters before it is sent
///
/// # Returns
///
/// The same rows in the same order with `summary` set, or the first model
/// error, which aborts the whole step.
#[instrument(level = "info", skip_all, fields(rows = table.len(), max_chars = max_chars))]
pub async fn summarize_table<S: Summarize>(
    summarizer: &S,
    mut table: RunTable,
    max_chars: usize,
) -> Result<RunTable, Box<dyn Error>> {
    let total = table.len();
    for (i, row) in table.rows.iter_mut().enumerate() {
        if row.text.trim().is_empty() {
            warn!(index = i, url = %row.url, "Empty article body; storing empty summary");
            row.summary = Some(String::new());
            continue;
        }

        let input = truncate_chars(&row.text, max_chars);
        let summary = summarizer.summarize(input).await?;
        info!(index = i, total, title = %truncate_for_log(&row.title, 80), "Summarized article");
        row.summary = Some(summary);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleRow;
    use std::sync::Mutex;

    /// Records every input and answers with its first word.
    #[derive(Default)]
    struct FirstWord {
        seen: Mutex<Vec<String>>,
    }

    impl Summarize for FirstWord {
        async fn summarize(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(text.split_whitespace().next().unwrap_or_default().to_string())
        }
    }

    struct Failing;

    impl Summarize for Failing {
        async fn summarize(&self, _text: &str) -> Result<String, Box<dyn Error>> {
            Err("model unavailable".into())
        }
    }

    fn table(texts: &[&str]) -> RunTable {
        RunTable::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| ArticleRow {
                    section: "world".to_string(),
                    url: format!("https://www.reuters.com/{i}"),
                    title: format!("Title {i}"),
                    text: text.to_string(),
                    date: 20240307,
                    summary: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hello", 0), "");
    }

    #[tokio::test]
    async fn test_summarize_table_truncates_input() {
        let summarizer = FirstWord::default();
        let long = "Alpha ".repeat(400);
        let result = summarize_table(&summarizer, table(&[&long, "Beta gamma"]), 1024)
            .await
            .unwrap();

        let seen = summarizer.seen.lock().unwrap();
        assert_eq!(seen[0].chars().count(), 1024);
        assert_eq!(seen[1], "Beta gamma");
        assert_eq!(result.rows[0].summary.as_deref(), Some("Alpha"));
        assert_eq!(result.rows[1].summary.as_deref(), Some("Beta"));
        assert!(result.is_summarised());
    }

    #[tokio::test]
    async fn test_summarize_table_skips_empty_bodies() {
        let summarizer = FirstWord::default();
        let result = summarize_table(&summarizer, table(&["  ", "Delta"]), 1024)
            .await
            .unwrap();

        assert_eq!(summarizer.seen.lock().unwrap().len(), 1);
        assert_eq!(result.rows[0].summary.as_deref(), Some(""));
        assert_eq!(result.rows[1].summary.as_deref(), Some("Delta"));
    }

    #[tokio::test]
    async fn test_summarize_table_propagates_model_errors() {
        let err = summarize_table(&Failing, table(&["Some text"]), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model unavailable");
    }
}
