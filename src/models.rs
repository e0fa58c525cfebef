//! Data models for scraped sections, extracted articles and run tables.
//!
//! - [`Section`]: one topical listing page and what was discovered on it
//! - [`NewsArticle`]: title and body extracted from a single article page
//! - [`ArticleRow`]: one flat row of a run, optionally carrying a summary
//! - [`RunTable`]: the ordered rows produced by one scrape or summarize run

use serde::{Deserialize, Serialize};

/// A topical news section scraped as one unit.
///
/// `article_urls` holds at most `max_articles` entries and `articles` is
/// aligned with it once the section has been fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section name as it appears in the listing URL (e.g. `"africa"`).
    pub name: String,
    /// Absolute URL of the section's link-listing page.
    pub listing_url: String,
    /// Upper bound on the number of article links taken from the listing.
    pub max_articles: usize,
    /// Article URLs discovered on the listing page.
    pub article_urls: Vec<String>,
    /// Articles downloaded from `article_urls`, in the same order.
    pub articles: Vec<NewsArticle>,
}

impl Section {
    pub fn new(name: impl Into<String>, listing_url: impl Into<String>, max_articles: usize) -> Self {
        Self {
            name: name.into(),
            listing_url: listing_url.into(),
            max_articles,
            article_urls: Vec::new(),
            articles: Vec::new(),
        }
    }
}

/// Title and body text of a downloaded article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub text: String,
}

/// A single row of a run.
///
/// Raw rows have no summary; the summarize step fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRow {
    /// Name of the section the article was listed under.
    pub section: String,
    /// Absolute article URL.
    pub url: String,
    pub title: String,
    pub text: String,
    /// Run date stamp as `YYYYMMDD`; also the partition key on disk.
    pub date: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Ordered rows of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunTable {
    pub rows: Vec<ArticleRow>,
}

impl RunTable {
    pub fn new(rows: Vec<ArticleRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns this table carries when persisted, partition column included.
    pub fn column_count(&self) -> usize {
        if self.is_summarised() { 6 } else { 5 }
    }

    /// True when at least one row carries a summary.
    pub fn is_summarised(&self) -> bool {
        self.rows.iter().any(|row| row.summary.is_some())
    }
}
