//! Flatten scraped sections into a single dated [`RunTable`].

use crate::models::{ArticleRow, RunTable, Section};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use tracing::{debug, info, instrument};

/// Integer date stamp in `YYYYMMDD` form.
pub fn run_date(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Parse a `YYYYMMDD` stamp back into a date.
///
/// Only canonical stamps are accepted: `2024037` parses as March 7th under
/// `%m%d` but is rejected because it does not format back to itself.
pub fn parse_run_date(stamp: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&stamp.to_string(), "%Y%m%d")
        .ok()
        .filter(|date| run_date(*date) == stamp)
}

/// Combine per-section results into one table stamped with `date`.
///
/// Rows keep section order, then article order within a section. A single
/// pass drops rows whose title was already seen; the first occurrence wins.
#[instrument(level = "info", skip_all, fields(sections = sections.len(), date = date))]
pub fn build_run_table(sections: &[Section], date: i32) -> RunTable {
    let rows: Vec<ArticleRow> = sections
        .iter()
        .flat_map(|section| {
            section
                .article_urls
                .iter()
                .zip(section.articles.iter())
                .map(move |(url, article)| ArticleRow {
                    section: section.name.clone(),
                    url: url.clone(),
                    title: article.title.clone(),
                    text: article.text.clone(),
                    date,
                    summary: None,
                })
        })
        .collect();

    let scraped = rows.len();
    let rows: Vec<ArticleRow> = rows.into_iter().unique_by(|row| row.title.clone()).collect();

    if rows.len() < scraped {
        debug!(dropped = scraped - rows.len(), "Dropped rows with duplicate titles");
    }
    info!(rows = rows.len(), scraped, "Aggregated run table");
    RunTable::new(rows)
}
