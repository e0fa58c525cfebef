//! Date-partitioned Parquet datasets.
//!
//! A dataset is a directory laid out Hive-style, one subdirectory per
//! partition value, so other Parquet readers pick up the partition column:
//!
//! ```text
//! raw_articles.parquet/
//! ├── date=20240306/
//! │   └── part-20240306T063001123456789-<uuid>.parquet
//! └── date=20240307/
//!     ├── part-20240307T063000456000000-<uuid>.parquet
//!     └── part-20240307T183000789000000-<uuid>.parquet
//! ```
//!
//! Writing never touches existing files: the dataset directory is created
//! if missing and each save adds new part files. The partition column lives
//! only in the directory name. Part file names start with a UTC timestamp
//! so a directory listing sorts in write order.

use crate::models::{ArticleRow, RunTable};
use arrow::array::{Array, ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const TEXT_COLUMNS: [&str; 4] = ["section", "url", "title", "text"];
const SUMMARY_COLUMN: &str = "summary";

fn schema(with_summary: bool) -> Schema {
    let mut fields: Vec<Field> = TEXT_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, false))
        .collect();
    if with_summary {
        fields.push(Field::new(SUMMARY_COLUMN, DataType::Utf8, true));
    }
    Schema::new(fields)
}

fn to_record_batch(rows: &[&ArticleRow], with_summary: bool) -> Result<RecordBatch, Box<dyn Error>> {
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.section.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.url.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.title.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.text.as_str()))),
    ];
    if with_summary {
        let summaries: Vec<Option<&str>> = rows.iter().map(|r| r.summary.as_deref()).collect();
        columns.push(Arc::new(StringArray::from(summaries)));
    }
    Ok(RecordBatch::try_new(Arc::new(schema(with_summary)), columns)?)
}

/// Append `table` to the dataset at `root`, creating it if needed.
///
/// Rows are grouped by their run date and each group is written as one new
/// part file. Existing part files are never rewritten, so saving the same
/// rows twice stores them twice.
///
/// # Arguments
///
/// * `table` - Rows to write; a `summary` column is added when any row has one
/// * `root` - Dataset directory, e.g. `./data/raw/raw_articles.parquet`
/// * `partition_column` - Name used in the `column=value` partition directories
///
/// # Returns
///
/// Paths of the part files written, one per distinct run date. An empty
/// table writes nothing and returns an empty list.
#[instrument(level = "info", skip_all, fields(root = %root.display(), rows = table.len()))]
pub fn save_partitioned(
    table: &RunTable,
    root: &Path,
    partition_column: &str,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if table.is_empty() {
        warn!("Nothing to save; dataset left untouched");
        return Ok(Vec::new());
    }

    let appending = root.exists();
    fs::create_dir_all(root)?;

    let mut partitions: BTreeMap<i32, Vec<&ArticleRow>> = BTreeMap::new();
    for row in &table.rows {
        partitions.entry(row.date).or_default().push(row);
    }

    let with_summary = table.is_summarised();
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut written = Vec::with_capacity(partitions.len());
    for (value, rows) in partitions {
        let dir = root.join(format!("{partition_column}={value}"));
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "part-{}-{}.parquet",
            Utc::now().format("%Y%m%dT%H%M%S%9f"),
            Uuid::new_v4().simple()
        ));

        let batch = to_record_batch(&rows, with_summary)?;
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props.clone()))?;
        writer.write(&batch)?;
        writer.close()?;

        debug!(path = %path.display(), rows = rows.len(), "Wrote part file");
        written.push(path);
    }

    info!(
        files = written.len(),
        appending,
        with_summary,
        "Saved dataset"
    );
    Ok(written)
}

/// Read a dataset back into one table.
///
/// # Arguments
///
/// * `root` - Dataset directory written by [`save_partitioned`]
/// * `partition_column` - Name used in the `column=value` partition directories
/// * `only` - Read just this partition value; `None` reads all of them
///
/// # Returns
///
/// Rows ordered by partition value, then by part file, then by position in
/// the file, with `date` restored from the directory name.
///
/// # Errors
///
/// Fails if `root` does not exist or a part file lacks one of the text columns.
#[instrument(level = "info", skip_all, fields(root = %root.display(), ?only))]
pub fn load_partitioned(
    root: &Path,
    partition_column: &str,
    only: Option<i32>,
) -> Result<RunTable, Box<dyn Error>> {
    if !root.is_dir() {
        return Err(format!("dataset {} does not exist", root.display()).into());
    }

    let mut partitions = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(value) = name
            .to_str()
            .and_then(|name| parse_partition_dir(name, partition_column))
        else {
            debug!(dir = ?name, "Skipping non-partition directory");
            continue;
        };
        if only.is_some_and(|wanted| wanted != value) {
            continue;
        }
        partitions.push((value, entry.path()));
    }
    partitions.sort();

    let mut rows = Vec::new();
    for (value, dir) in partitions {
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "parquet"))
            .collect();
        files.sort();

        for path in files {
            let before = rows.len();
            read_part_file(&path, value, &mut rows)?;
            debug!(path = %path.display(), rows = rows.len() - before, "Read part file");
        }
    }

    info!(rows = rows.len(), "Loaded dataset");
    Ok(RunTable::new(rows))
}

/// Partition value from a `column=value` directory name.
fn parse_partition_dir(name: &str, partition_column: &str) -> Option<i32> {
    name.strip_prefix(partition_column)?
        .strip_prefix('=')?
        .parse()
        .ok()
}

fn read_part_file(path: &Path, date: i32, rows: &mut Vec<ArticleRow>) -> Result<(), Box<dyn Error>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;

    for batch in reader {
        let batch = batch?;
        let section = string_column(&batch, "section", path)?;
        let url = string_column(&batch, "url", path)?;
        let title = string_column(&batch, "title", path)?;
        let text = string_column(&batch, "text", path)?;
        let summary = match batch.column_by_name(SUMMARY_COLUMN) {
            Some(_) => Some(string_column(&batch, SUMMARY_COLUMN, path)?),
            None => None,
        };

        for i in 0..batch.num_rows() {
            rows.push(ArticleRow {
                section: section.value(i).to_string(),
                url: url.value(i).to_string(),
                title: title.value(i).to_string(),
                text: text.value(i).to_string(),
                date,
                summary: summary
                    .filter(|col| !col.is_null(i))
                    .map(|col| col.value(i).to_string()),
            });
        }
    }
    Ok(())
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a StringArray, Box<dyn Error>> {
    batch
        .column_by_name(name)
        .ok_or_else(|| format!("{}: missing column {name:?}", path.display()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| format!("{}: column {name:?} is not a UTF-8 string column", path.display()).into())
}
