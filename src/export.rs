//! JSON export of a run for quick inspection.
//!
//! ```text
//! json_output_dir/
//! ├── 20240307.json
//! └── 20240308.json
//! ```
//!
//! A later run on the same date replaces that date's file.

use crate::models::RunTable;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `table` as pretty-printed JSON to `{json_output_dir}/{date}.json`.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir.display(), date = date))]
pub async fn write_run_json(
    table: &RunTable,
    json_output_dir: &Path,
    date: i32,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(table)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = json_output_dir.join(format!("{date}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), rows = table.len(), "Wrote JSON export");
    Ok(path)
}
