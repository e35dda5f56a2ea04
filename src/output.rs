//! Output formatting and persistence for pipeline tables.
//!
//! Supports pretty-printing, JSON serialization, and whole-table CSV writes.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// A record type written as one CSV table row.
pub trait TableRow: Serialize {
    /// Column names in serialization order.
    const COLUMNS: &'static [&'static str];
}

impl<T: TableRow> TableRow for &T {
    const COLUMNS: &'static [&'static str] = T::COLUMNS;
}

/// Writes `rows` as a CSV table with a single header line, also when `rows`
/// is empty.
///
/// The table is staged next to `path` and renamed into place, so readers never
/// see a half-written file.
pub fn write_table<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: TableRow,
    I: IntoIterator<Item = T>,
{
    let staging = staging_path(path);
    let file = File::create(&staging)
        .with_context(|| format!("creating {}", staging.display()))?;

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    // Headers are only emitted alongside the first serialized row.
    if count == 0 {
        writer.write_record(T::COLUMNS)?;
    }
    writer.flush()?;
    drop(writer);

    std::fs::rename(&staging, path)
        .with_context(|| format!("moving table into {}", path.display()))?;
    debug!(path = %path.display(), rows = count, "CSV table written");

    Ok(count)
}

/// Reads a CSV table written by [`write_table`].
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row: T =
            result.with_context(|| format!("{} row {}", path.display(), index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Writes `value` as pretty-printed JSON, staged and renamed like [`write_table`].
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let staging = staging_path(path);
    std::fs::write(&staging, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("moving JSON into {}", path.display()))?;
    Ok(())
}
