use crate::error::Result;
use crate::types::{DailySummary, ListingRecord};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a summary run writes its output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteMode {
    /// Full recompute: replace the destination
    Overwrite,
    /// Incremental: append, writing the header only when the file is new
    Append,
}

/// Flat-file sink and source for the raw listings table and the per-day
/// summary table. The listings table is append-only; deduplication across
/// runs is somebody else's job.
pub struct CsvStore {
    listings_path: PathBuf,
    summary_path: PathBuf,
}

impl CsvStore {
    pub fn new(listings_path: impl Into<PathBuf>, summary_path: impl Into<PathBuf>) -> Self {
        Self {
            listings_path: listings_path.into(),
            summary_path: summary_path.into(),
        }
    }

    pub fn listings_path(&self) -> &Path {
        &self.listings_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    /// Append records to the raw listings table, writing the header only when
    /// the file does not exist yet
    pub fn append_listings(&self, records: &[ListingRecord]) -> Result<usize> {
        append_rows(&self.listings_path, records)
    }

    /// Load the full raw listings history. A missing file is an empty
    /// history, not an error.
    pub fn load_listings(&self) -> Result<Vec<ListingRecord>> {
        if !self.listings_path.exists() {
            warn!("No listings file at {}", self.listings_path.display());
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.listings_path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        debug!(
            "Loaded {} listing records from {}",
            records.len(),
            self.listings_path.display()
        );
        Ok(records)
    }

    pub fn write_summary(&self, rows: &[DailySummary], mode: WriteMode) -> Result<usize> {
        match mode {
            WriteMode::Overwrite => {
                ensure_parent_dir(&self.summary_path)?;
                let mut writer = csv::Writer::from_path(&self.summary_path)?;
                for row in rows {
                    writer.serialize(row)?;
                }
                writer.flush()?;
                Ok(rows.len())
            }
            WriteMode::Append => append_rows(&self.summary_path, rows),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Conditional-header append: the header goes out only when this call creates
/// the file. An empty batch leaves the filesystem untouched so a later
/// non-empty append still gets its header.
fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    ensure_parent_dir(path)?;
    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
