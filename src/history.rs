//! Append-only price history log.
//!
//! One CSV row per observation. The header is written once, when the file is
//! created (or found empty). The "current" price of a URL is the price on its
//! last row in file order.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::models::{HistoryRecord, HistoryRow, PreviousPrice, TrackedUrl};
use crate::plugins::trackers::validate;
use crate::utils::error::{AppError, Result};

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    // serializes appends so concurrent callers can't interleave header/rows
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Price on the most recent row for `url`.
    ///
    /// A missing or unreadable log counts as "no history": every URL is then
    /// treated as newly tracked rather than failing the run.
    pub fn last_price_for(&self, url: &TrackedUrl) -> PreviousPrice {
        match self.scan_last_row(url) {
            Ok(Some(row)) => PreviousPrice::Recorded(validate(&row.price)),
            Ok(None) => PreviousPrice::NotFound,
            Err(AppError::Persistence(e)) if e.kind() == ErrorKind::NotFound => PreviousPrice::NotFound,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "History log unreadable, treating {} as untracked: {}",
                    url,
                    e
                );
                PreviousPrice::NotFound
            }
        }
    }

    /// [`last_price_for`](Self::last_price_for) on the blocking pool.
    pub async fn lookup(self: &Arc<Self>, url: &TrackedUrl) -> PreviousPrice {
        let store = Arc::clone(self);
        let url = url.clone();
        tokio::task::spawn_blocking(move || store.last_price_for(&url))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("History lookup task failed: {}", e);
                PreviousPrice::NotFound
            })
    }

    /// [`append`](Self::append) on the blocking pool.
    pub async fn persist(self: &Arc<Self>, record: HistoryRecord) -> Result<()> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.append(&record))
            .await
            .map_err(|e| AppError::Persistence(std::io::Error::new(ErrorKind::Other, e)))?
    }

    // Rows that fail to parse (torn write, hand edit) are skipped.
    fn scan_last_row(&self, url: &TrackedUrl) -> Result<Option<HistoryRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(io_or_csv)?;

        let mut last = None;
        let mut skipped = 0usize;
        for result in reader.deserialize::<HistoryRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(io_or_csv(e)),
                Err(e) => {
                    if skipped == 0 {
                        tracing::warn!(path = %self.path.display(), "Skipping malformed history row: {}", e);
                    }
                    skipped += 1;
                    continue;
                }
            };
            if row.url == url.as_str() {
                last = Some(row);
            }
        }
        if skipped > 1 {
            tracing::warn!(path = %self.path.display(), skipped, "Skipped malformed history rows");
        }
        Ok(last)
    }

    /// Every row in file order.
    pub fn records(&self) -> Result<Vec<HistoryRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(io_or_csv)?;

        reader
            .deserialize::<HistoryRow>()
            .map(|row| row.map_err(AppError::from))
            .collect()
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&self.path)?;
        let len = file.metadata()?.len();
        let needs_header = len == 0;
        if len > 0 && !ends_with_newline(&mut file)? {
            // terminate a torn row so the new record starts on its own line
            file.write_all(b"\n")?;
        }

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HistoryRow::HEADERS)?;
        }
        writer.serialize(record.to_row())?;
        writer.flush()?;

        tracing::debug!(url = %record.url, price = %record.price, "Appended history record");
        Ok(())
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn io_or_csv(err: csv::Error) -> AppError {
    match err.kind() {
        csv::ErrorKind::Io(io) => AppError::Persistence(std::io::Error::new(io.kind(), io.to_string())),
        _ => AppError::Csv(err),
    }
}
