//! Append-only snapshot logs
//!
//! Layout: `<base_dir>/<YYYYMMDD>/<display name>.txt`, one text block per
//! snapshot (see [`crate::constants`] for the record format).

use crate::constants::{
    record_label, ABSENT_MARKER, DATE_FOLDER_FORMAT, LOG_EXTENSION, RECORD_SEPARATOR_WIDTH,
    RECORD_TIME_FORMAT,
};
use crate::error::Result;
use crate::models::{Snapshot, Ticker, Top5List};
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SnapshotWriter {
    base_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.base_dir.join(date.format(DATE_FOLDER_FORMAT).to_string())
    }

    pub fn log_path(&self, date: NaiveDate, ticker: &Ticker) -> PathBuf {
        self.date_dir(date)
            .join(format!("{}.{}", file_stem(ticker), LOG_EXTENSION))
    }

    /// Append one record and sync it to disk before returning
    pub fn append(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let date_dir = self.date_dir(snapshot.collection_date());
        fs::create_dir_all(&date_dir)?;

        let path = self.log_path(snapshot.collection_date(), &snapshot.ticker);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(format_snapshot(snapshot).as_bytes())?;
        file.flush()?;
        file.sync_data()?;

        debug!(ticker = %snapshot.ticker.id, "Appended record to {}", path.display());
        Ok(path)
    }
}

/// Render a snapshot as a record block, trailing newline included
pub fn format_snapshot(snapshot: &Snapshot) -> String {
    use record_label::*;

    let price = snapshot
        .price
        .map(|p| p.to_string())
        .unwrap_or_else(|| ABSENT_MARKER.to_string());
    let cumulative = snapshot
        .cumulative_volume
        .map(|v| v.to_string())
        .unwrap_or_else(|| ABSENT_MARKER.to_string());
    let strength = snapshot
        .strength
        .map(|s| s.to_string())
        .unwrap_or_else(|| ABSENT_MARKER.to_string());

    let mut out = String::new();
    out.push_str(&format!(
        "[{}] {} {}\n",
        snapshot.timestamp.format(RECORD_TIME_FORMAT),
        TICKER,
        snapshot.ticker.label()
    ));
    out.push_str(&format!(
        "{PRICE} {price}{FIELD_SEPARATOR}{INSTANT_VOLUME} {}{FIELD_SEPARATOR}{CUMULATIVE_VOLUME} {cumulative}{FIELD_SEPARATOR}{STRENGTH} {strength}\n",
        snapshot.instantaneous_volume,
    ));
    out.push_str(&format_side(BUY_TOP, &snapshot.buy_top5));
    out.push_str(&format_side(SELL_TOP, &snapshot.sell_top5));
    out.push_str(&"-".repeat(RECORD_SEPARATOR_WIDTH));
    out.push('\n');
    out
}

fn format_side(label: &str, side: &Top5List) -> String {
    let ranked: Vec<String> = side
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {} {}", i + 1, e.name, e.quantity))
        .collect();
    format!(
        "{} {}   ({} {})\n",
        label,
        ranked.join(record_label::FIELD_SEPARATOR),
        record_label::TOTAL,
        side.total()
    )
}

/// File stem for a ticker's log; reserved characters become `_`
pub fn file_stem(ticker: &Ticker) -> String {
    let sanitized: String = ticker
        .label()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim().trim_matches('.').to_string();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
        ticker.id.clone()
    } else {
        sanitized
    }
}
