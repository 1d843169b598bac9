//! Cumulative volume baseline
//!
//! Instantaneous volume is the difference between two cumulative volume
//! readings of the same ticker. The previous reading lives here, owned by the
//! collection task and passed by `&mut` into every cycle.
//!
//! By default the baseline starts empty in every process, so the first
//! reading after a restart reports zero instantaneous volume. With
//! `persist_baseline` the worker saves it into the date folder after each
//! cycle and restores it on startup for the same collection date only.

use crate::constants::BASELINE_FILE_NAME;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    /// Date the baseline was observed on; cumulative volume restarts each session
    pub collection_date: Option<NaiveDate>,
    prev_cumulative_volume: HashMap<String, u64>,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty baseline for the session on `date`
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            collection_date: Some(date),
            prev_cumulative_volume: HashMap::new(),
        }
    }

    /// Record a cumulative volume reading and return the instantaneous volume
    ///
    /// The first reading of a ticker yields 0. A flat or decreasing reading
    /// yields 0 and still becomes the new baseline. An absent reading yields 0
    /// and leaves the baseline untouched.
    pub fn observe(&mut self, ticker_id: &str, cumulative_volume: Option<u64>) -> u64 {
        let Some(cumulative) = cumulative_volume else {
            return 0;
        };

        let instantaneous = match self.prev_cumulative_volume.get(ticker_id) {
            Some(&prev) => cumulative.saturating_sub(prev),
            None => 0,
        };
        self.prev_cumulative_volume.insert(ticker_id.to_string(), cumulative);
        instantaneous
    }

    pub fn previous(&self, ticker_id: &str) -> Option<u64> {
        self.prev_cumulative_volume.get(ticker_id).copied()
    }

    pub fn len(&self) -> usize {
        self.prev_cumulative_volume.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev_cumulative_volume.is_empty()
    }

    /// Restore the baseline saved for `date`, or start empty
    pub fn load(path: &Path, date: NaiveDate) -> Self {
        let fresh = Self::for_date(date);

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!("No saved baseline at {}, starting empty", path.display());
                return fresh;
            }
        };

        match serde_json::from_str::<CollectionState>(&content) {
            Ok(state) if state.collection_date == Some(date) => {
                debug!(tickers = state.len(), "Restored volume baseline from {}", path.display());
                state
            }
            Ok(state) => {
                debug!(
                    saved_date = ?state.collection_date,
                    "Saved baseline belongs to another session, starting empty"
                );
                fresh
            }
            Err(e) => {
                warn!("Failed to parse baseline {}: {}. Starting empty.", path.display(), e);
                fresh
            }
        }
    }

    /// Save the baseline next to the day's logs
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!(tickers = self.len(), "Saved volume baseline to {}", path.display());
        Ok(())
    }
}

/// Path of the persisted baseline inside a date folder
pub fn baseline_path(date_dir: &Path) -> PathBuf {
    date_dir.join(BASELINE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_zero() {
        let mut state = CollectionState::new();
        assert_eq!(state.observe("A", Some(1000)), 0);
        assert_eq!(state.previous("A"), Some(1000));
    }

    #[test]
    fn test_positive_difference() {
        let mut state = CollectionState::new();
        state.observe("A", Some(1000));
        assert_eq!(state.observe("A", Some(1300)), 300);
        assert_eq!(state.observe("A", Some(1300)), 0);
        assert_eq!(state.observe("A", Some(1450)), 150);
    }

    #[test]
    fn test_decreasing_volume_never_negative() {
        let mut state = CollectionState::new();
        let readings = [500, 700, 650, 650, 900, 100, 120];
        let expected = [0, 200, 0, 0, 250, 0, 20];

        for (reading, want) in readings.iter().zip(expected.iter()) {
            assert_eq!(state.observe("A", Some(*reading)), *want);
        }
        assert_eq!(state.previous("A"), Some(120));
    }

    #[test]
    fn test_tickers_are_independent() {
        let mut state = CollectionState::new();
        assert_eq!(state.observe("A", Some(1000)), 0);
        assert_eq!(state.observe("B", Some(500)), 0);
        assert_eq!(state.observe("A", Some(1300)), 300);
        assert_eq!(state.observe("B", Some(500)), 0);
    }

    #[test]
    fn test_absent_reading_keeps_baseline() {
        let mut state = CollectionState::new();
        state.observe("A", Some(1000));
        assert_eq!(state.observe("A", None), 0);
        assert_eq!(state.previous("A"), Some(1000));
        assert_eq!(state.observe("A", Some(1100)), 100);
    }

    #[test]
    fn test_for_date_starts_empty() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let state = CollectionState::for_date(date);
        assert!(state.is_empty());
        assert_eq!(state.collection_date, Some(date));
    }

    #[test]
    fn test_save_and_load_same_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = baseline_path(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut state = CollectionState::load(&path, date);
        assert!(state.is_empty());
        state.observe("A", Some(1000));
        state.save(&path).unwrap();

        let mut restored = CollectionState::load(&path, date);
        assert_eq!(restored.previous("A"), Some(1000));
        assert_eq!(restored.observe("A", Some(1200)), 200);
    }

    #[test]
    fn test_load_ignores_other_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = baseline_path(dir.path());
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut state = CollectionState::load(&path, yesterday);
        state.observe("A", Some(1000));
        state.save(&path).unwrap();

        let restored = CollectionState::load(&path, today);
        assert!(restored.is_empty());
        assert_eq!(restored.collection_date, Some(today));
    }

    #[test]
    fn test_load_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = baseline_path(dir.path());
        fs::write(&path, "{not json").unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert!(CollectionState::load(&path, date).is_empty());
    }
}
