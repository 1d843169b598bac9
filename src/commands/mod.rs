pub mod collect;
pub mod rank;
pub mod status;

use crate::error::Result;
use crate::models::{parse_hhmm, parse_timezone, CollectorConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Command-line settings layered over `CollectorConfig::from_env()`
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
    pub pacing_ms: Option<u64>,
    pub top_n: Option<usize>,
    pub persist_baseline: bool,
    pub weekdays_only: bool,
}

impl ConfigOverrides {
    pub fn load(&self) -> Result<CollectorConfig> {
        self.apply(CollectorConfig::from_env()?)
    }

    pub fn apply(&self, mut config: CollectorConfig) -> Result<CollectorConfig> {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(start) = &self.start {
            config.window.start = parse_hhmm(start)?;
        }
        if let Some(end) = &self.end {
            config.window.end = parse_hhmm(end)?;
        }
        if let Some(tz) = &self.timezone {
            config.window.timezone = parse_timezone(tz)?;
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing = Duration::from_millis(ms);
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        config.persist_baseline |= self.persist_baseline;
        config.window.weekdays_only |= self.weekdays_only;

        config.validate()?;
        Ok(config)
    }
}

/// Stop signal flipped by Ctrl-C; must be called inside the runtime
pub(crate) fn ctrl_c_stop() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current ticker");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Tokio runtime for a command, or exit with an error message
pub(crate) fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_overrides_apply() {
        let overrides = ConfigOverrides {
            data_dir: Some(PathBuf::from("/tmp/collector")),
            start: Some("09:30".to_string()),
            pacing_ms: Some(500),
            persist_baseline: true,
            ..ConfigOverrides::default()
        };

        let config = overrides.apply(CollectorConfig::default()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/collector"));
        assert_eq!(config.window.start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(config.window.end, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(config.pacing, Duration::from_millis(500));
        assert!(config.persist_baseline);
    }

    #[test]
    fn test_overrides_are_validated() {
        let overrides = ConfigOverrides {
            start: Some("16:00".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(overrides.apply(CollectorConfig::default()).is_err());

        let overrides = ConfigOverrides {
            pacing_ms: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(overrides.apply(CollectorConfig::default()).is_err());
    }
}
