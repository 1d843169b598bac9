use crate::constants::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CYCLE_INTERVAL_SECS, DEFAULT_MAX_SELECTION_RETRIES,
    DEFAULT_PACING_MS, DEFAULT_TOP_N, DEFAULT_WAIT_SECS, STRENGTH_MAX, STRENGTH_MIN,
};
use crate::error::{AppError, Result};
use crate::utils::get_data_dir;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Accepted range for the provider-reported strength percentage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthBand {
    pub min: f64,
    pub max: f64,
}

impl Default for StrengthBand {
    fn default() -> Self {
        Self {
            min: STRENGTH_MIN,
            max: STRENGTH_MAX,
        }
    }
}

impl StrengthBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Daily collection window in market-local time
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
    /// Treat Saturday and Sunday as closed
    pub weekdays_only: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
            timezone: chrono_tz::Asia::Seoul,
            weekdays_only: false,
        }
    }
}

/// Configuration for a collection run
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Root folder holding one sub-folder per collection date
    pub data_dir: PathBuf,

    pub window: WindowConfig,

    /// Minimum delay between ticker units (upstream rate limit)
    pub pacing: Duration,

    /// Sleep after each completed cycle
    pub cycle_interval: Duration,

    /// Sleep while the window has not opened yet
    pub wait_interval: Duration,

    /// Timeout applied to every upstream call
    pub call_timeout: Duration,

    pub strength_band: StrengthBand,

    /// Tickers selected by the ranking phase
    pub top_n: usize,

    /// Pump ticks allowed in the selecting phase with no rankable result
    pub max_selection_retries: u32,

    /// Save and restore the cumulative volume baseline within a collection date
    pub persist_baseline: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            window: WindowConfig::default(),
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            cycle_interval: Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECS),
            wait_interval: Duration::from_secs(DEFAULT_WAIT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            strength_band: StrengthBand::default(),
            top_n: DEFAULT_TOP_N,
            max_selection_retries: DEFAULT_MAX_SELECTION_RETRIES,
            persist_baseline: false,
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by `COLLECTOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            data_dir: get_data_dir(),
            ..Self::default()
        };

        if let Some(value) = env_var("COLLECTOR_WINDOW_START") {
            config.window.start = parse_hhmm(&value)?;
        }
        if let Some(value) = env_var("COLLECTOR_WINDOW_END") {
            config.window.end = parse_hhmm(&value)?;
        }
        if let Some(value) = env_var("COLLECTOR_TIMEZONE") {
            config.window.timezone = parse_timezone(&value)?;
        }
        if let Some(value) = env_var("COLLECTOR_WEEKDAYS_ONLY") {
            config.window.weekdays_only = parse_bool(&value)
                .ok_or_else(|| AppError::Config(format!("invalid COLLECTOR_WEEKDAYS_ONLY value: {}", value)))?;
        }
        if let Some(ms) = env_parse::<u64>("COLLECTOR_PACING_MS")? {
            config.pacing = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("COLLECTOR_CYCLE_INTERVAL_SECS")? {
            config.cycle_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("COLLECTOR_WAIT_SECS")? {
            config.wait_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("COLLECTOR_CALL_TIMEOUT_SECS")? {
            config.call_timeout = Duration::from_secs(secs);
        }
        if let Some(min) = env_parse::<f64>("COLLECTOR_STRENGTH_MIN")? {
            config.strength_band.min = min;
        }
        if let Some(max) = env_parse::<f64>("COLLECTOR_STRENGTH_MAX")? {
            config.strength_band.max = max;
        }
        if let Some(top_n) = env_parse::<usize>("COLLECTOR_TOP_N")? {
            config.top_n = top_n;
        }

        Ok(config)
    }

    /// Reject settings that would break the scheduling contract
    pub fn validate(&self) -> Result<()> {
        if self.window.start >= self.window.end {
            return Err(AppError::Config(format!(
                "collection window start {} must be before end {}",
                self.window.start, self.window.end
            )));
        }
        if self.pacing.is_zero() {
            return Err(AppError::Config("pacing delay must be greater than zero".to_string()));
        }
        if self.call_timeout.is_zero() {
            return Err(AppError::Config("call timeout must be greater than zero".to_string()));
        }
        if !(self.strength_band.min <= self.strength_band.max) {
            return Err(AppError::Config(format!(
                "strength band [{}, {}] is empty",
                self.strength_band.min, self.strength_band.max
            )));
        }
        if self.top_n == 0 {
            return Err(AppError::Config("top-N must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| AppError::Config(format!("invalid time '{}': {}", value, e)))
}

pub fn parse_timezone(value: &str) -> Result<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|e| AppError::Config(format!("invalid timezone '{}': {}", value, e)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid {} value '{}': {}", name, value, e))),
        None => Ok(None),
    }
}
