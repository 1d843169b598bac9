use crate::models::WindowConfig;
use chrono::{Datelike, NaiveDateTime, Utc, Weekday};

/// What the collection loop should do at a given local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// Inside the window (both boundaries inclusive)
    RunNow,
    /// Window has not opened yet today
    WaitShort,
    /// Window closed for the day
    Stop,
}

/// Daily collection gate evaluated in market-local time
#[derive(Debug, Clone)]
pub struct CollectionWindow {
    config: WindowConfig,
}

impl CollectionWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Current wall-clock time in the window's timezone
    pub fn now_local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.config.timezone).naive_local()
    }

    pub fn decide(&self) -> WindowDecision {
        self.decide_at(self.now_local())
    }

    pub fn decide_at(&self, local: NaiveDateTime) -> WindowDecision {
        if self.config.weekdays_only && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return WindowDecision::Stop;
        }

        let time = local.time();
        if time < self.config.start {
            WindowDecision::WaitShort
        } else if time <= self.config.end {
            WindowDecision::RunNow
        } else {
            WindowDecision::Stop
        }
    }
}

impl Default for CollectionWindow {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    // 2025-03-14 is a Friday
    fn friday(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_default_window_boundaries() {
        let window = CollectionWindow::default();
        assert_eq!(window.decide_at(friday(8, 59, 59)), WindowDecision::WaitShort);
        assert_eq!(window.decide_at(friday(9, 0, 0)), WindowDecision::RunNow);
        assert_eq!(window.decide_at(friday(12, 0, 0)), WindowDecision::RunNow);
        assert_eq!(window.decide_at(friday(15, 30, 0)), WindowDecision::RunNow);
        assert_eq!(window.decide_at(friday(15, 30, 1)), WindowDecision::Stop);
        assert_eq!(window.decide_at(friday(23, 0, 0)), WindowDecision::Stop);
    }

    #[test]
    fn test_weekend_handling() {
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap().and_hms_opt(10, 0, 0).unwrap();

        assert_eq!(CollectionWindow::default().decide_at(saturday), WindowDecision::RunNow);

        let window = CollectionWindow::new(WindowConfig {
            weekdays_only: true,
            ..WindowConfig::default()
        });
        assert_eq!(window.decide_at(saturday), WindowDecision::Stop);
        assert_eq!(window.decide_at(friday(10, 0, 0)), WindowDecision::RunNow);
    }

    #[test]
    fn test_custom_window() {
        let window = CollectionWindow::new(WindowConfig {
            start: NaiveTime::from_hms_opt(10, 15, 0).unwrap(),
            end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            ..WindowConfig::default()
        });
        assert_eq!(window.decide_at(friday(10, 0, 0)), WindowDecision::WaitShort);
        assert_eq!(window.decide_at(friday(10, 15, 0)), WindowDecision::RunNow);
        assert_eq!(window.decide_at(friday(11, 0, 1)), WindowDecision::Stop);
    }
}
