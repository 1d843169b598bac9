//! Collector constants
//!
//! ## Record Format
//!
//! Each snapshot is stored as a five-line text block. The labels below are
//! matched verbatim by the dashboard reader, so they must not change:
//!
//! ```text
//! [09:01:00] 종목: 삼성SDI
//! 주가: 301000 / 거래량(순간): 1200 / 거래량(누적): 523400 / 체결강도: 102.35
//! 매수상위: 1. 키움증권 52000 / 2. 미래에셋 31000   (총합 83000)
//! 매도상위: 1. 모건스탠리 40000   (총합 40000)
//! ------------------------------------------------------------
//! ```

/// Minimum delay between the end of one ticker unit and the start of the next
pub const DEFAULT_PACING_MS: u64 = 300;

/// Sleep after a completed collection cycle
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 60;

/// Sleep while waiting for the collection window to open
pub const DEFAULT_WAIT_SECS: u64 = 10;

/// Upper bound for a single upstream call
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Number of tickers selected by the ranking phase
pub const DEFAULT_TOP_N: usize = 50;

/// Pump ticks spent in the selecting phase before a ranking run gives up
pub const DEFAULT_MAX_SELECTION_RETRIES: u32 = 20;

/// Reported strength outside this band is treated as a placeholder value
pub const STRENGTH_MIN: f64 = 1.0;
pub const STRENGTH_MAX: f64 = 1000.0;

/// Ranked brokers kept per side
pub const TOP_BROKERS: usize = 5;

/// Placeholder written for absent numeric fields
pub const ABSENT_MARKER: &str = "-";

/// Record labels (dashboard reader contract)
pub mod record_label {
    pub const TICKER: &str = "종목:";
    pub const PRICE: &str = "주가:";
    pub const INSTANT_VOLUME: &str = "거래량(순간):";
    pub const CUMULATIVE_VOLUME: &str = "거래량(누적):";
    pub const STRENGTH: &str = "체결강도:";
    pub const BUY_TOP: &str = "매수상위:";
    pub const SELL_TOP: &str = "매도상위:";
    pub const TOTAL: &str = "총합";
    pub const FIELD_SEPARATOR: &str = " / ";
}

/// Width of the dashed line that terminates every record
pub const RECORD_SEPARATOR_WIDTH: usize = 60;

/// Folder name format for a collection date
pub const DATE_FOLDER_FORMAT: &str = "%Y%m%d";

/// Timestamp format written at the head of each record
pub const RECORD_TIME_FORMAT: &str = "%H:%M:%S";

/// File holding the persisted volume baseline inside a date folder
pub const BASELINE_FILE_NAME: &str = ".baseline.json";

/// Log file extension
pub const LOG_EXTENSION: &str = "txt";
