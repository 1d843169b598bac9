use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Tradable instrument: exchange short code plus the name used for its log file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl Ticker {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Ticker whose display name is its id (dynamically listed symbols)
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
        }
    }

    /// Name shown in records and used for the log file
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

/// Market segment used for dynamic universe enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSegment {
    Kospi,
    Kosdaq,
}

impl Default for MarketSegment {
    fn default() -> Self {
        MarketSegment::Kospi
    }
}

impl MarketSegment {
    /// Parse from string
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "kospi" | "0" => Ok(MarketSegment::Kospi),
            "kosdaq" | "10" => Ok(MarketSegment::Kosdaq),
            _ => Err(format!("Invalid market segment: '{}'. Valid values: kospi, kosdaq", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSegment::Kospi => "kospi",
            MarketSegment::Kosdaq => "kosdaq",
        }
    }
}

/// Ordered, non-empty set of tickers visited by every collection cycle
#[derive(Debug, Clone)]
pub struct Universe {
    tickers: Vec<Ticker>,
}

impl Universe {
    /// Build a universe, dropping duplicate ids (first occurrence wins)
    pub fn new(tickers: Vec<Ticker>) -> Result<Self> {
        let mut seen = HashSet::new();
        let tickers: Vec<Ticker> = tickers
            .into_iter()
            .filter(|t| !t.id.trim().is_empty())
            .filter(|t| seen.insert(t.id.clone()))
            .collect();

        if tickers.is_empty() {
            return Err(AppError::Config("Symbol universe is empty".to_string()));
        }

        Ok(Self { tickers })
    }

    /// Universe from bare ids, in enumeration order
    pub fn from_ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(Ticker::from_id).collect())
    }

    /// Load a universe from a JSON array of `{"id", "display_name"}` objects
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read universe file {}: {}", path.display(), e))
        })?;
        let tickers: Vec<Ticker> = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Invalid universe file {}: {}", path.display(), e))
        })?;
        Self::new(tickers)
    }

    /// Built-in KOSPI watchlist
    pub fn default_watchlist() -> Self {
        let tickers = DEFAULT_WATCHLIST
            .iter()
            .map(|(id, name)| Ticker::new(*id, *name))
            .collect();
        Self { tickers }
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ticker> {
        self.tickers.iter()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Ticker> {
        self.tickers.iter().find(|t| t.id == id)
    }
}

const DEFAULT_WATCHLIST: &[(&str, &str)] = &[
    ("373220", "LG에너지솔루션"),
    ("329180", "HD현대중공업"),
    ("034020", "두산에너빌리티"),
    ("042660", "한화오션"),
    ("035420", "NAVER"),
    ("035720", "카카오"),
    ("005490", "POSCO홀딩스"),
    ("064350", "현대로템"),
    ("010130", "고려아연"),
    ("096770", "SK이노베이션"),
    ("034730", "SK"),
    ("051910", "LG화학"),
    ("006400", "삼성SDI"),
    ("018260", "삼성에스디에스"),
    ("033780", "KT&G"),
    ("247540", "에코프로비엠"),
    ("272210", "한화시스템"),
    ("003490", "대한항공"),
    ("010120", "LS ELECTRIC"),
    ("004020", "현대제철"),
    ("036570", "엔씨소프트"),
    ("452260", "두산로보틱스"),
    ("010620", "HD현대미포"),
    ("326030", "SK바이오팜"),
    ("011070", "LG이노텍"),
    ("052690", "한전기술"),
    ("017800", "현대엘리베이터"),
];
