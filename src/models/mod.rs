mod ticker;
mod snapshot;
mod collector_config;

pub use ticker::{MarketSegment, Ticker, Universe};
pub use snapshot::{BrokerEntry, MarketCapRecord, Snapshot, Top5List};
pub use collector_config::{parse_hhmm, parse_timezone, CollectorConfig, StrengthBand, WindowConfig};
