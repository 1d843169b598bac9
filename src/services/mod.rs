pub mod collection_state;
pub mod collection_window;
pub mod kis_client;
pub mod normalizer;
pub mod phased_scheduler;
pub mod provider;
pub mod record_reader;
pub mod scheduler;
pub mod snapshot_writer;

pub use collection_state::{baseline_path, CollectionState};
pub use collection_window::{CollectionWindow, WindowDecision};
pub use kis_client::{KisClient, KisCredentials};
pub use normalizer::{resolve_strength, MetricNormalizer, StrengthSource};
pub use phased_scheduler::{select_top_n, Phase, PhasedScheduler, PumpAction, WorkUnit};
pub use provider::{MarketDataProvider, OrderFlowResponse, PriceResponse, ProviderError, RawBrokerRow};
pub use record_reader::{parse_records, summarize_date_dir, LogSummary, ParsedRecord};
pub use scheduler::{CycleStats, Pacer, RequestScheduler, TickerOutcome};
pub use snapshot_writer::{format_snapshot, SnapshotWriter};
