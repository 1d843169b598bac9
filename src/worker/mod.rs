pub mod collector_worker;
pub mod ranking_worker;

pub use collector_worker::{sleep_or_stop, CollectorWorker, CycleReport, RunMode};
pub use ranking_worker::{RankingReport, RankingWorker};
