use crate::error::{AppError, Result};
use crate::models::{CollectorConfig, MarketCapRecord, Ticker, Universe};
use crate::services::phased_scheduler::{Phase, PhasedScheduler, PumpAction, WorkUnit};
use crate::services::scheduler::{call_with_timeout, fetch_ticker};
use crate::services::{
    CollectionState, CollectionWindow, MarketDataProvider, MetricNormalizer, Pacer, SnapshotWriter,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct RankingReport {
    /// Top-N in rank order; empty when the run stopped before selection
    pub selection: Vec<MarketCapRecord>,
    pub ranking_failures: usize,
    pub records_written: usize,
    pub stopped_early: bool,
}

impl RankingReport {
    /// Selected tickers as a collection universe
    pub fn selected_universe(&self) -> Result<Universe> {
        Universe::new(self.selection.iter().map(|r| r.ticker.clone()).collect())
    }
}

/// Ranking pass followed by one detail pass over the Top-N
///
/// Each pacing tick runs exactly one [`PhasedScheduler::pump`]; the unit it
/// issues is awaited and completed before the next tick.
pub struct RankingWorker {
    config: CollectorConfig,
    universe: Universe,
    provider: Arc<dyn MarketDataProvider>,
    pacer: Pacer,
    normalizer: MetricNormalizer,
    writer: SnapshotWriter,
    window: CollectionWindow,
    state: CollectionState,
}

impl RankingWorker {
    pub fn new(config: CollectorConfig, universe: Universe, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            pacer: Pacer::new(config.pacing),
            normalizer: MetricNormalizer::new(config.strength_band),
            writer: SnapshotWriter::new(config.data_dir.clone()),
            window: CollectionWindow::new(config.window.clone()),
            state: CollectionState::new(),
            provider,
            universe,
            config,
        }
    }

    /// Volume baseline built during the detail pass
    pub fn into_state(self) -> CollectionState {
        self.state
    }

    #[instrument(skip_all, fields(universe = self.universe.len(), top_n = self.config.top_n))]
    pub async fn run(&mut self, stop: &watch::Receiver<bool>) -> Result<RankingReport> {
        let mut fsm = PhasedScheduler::new(&self.universe, self.config.top_n);
        let mut report = RankingReport::default();
        let mut selecting_ticks = 0u32;
        let timeout = self.config.call_timeout;

        info!("Starting ranking pass");

        loop {
            self.pacer.wait_turn().await;
            if *stop.borrow() {
                info!(phase = ?fsm.phase(), "Stop requested, ending phased run");
                report.stopped_early = true;
                break;
            }

            match fsm.pump() {
                PumpAction::Issue(WorkUnit::Rank(ticker)) => {
                    let result = call_with_timeout(timeout, self.provider.fetch_market_cap(&ticker.id)).await;
                    let market_cap = match result {
                        Ok(cap) => Some(cap),
                        Err(e) => {
                            warn!(
                                provider = self.provider.id(),
                                ticker = %ticker.id,
                                error = %e,
                                "Market cap call failed"
                            );
                            report.ranking_failures += 1;
                            None
                        }
                    };
                    fsm.complete_ranking(market_cap);

                    let done = self.universe.len() - fsm.pending_ranking();
                    if done % 100 == 0 {
                        info!(ranked = done, total = self.universe.len(), "Ranking progress");
                    }
                }
                PumpAction::Issue(WorkUnit::Detail(ticker)) => {
                    if self.collect_detail(&ticker).await.is_ok() {
                        report.records_written += 1;
                    }
                    fsm.complete_detail();
                }
                PumpAction::Busy => {
                    debug!("Unit still in flight");
                }
                PumpAction::AwaitingResults => {
                    selecting_ticks += 1;
                    if selecting_ticks >= self.config.max_selection_retries {
                        return Err(AppError::Other(format!(
                            "no rankable result after {} selection attempts ({} ranking calls failed)",
                            selecting_ticks, report.ranking_failures
                        )));
                    }
                }
                PumpAction::Selected(selection) => {
                    log_selection(&selection);
                    report.selection = selection;
                }
                PumpAction::Finished => break,
            }

            // Every tick, request or not, is spaced by the pacing delay
            self.pacer.finish_unit();
        }

        if fsm.phase() == Phase::Done {
            info!(
                selected = report.selection.len(),
                records = report.records_written,
                ranking_failures = report.ranking_failures,
                "Phased run completed"
            );
        }
        Ok(report)
    }

    async fn collect_detail(&mut self, ticker: &Ticker) -> Result<()> {
        let timestamp = self.window.now_local();
        if self.state.collection_date != Some(timestamp.date()) {
            self.state = CollectionState::for_date(timestamp.date());
        }

        let outcome = fetch_ticker(self.provider.as_ref(), ticker, self.config.call_timeout).await;
        let snapshot = self.normalizer.normalize(&outcome, &mut self.state, timestamp);
        self.writer.append(&snapshot).map(|_| ()).map_err(|e| {
            error!(ticker = %ticker.id, error = %e, "Failed to append record");
            e
        })
    }
}

fn log_selection(selection: &[MarketCapRecord]) {
    for (rank, record) in selection.iter().enumerate() {
        debug!(
            rank = rank + 1,
            ticker = %record.ticker.id,
            name = %record.ticker.label(),
            market_cap = record.market_cap,
            "Selected"
        );
    }
}
