use crate::error::Result;
use crate::models::{CollectorConfig, Universe};
use crate::services::{
    baseline_path, CollectionState, CollectionWindow, CycleStats, MarketDataProvider, MetricNormalizer,
    RequestScheduler, SnapshotWriter, WindowDecision,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Keep cycling until the window closes or a stop is requested
    Continuous,
    /// One cycle, if the window is open
    Once,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub stats: CycleStats,
    pub records_written: usize,
    pub write_failures: usize,
}

/// Polling collector: every cycle visits the whole universe once
pub struct CollectorWorker {
    config: CollectorConfig,
    universe: Universe,
    scheduler: RequestScheduler,
    normalizer: MetricNormalizer,
    writer: SnapshotWriter,
    window: CollectionWindow,
    state: CollectionState,
}

impl CollectorWorker {
    pub fn new(config: CollectorConfig, universe: Universe, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            scheduler: RequestScheduler::new(provider, config.pacing, config.call_timeout),
            normalizer: MetricNormalizer::new(config.strength_band),
            writer: SnapshotWriter::new(config.data_dir.clone()),
            window: CollectionWindow::new(config.window.clone()),
            state: CollectionState::new(),
            universe,
            config,
        }
    }

    /// Continue from a baseline built by an earlier phase of the same run
    pub fn with_state(mut self, state: CollectionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    /// Collection loop gated by the daily window; returns the number of cycles run
    #[instrument(skip(self, stop), fields(tickers = self.universe.len()))]
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>, mode: RunMode) -> Result<u64> {
        info!(
            pacing_ms = self.config.pacing.as_millis() as u64,
            cycle_interval_secs = self.config.cycle_interval.as_secs(),
            window_start = %self.config.window.start,
            window_end = %self.config.window.end,
            "Starting collector"
        );

        let mut iteration_count = 0u64;

        loop {
            if *stop.borrow() {
                info!(iteration = iteration_count, "Stop requested, collector exiting");
                break;
            }

            match self.window.decide() {
                WindowDecision::RunNow => {
                    iteration_count += 1;
                    let timestamp = self.window.now_local();
                    let report = self.run_cycle_at(timestamp, &stop).await;

                    info!(
                        iteration = iteration_count,
                        visited = report.stats.visited,
                        failed_calls = report.stats.failed_calls,
                        records = report.records_written,
                        write_failures = report.write_failures,
                        duration_secs = report.stats.duration.as_secs_f64(),
                        "Cycle completed"
                    );

                    if mode == RunMode::Once || report.stats.stopped_early {
                        break;
                    }
                    if sleep_or_stop(self.config.cycle_interval, &mut stop).await {
                        info!(iteration = iteration_count, "Stop requested during cycle interval");
                        break;
                    }
                }
                WindowDecision::WaitShort => {
                    info!(
                        opens_at = %self.config.window.start,
                        wait_secs = self.config.wait_interval.as_secs(),
                        "Collection window not open yet"
                    );
                    if mode == RunMode::Once {
                        break;
                    }
                    if sleep_or_stop(self.config.wait_interval, &mut stop).await {
                        break;
                    }
                }
                WindowDecision::Stop => {
                    info!(iteration = iteration_count, closed_at = %self.config.window.end, "Collection window closed");
                    break;
                }
            }
        }

        Ok(iteration_count)
    }

    /// One pass over the universe, stamping every record with `timestamp`
    ///
    /// Between tickers the cycle ends early on a stop request or once the
    /// window has closed. Local time inside the cycle is `timestamp` plus the
    /// elapsed monotonic time.
    pub async fn run_cycle_at(&mut self, timestamp: NaiveDateTime, stop: &watch::Receiver<bool>) -> CycleReport {
        self.begin_session(timestamp.date());

        let mut records_written = 0;
        let mut write_failures = 0;
        let normalizer = &self.normalizer;
        let writer = &self.writer;
        let state = &mut self.state;
        let window = &self.window;
        let cycle_start = Instant::now();

        let should_stop = || {
            if *stop.borrow() {
                return true;
            }
            let elapsed = chrono::Duration::from_std(cycle_start.elapsed()).unwrap_or(chrono::Duration::zero());
            let closed = window.decide_at(timestamp + elapsed) == WindowDecision::Stop;
            if closed {
                info!(closed_at = %window.config().end, "Collection window closed mid-cycle");
            }
            closed
        };

        let stats = self
            .scheduler
            .run_cycle_with(&self.universe, should_stop, |outcome| {
                let snapshot = normalizer.normalize(&outcome, state, timestamp);
                match writer.append(&snapshot) {
                    Ok(_) => records_written += 1,
                    Err(e) => {
                        write_failures += 1;
                        error!(ticker = %snapshot.ticker.id, error = %e, "Failed to append record");
                    }
                }
            })
            .await;

        if self.config.persist_baseline {
            let path = baseline_path(&self.writer.date_dir(timestamp.date()));
            if let Err(e) = self.state.save(&path) {
                warn!(error = %e, "Failed to save volume baseline");
            }
        }

        CycleReport {
            stats,
            records_written,
            write_failures,
        }
    }

    /// Reset or restore the baseline when the collection date changes
    fn begin_session(&mut self, date: NaiveDate) {
        if self.state.collection_date == Some(date) {
            return;
        }
        // A baseline handed over without a date belongs to the current session
        if self.state.collection_date.is_none() && !self.state.is_empty() {
            self.state.collection_date = Some(date);
            return;
        }

        self.state = if self.config.persist_baseline {
            CollectionState::load(&baseline_path(&self.writer.date_dir(date)), date)
        } else {
            CollectionState::for_date(date)
        };
        debug!(date = %date, restored = self.state.len(), "Started collection session");
    }
}

/// Sleep for `duration` unless a stop arrives first; true means stop
pub async fn sleep_or_stop(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(duration) => *stop.borrow(),
        changed = stop.changed() => match changed {
            Ok(()) => *stop.borrow(),
            Err(_) => {
                // Sender gone: nobody can stop us any more
                sleep(duration).await;
                false
            }
        },
    }
}
