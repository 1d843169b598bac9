//! Paced, one-at-a-time request scheduling
//!
//! Every upstream call is awaited before the next one is issued, so at most
//! one request is ever in flight. Between two ticker units the [`Pacer`]
//! enforces a minimum delay measured from the end of the previous unit; the
//! upstream API throttles clients that ignore it.

use crate::models::{Ticker, Universe};
use crate::services::provider::{MarketDataProvider, OrderFlowResponse, PriceResponse, ProviderError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Raw call results for one ticker unit; a failed call carries its error
#[derive(Debug, Clone)]
pub struct TickerOutcome {
    pub ticker: Ticker,
    pub order_flow: Result<OrderFlowResponse, ProviderError>,
    pub price: Result<PriceResponse, ProviderError>,
}

impl TickerOutcome {
    pub fn failed_calls(&self) -> usize {
        usize::from(self.order_flow.is_err()) + usize::from(self.price.is_err())
    }
}

/// Minimum spacing between units of upstream work
#[derive(Debug, Clone)]
pub struct Pacer {
    min_delay: Duration,
    last_finished: Option<Instant>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_finished: None,
        }
    }

    /// Sleep until `min_delay` has passed since the previous unit finished
    pub async fn wait_turn(&self) {
        if let Some(last) = self.last_finished {
            sleep_until(last + self.min_delay).await;
        }
    }

    pub fn finish_unit(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}

/// Run one upstream call under a deadline; expiry is an ordinary failure
pub async fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout(timeout)))
}

/// Issue the order-flow call then the price call for one ticker
pub async fn fetch_ticker(provider: &dyn MarketDataProvider, ticker: &Ticker, timeout: Duration) -> TickerOutcome {
    let order_flow = call_with_timeout(timeout, provider.fetch_order_flow(&ticker.id)).await;
    if let Err(e) = &order_flow {
        warn!(provider = provider.id(), ticker = %ticker.id, error = %e, "Order flow call failed");
    }

    let price = call_with_timeout(timeout, provider.fetch_price_snapshot(&ticker.id)).await;
    if let Err(e) = &price {
        warn!(provider = provider.id(), ticker = %ticker.id, error = %e, "Price call failed");
    }

    TickerOutcome {
        ticker: ticker.clone(),
        order_flow,
        price,
    }
}

/// Summary of one pass over the universe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub visited: usize,
    pub failed_calls: usize,
    pub stopped_early: bool,
    pub duration: Duration,
}

/// Drives paced, single-in-flight calls across a universe
pub struct RequestScheduler {
    provider: Arc<dyn MarketDataProvider>,
    pacer: Pacer,
    call_timeout: Duration,
}

impl RequestScheduler {
    pub fn new(provider: Arc<dyn MarketDataProvider>, pacing: Duration, call_timeout: Duration) -> Self {
        Self {
            provider,
            pacer: Pacer::new(pacing),
            call_timeout,
        }
    }

    /// Visit every ticker once, in universe order, handing each outcome to
    /// `on_outcome` before the next ticker starts
    ///
    /// `should_stop` is consulted between tickers only; a unit that has
    /// started always completes.
    pub async fn run_cycle_with<S, F>(
        &mut self,
        universe: &Universe,
        mut should_stop: S,
        mut on_outcome: F,
    ) -> CycleStats
    where
        S: FnMut() -> bool,
        F: FnMut(TickerOutcome),
    {
        let cycle_start = Instant::now();
        let mut stats = CycleStats::default();
        let total = universe.len();

        for (idx, ticker) in universe.iter().enumerate() {
            self.pacer.wait_turn().await;
            if should_stop() {
                info!(visited = stats.visited, remaining = total - idx, "Stop condition met, ending cycle early");
                stats.stopped_early = true;
                break;
            }

            debug!(ticker = %ticker.id, index = idx + 1, total = total, "Collecting ticker");
            let outcome = fetch_ticker(self.provider.as_ref(), ticker, self.call_timeout).await;
            self.pacer.finish_unit();

            stats.visited += 1;
            stats.failed_calls += outcome.failed_calls();
            on_outcome(outcome);
        }

        stats.duration = cycle_start.elapsed();
        stats
    }

    /// Visit every ticker once and return the outcomes in universe order
    pub async fn run_cycle(&mut self, universe: &Universe, stop: &watch::Receiver<bool>) -> Vec<TickerOutcome> {
        let mut outcomes = Vec::with_capacity(universe.len());
        self.run_cycle_with(universe, || *stop.borrow(), |outcome| outcomes.push(outcome))
            .await;
        outcomes
    }
}
