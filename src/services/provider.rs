use crate::models::MarketSegment;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One ranked broker row exactly as the provider reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBrokerRow {
    pub name: String,
    pub quantity: String,
}

impl RawBrokerRow {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

/// Ranked buy/sell broker lists (rank 1 first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFlowResponse {
    pub buy: Vec<RawBrokerRow>,
    pub sell: Vec<RawBrokerRow>,
}

/// Price/volume fields as raw strings; absent fields are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceResponse {
    pub price: Option<String>,
    pub cumulative_volume: Option<String>,
    pub strength: Option<String>,
}

/// Upstream market data operations consumed by the scheduler
///
/// Implementations perform exactly one request per call and never retry;
/// the scheduler owns pacing and timeouts.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn id(&self) -> &'static str;

    async fn fetch_order_flow(&self, ticker_id: &str) -> Result<OrderFlowResponse, ProviderError>;

    async fn fetch_price_snapshot(&self, ticker_id: &str) -> Result<PriceResponse, ProviderError>;

    /// Rankable metric for the ranking phase
    async fn fetch_market_cap(&self, ticker_id: &str) -> Result<u64, ProviderError>;

    /// Ordered ids of every symbol listed in a market segment
    async fn list_symbols(&self, segment: MarketSegment) -> Result<Vec<String>, ProviderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Provider call recorded by [`ScriptedProvider`]
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub ticker_id: String,
        pub operation: &'static str,
        pub started_at: Instant,
    }

    /// In-memory provider returning scripted responses per ticker
    ///
    /// Each queue is consumed one response per call; an exhausted queue
    /// repeats its last response.
    #[derive(Default)]
    pub struct ScriptedProvider {
        order_flow: Mutex<HashMap<String, VecDeque<Result<OrderFlowResponse, ProviderError>>>>,
        prices: Mutex<HashMap<String, VecDeque<Result<PriceResponse, ProviderError>>>>,
        market_caps: Mutex<HashMap<String, Result<u64, ProviderError>>>,
        listing: Mutex<Vec<String>>,
        latency: Mutex<Option<Duration>>,
        calls: Mutex<Vec<RecordedCall>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_latency(self, latency: Duration) -> Self {
            *self.latency.lock().unwrap() = Some(latency);
            self
        }

        pub fn push_order_flow(&self, ticker: &str, response: Result<OrderFlowResponse, ProviderError>) {
            self.order_flow
                .lock()
                .unwrap()
                .entry(ticker.to_string())
                .or_default()
                .push_back(response);
        }

        pub fn push_price(&self, ticker: &str, response: Result<PriceResponse, ProviderError>) {
            self.prices
                .lock()
                .unwrap()
                .entry(ticker.to_string())
                .or_default()
                .push_back(response);
        }

        pub fn push_volume(&self, ticker: &str, price: &str, cumulative_volume: &str) {
            self.push_price(
                ticker,
                Ok(PriceResponse {
                    price: Some(price.to_string()),
                    cumulative_volume: Some(cumulative_volume.to_string()),
                    strength: Some("100".to_string()),
                }),
            );
        }

        pub fn set_market_cap(&self, ticker: &str, response: Result<u64, ProviderError>) {
            self.market_caps.lock().unwrap().insert(ticker.to_string(), response);
        }

        pub fn set_listing(&self, ids: &[&str]) {
            *self.listing.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        async fn enter(&self, ticker_id: &str, operation: &'static str) {
            self.calls.lock().unwrap().push(RecordedCall {
                ticker_id: ticker_id.to_string(),
                operation,
                started_at: Instant::now(),
            });
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            let latency = *self.latency.lock().unwrap();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        fn next<T: Clone>(
            queues: &Mutex<HashMap<String, VecDeque<Result<T, ProviderError>>>>,
            ticker_id: &str,
        ) -> Option<Result<T, ProviderError>> {
            let mut queues = queues.lock().unwrap();
            let queue = queues.get_mut(ticker_id)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for ScriptedProvider {
        fn id(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_order_flow(&self, ticker_id: &str) -> Result<OrderFlowResponse, ProviderError> {
            self.enter(ticker_id, "order_flow").await;
            let response = Self::next(&self.order_flow, ticker_id).unwrap_or_else(|| Ok(OrderFlowResponse::default()));
            self.leave();
            response
        }

        async fn fetch_price_snapshot(&self, ticker_id: &str) -> Result<PriceResponse, ProviderError> {
            self.enter(ticker_id, "price").await;
            let response = Self::next(&self.prices, ticker_id)
                .unwrap_or_else(|| Err(ProviderError::InvalidResponse("no scripted price".to_string())));
            self.leave();
            response
        }

        async fn fetch_market_cap(&self, ticker_id: &str) -> Result<u64, ProviderError> {
            self.enter(ticker_id, "market_cap").await;
            let response = self
                .market_caps
                .lock()
                .unwrap()
                .get(ticker_id)
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::InvalidResponse("no scripted market cap".to_string())));
            self.leave();
            response
        }

        async fn list_symbols(&self, _segment: MarketSegment) -> Result<Vec<String>, ProviderError> {
            Ok(self.listing.lock().unwrap().clone())
        }
    }
}
