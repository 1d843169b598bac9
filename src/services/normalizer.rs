use crate::models::{BrokerEntry, Snapshot, StrengthBand, Top5List};
use crate::services::collection_state::CollectionState;
use crate::services::provider::{OrderFlowResponse, PriceResponse, RawBrokerRow};
use crate::services::scheduler::TickerOutcome;
use crate::utils::{parse_count_str, parse_number_str};
use chrono::NaiveDateTime;
use tracing::debug;

/// Where a snapshot's strength figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthSource {
    Reported,
    Fallback,
    Absent,
}

/// Parse one side of the order flow; unparsable quantities count as 0
pub fn parse_side(rows: &[RawBrokerRow]) -> Top5List {
    Top5List::from_entries(rows.iter().map(|row| {
        let quantity = parse_count_str(&row.quantity).unwrap_or(0);
        BrokerEntry::new(row.name.trim(), quantity)
    }))
}

/// Returns (buy, sell)
pub fn parse_order_flow(response: &OrderFlowResponse) -> (Top5List, Top5List) {
    (parse_side(&response.buy), parse_side(&response.sell))
}

/// Two-tier strength resolution
///
/// The reported percentage is used when it parses and lies inside `band`.
/// Otherwise the buy/sell ratio of the broker totals is used, rounded to two
/// decimals, or nothing when there is no sell volume.
pub fn resolve_strength(
    reported: Option<&str>,
    total_buy: u64,
    total_sell: u64,
    band: &StrengthBand,
) -> (Option<f64>, StrengthSource) {
    if let Some(value) = reported.and_then(parse_number_str) {
        if band.contains(value) {
            return (Some(value), StrengthSource::Reported);
        }
    }

    if total_sell > 0 {
        let ratio = 100.0 * total_buy as f64 / total_sell as f64;
        let rounded = (ratio * 100.0).round() / 100.0;
        (Some(rounded), StrengthSource::Fallback)
    } else {
        (None, StrengthSource::Absent)
    }
}

/// Turns one ticker's call outcomes into a [`Snapshot`]
#[derive(Debug, Clone, Default)]
pub struct MetricNormalizer {
    band: StrengthBand,
}

impl MetricNormalizer {
    pub fn new(band: StrengthBand) -> Self {
        Self { band }
    }

    pub fn normalize(
        &self,
        outcome: &TickerOutcome,
        state: &mut CollectionState,
        timestamp: NaiveDateTime,
    ) -> Snapshot {
        let (buy_top5, sell_top5) = match &outcome.order_flow {
            Ok(response) => parse_order_flow(response),
            Err(_) => (Top5List::empty(), Top5List::empty()),
        };

        let empty = PriceResponse::default();
        let price_response = outcome.price.as_ref().unwrap_or(&empty);

        let price = price_response.price.as_deref().and_then(parse_number_str);
        let cumulative_volume = price_response.cumulative_volume.as_deref().and_then(parse_count_str);
        let instantaneous_volume = state.observe(&outcome.ticker.id, cumulative_volume);

        let (strength, source) = resolve_strength(
            price_response.strength.as_deref(),
            buy_top5.total(),
            sell_top5.total(),
            &self.band,
        );
        if source != StrengthSource::Reported {
            debug!(
                ticker = %outcome.ticker.id,
                reported = ?price_response.strength,
                source = ?source,
                "Reported strength rejected"
            );
        }

        Snapshot {
            timestamp,
            ticker: outcome.ticker.clone(),
            price,
            instantaneous_volume,
            cumulative_volume,
            strength,
            buy_top5,
            sell_top5,
        }
    }
}
