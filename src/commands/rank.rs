//! Phased collection: rank by market cap, then collect the Top-N
//!
//! With `--follow` the selected tickers keep being polled like `collect`
//! until the window closes.

use crate::commands::{ctrl_c_stop, runtime, ConfigOverrides};
use crate::error::{AppError, Result};
use crate::models::{CollectorConfig, MarketSegment, Universe};
use crate::services::{KisClient, MarketDataProvider};
use crate::worker::{CollectorWorker, RankingReport, RankingWorker, RunMode};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(segment: String, universe_file: Option<PathBuf>, follow: bool, overrides: ConfigOverrides) {
    let segment = match MarketSegment::from_str(&segment) {
        Ok(segment) => segment,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let config = match overrides.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let client = match KisClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set KIS_APP_KEY, KIS_APP_SECRET and KIS_ACCESS_TOKEN");
            std::process::exit(1);
        }
    };

    match runtime().block_on(run_phased(client, segment, universe_file, follow, config)) {
        Ok(cycles) => {
            if follow {
                println!("\n✅ Follow-up collection finished after {} cycle(s)", cycles);
            } else {
                println!("\n✅ Phased run completed");
            }
        }
        Err(e) => {
            eprintln!("\n❌ Phased run failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_phased(
    client: Arc<KisClient>,
    segment: MarketSegment,
    universe_file: Option<PathBuf>,
    follow: bool,
    config: CollectorConfig,
) -> Result<u64> {
    let stop = ctrl_c_stop();

    let universe = match universe_file {
        Some(path) => Universe::from_file(&path)?,
        None => load_listing(client.as_ref(), segment).await?,
    };
    println!(
        "🏁 Ranking {} tickers by market cap, keeping top {}",
        universe.len(),
        config.top_n
    );

    let mut ranking = RankingWorker::new(config.clone(), universe, client.clone());
    let report = ranking.run(&stop).await?;
    print_selection(&report);

    if !follow || report.stopped_early {
        return Ok(0);
    }

    println!("\n📡 Following {} selected tickers", report.selection.len());
    let mut collector = CollectorWorker::new(config, report.selected_universe()?, client)
        .with_state(ranking.into_state());
    collector.run(stop, RunMode::Continuous).await
}

async fn load_listing(provider: &dyn MarketDataProvider, segment: MarketSegment) -> Result<Universe> {
    println!("📥 Downloading {} listing...", segment.as_str());
    let ids = provider
        .list_symbols(segment)
        .await
        .map_err(|e| AppError::Network(format!("Failed to list {} symbols: {}", segment.as_str(), e)))?;
    Universe::from_ids(ids)
}

fn print_selection(report: &RankingReport) {
    if report.selection.is_empty() {
        println!("⚠️  Stopped before selection");
        return;
    }

    println!("\n=== Top {} by market cap ===", report.selection.len());
    for (rank, record) in report.selection.iter().enumerate() {
        println!(
            "{:>3}. {} {} - market cap: {}",
            rank + 1,
            record.ticker.id,
            record.ticker.label(),
            record.market_cap
        );
    }
    if report.ranking_failures > 0 {
        println!("   ({} tickers could not be ranked)", report.ranking_failures);
    }
    println!("   {} records written", report.records_written);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_load_listing_keeps_listing_order() {
        let provider = ScriptedProvider::new();
        provider.set_listing(&["005930", "000660", "005930", "373220"]);

        let universe = load_listing(&provider, MarketSegment::Kospi).await.unwrap();
        let ids: Vec<&str> = universe.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["005930", "000660", "373220"]);
        assert_eq!(universe.tickers()[0].label(), "005930");
    }

    #[tokio::test]
    async fn test_load_listing_rejects_empty_listing() {
        let provider = ScriptedProvider::new();
        assert!(load_listing(&provider, MarketSegment::Kosdaq).await.is_err());
    }
}
