//! Polling collection command
//!
//! Usage:
//! - Built-in watchlist until the window closes: `collect`
//! - Custom universe, single cycle: `collect --universe tickers.json --once`

use crate::commands::{ctrl_c_stop, runtime, ConfigOverrides};
use crate::models::Universe;
use crate::services::KisClient;
use crate::worker::{CollectorWorker, RunMode};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(universe_file: Option<PathBuf>, once: bool, overrides: ConfigOverrides) {
    let config = match overrides.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let universe = match universe_file {
        Some(path) => match Universe::from_file(&path) {
            Ok(universe) => universe,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => Universe::default_watchlist(),
    };

    let client = match KisClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set KIS_APP_KEY, KIS_APP_SECRET and KIS_ACCESS_TOKEN");
            std::process::exit(1);
        }
    };

    println!("📡 Collecting {} tickers into {}", universe.len(), config.data_dir.display());
    println!(
        "   Window: {} - {} ({}), pacing {}ms, cycle every {}s",
        config.window.start,
        config.window.end,
        config.window.timezone,
        config.pacing.as_millis(),
        config.cycle_interval.as_secs()
    );
    if config.persist_baseline {
        println!("   Volume baseline is persisted per collection date");
    }

    let mode = if once { RunMode::Once } else { RunMode::Continuous };

    match runtime().block_on(async {
        let stop = ctrl_c_stop();
        let mut worker = CollectorWorker::new(config, universe, Arc::new(client));
        worker.run(stop, mode).await
    }) {
        Ok(cycles) => {
            println!("\n✅ Collection finished after {} cycle(s)", cycles);
        }
        Err(e) => {
            eprintln!("\n❌ Collection failed: {}", e);
            std::process::exit(1);
        }
    }
}
