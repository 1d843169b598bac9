use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, ConfigOverrides};

#[derive(Parser)]
#[command(name = "orderflow-collector")]
#[command(about = "Rate-limited KRX order-flow and volume collector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll every ticker of the universe each cycle while the window is open
    Collect {
        /// JSON universe file: [{"id": "005930", "display_name": "삼성전자"}]
        #[arg(short, long)]
        universe: Option<PathBuf>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Save the volume baseline after each cycle and restore it on restart (same date only)
        #[arg(long)]
        persist_baseline: bool,

        /// Window start, HH:MM (default 09:00)
        #[arg(long)]
        start: Option<String>,

        /// Window end, HH:MM (default 15:30)
        #[arg(long)]
        end: Option<String>,

        /// Market timezone (default Asia/Seoul)
        #[arg(long)]
        timezone: Option<String>,

        /// Minimum delay between ticker units in milliseconds (default 300)
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Skip Saturdays and Sundays
        #[arg(long)]
        weekdays_only: bool,

        /// Output root (default: COLLECTOR_DATA_DIR or ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Rank a market segment by market cap, then collect the Top-N
    Rank {
        /// Market segment to list: kospi or kosdaq
        #[arg(short, long, default_value = "kospi")]
        segment: String,

        /// Rank a JSON universe file instead of the market listing
        #[arg(short, long)]
        universe: Option<PathBuf>,

        /// Number of tickers to select (default 50)
        #[arg(short, long)]
        top: Option<usize>,

        /// Keep polling the selection until the window closes
        #[arg(long)]
        follow: bool,

        #[arg(long)]
        persist_baseline: bool,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        pacing_ms: Option<u64>,

        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Summarize the records collected for a date
    Status {
        /// Collection date, YYYYMMDD (default: today in the market timezone)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            universe,
            once,
            persist_baseline,
            start,
            end,
            timezone,
            pacing_ms,
            weekdays_only,
            data_dir,
        } => {
            let overrides = ConfigOverrides {
                data_dir,
                start,
                end,
                timezone,
                pacing_ms,
                persist_baseline,
                weekdays_only,
                ..ConfigOverrides::default()
            };
            commands::collect::run(universe, once, overrides);
        }
        Commands::Rank {
            segment,
            universe,
            top,
            follow,
            persist_baseline,
            start,
            end,
            pacing_ms,
            data_dir,
        } => {
            let overrides = ConfigOverrides {
                data_dir,
                start,
                end,
                pacing_ms,
                top_n: top,
                persist_baseline,
                ..ConfigOverrides::default()
            };
            commands::rank::run(segment, universe, follow, overrides);
        }
        Commands::Status { date, data_dir } => {
            commands::status::run(date, data_dir);
        }
    }
}
