use crate::constants::DATE_FOLDER_FORMAT;
use crate::error::{AppError, Result};
use crate::models::CollectorConfig;
use crate::services::{summarize_date_dir, CollectionWindow, LogSummary, SnapshotWriter};
use crate::utils::get_data_dir;
use chrono::NaiveDate;
use std::path::PathBuf;

pub fn run(date: Option<String>, data_dir: Option<PathBuf>) {
    println!("📊 Collection Status\n");

    if let Err(e) = show_status(date, data_dir) {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn show_status(date: Option<String>, data_dir: Option<PathBuf>) -> Result<()> {
    let config = CollectorConfig::from_env()?;
    let date = match date {
        Some(value) => parse_date(&value)?,
        None => CollectionWindow::new(config.window).now_local().date(),
    };
    let writer = SnapshotWriter::new(data_dir.unwrap_or_else(get_data_dir));
    let date_dir = writer.date_dir(date);

    let summaries = match summarize_date_dir(&date_dir) {
        Ok(summaries) => summaries,
        Err(AppError::NotFound(_)) => {
            println!("⚠️  No records for {} in {}", date, writer.base_dir().display());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let total: usize = summaries.iter().map(|s| s.records).sum();
    println!("📅 {}  ({})", date, date_dir.display());
    println!("📈 {} tickers, {} records\n", summaries.len(), total);

    for summary in &summaries {
        print_summary(summary);
    }

    Ok(())
}

fn print_summary(summary: &LogSummary) {
    let Some(last) = &summary.last else {
        println!("🔹 {:<16} {:>6} records", summary.name, summary.records);
        return;
    };

    let price = last.price.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
    let strength = last.strength.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string());
    println!(
        "🔹 {:<16} {:>6} records  last {}  price {}  strength {}  buy/sell {}/{}",
        summary.name,
        summary.records,
        last.time,
        price,
        strength,
        last.buy_total,
        last.sell_total
    );
}

/// Accepts the folder format (YYYYMMDD) or ISO dates
fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FOLDER_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| AppError::InvalidInput(format!("invalid date '{}', expected YYYYMMDD", value)))
}
