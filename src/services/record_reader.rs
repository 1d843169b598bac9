//! Reader for the persisted record format
//!
//! Mirrors what the dashboard accepts: a record opens with a `[HH:MM:SS]`
//! header and ends with the dashed separator. Lines that do not fit are
//! skipped rather than failing the whole file.

use crate::constants::{record_label, ABSENT_MARKER, LOG_EXTENSION, RECORD_TIME_FORMAT};
use crate::error::{AppError, Result};
use crate::models::BrokerEntry;
use crate::utils::{parse_count_str, parse_number_str};
use chrono::NaiveTime;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub time: NaiveTime,
    pub display_name: String,
    pub price: Option<f64>,
    pub instantaneous_volume: u64,
    pub cumulative_volume: Option<u64>,
    pub strength: Option<f64>,
    pub buy: Vec<BrokerEntry>,
    pub buy_total: u64,
    pub sell: Vec<BrokerEntry>,
    pub sell_total: u64,
}

impl ParsedRecord {
    fn new(time: NaiveTime, display_name: String) -> Self {
        Self {
            time,
            display_name,
            price: None,
            instantaneous_volume: 0,
            cumulative_volume: None,
            strength: None,
            buy: Vec::new(),
            buy_total: 0,
            sell: Vec::new(),
            sell_total: 0,
        }
    }
}

pub fn parse_records(content: &str) -> Vec<ParsedRecord> {
    let mut records = Vec::new();
    let mut current: Option<ParsedRecord> = None;

    for line in content.lines() {
        let line = line.trim_end();

        if line.starts_with('[') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = parse_header(line);
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix(record_label::PRICE) {
            parse_metrics(rest, record);
        } else if let Some(rest) = line.strip_prefix(record_label::BUY_TOP) {
            (record.buy, record.buy_total) = parse_side(rest);
        } else if let Some(rest) = line.strip_prefix(record_label::SELL_TOP) {
            (record.sell, record.sell_total) = parse_side(rest);
        } else if !line.is_empty() && line.chars().all(|c| c == '-') {
            if let Some(done) = current.take() {
                records.push(done);
            }
        }
    }

    if let Some(done) = current {
        records.push(done);
    }
    records
}

pub fn read_log(path: &Path) -> Result<Vec<ParsedRecord>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_records(&content))
}

/// Per-ticker overview of one date folder
#[derive(Debug, Clone)]
pub struct LogSummary {
    pub name: String,
    pub records: usize,
    pub last: Option<ParsedRecord>,
}

/// Summarize every log in a date folder, sorted by file name
pub fn summarize_date_dir(date_dir: &Path) -> Result<Vec<LogSummary>> {
    if !date_dir.is_dir() {
        return Err(AppError::NotFound(format!("no collection folder at {}", date_dir.display())));
    }

    let mut summaries = Vec::new();
    for entry in fs::read_dir(date_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        let mut records = read_log(&path)?;
        summaries.push(LogSummary {
            name,
            records: records.len(),
            last: records.pop(),
        });
    }

    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

fn parse_header(line: &str) -> Option<ParsedRecord> {
    let (time_part, rest) = line.strip_prefix('[')?.split_once(']')?;
    let time = NaiveTime::parse_from_str(time_part, RECORD_TIME_FORMAT).ok()?;
    let name = rest.trim().strip_prefix(record_label::TICKER)?.trim();
    Some(ParsedRecord::new(time, name.to_string()))
}

fn parse_metrics(rest: &str, record: &mut ParsedRecord) {
    // First field has had its label stripped already
    let mut fields = rest.split(record_label::FIELD_SEPARATOR);
    record.price = fields.next().and_then(absent_or_number);

    for field in fields {
        let field = field.trim();
        if let Some(v) = field.strip_prefix(record_label::INSTANT_VOLUME) {
            record.instantaneous_volume = parse_count_str(v).unwrap_or(0);
        } else if let Some(v) = field.strip_prefix(record_label::CUMULATIVE_VOLUME) {
            record.cumulative_volume = if is_absent(v) { None } else { parse_count_str(v) };
        } else if let Some(v) = field.strip_prefix(record_label::STRENGTH) {
            record.strength = absent_or_number(v);
        }
    }
}

fn parse_side(rest: &str) -> (Vec<BrokerEntry>, u64) {
    let total_marker = format!("({} ", record_label::TOTAL);
    let (ranked, total) = match rest.rfind(&total_marker) {
        Some(pos) => {
            let total = rest[pos + total_marker.len()..].trim_end_matches(')');
            (&rest[..pos], parse_count_str(total).unwrap_or(0))
        }
        None => (rest, 0),
    };

    let entries = ranked
        .split(record_label::FIELD_SEPARATOR)
        .filter_map(|item| {
            let (_, named) = item.trim().split_once(". ")?;
            let (name, quantity) = named.rsplit_once(' ')?;
            Some(BrokerEntry::new(name.trim(), parse_count_str(quantity).unwrap_or(0)))
        })
        .collect();
    (entries, total)
}

fn is_absent(value: &str) -> bool {
    value.trim() == ABSENT_MARKER
}

fn absent_or_number(value: &str) -> Option<f64> {
    if is_absent(value) {
        None
    } else {
        parse_number_str(value)
    }
}
