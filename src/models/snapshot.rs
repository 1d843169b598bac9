use crate::constants::TOP_BROKERS;
use crate::models::Ticker;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One ranked counter-party on a side of the order flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEntry {
    pub name: String,
    pub quantity: u64,
}

impl BrokerEntry {
    pub fn new(name: impl Into<String>, quantity: u64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Up to five ranked brokers on one side, with the sum of their quantities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Top5List {
    entries: Vec<BrokerEntry>,
    total: u64,
}

impl Top5List {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read ranks 1..=5 in order and drop the unnamed ones
    ///
    /// Ranks past the fifth never fill a gap left by an unnamed rank.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = BrokerEntry>,
    {
        let entries: Vec<BrokerEntry> = entries
            .into_iter()
            .take(TOP_BROKERS)
            .filter(|e| !e.name.trim().is_empty())
            .collect();
        let total = entries.iter().fold(0u64, |acc, e| acc.saturating_add(e.quantity));
        Self { entries, total }
    }

    pub fn entries(&self) -> &[BrokerEntry] {
        &self.entries
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ranking-phase metric for one ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketCapRecord {
    pub ticker: Ticker,
    pub market_cap: u64,
    /// Position of the ticker in the ranking queue
    pub enumeration_index: usize,
}

/// One collection tick's observation of a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Market-local wall clock time of the tick
    pub timestamp: NaiveDateTime,
    pub ticker: Ticker,
    pub price: Option<f64>,
    pub instantaneous_volume: u64,
    pub cumulative_volume: Option<u64>,
    pub strength: Option<f64>,
    pub buy_top5: Top5List,
    pub sell_top5: Top5List,
}

impl Snapshot {
    /// Date folder this snapshot belongs to
    pub fn collection_date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top5_excludes_unnamed_entries() {
        let list = Top5List::from_entries(vec![
            BrokerEntry::new("키움증권", 100),
            BrokerEntry::new("", 999),
            BrokerEntry::new("  ", 5),
            BrokerEntry::new("미래에셋", 50),
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.total(), 150);
        assert_eq!(list.entries()[1].name, "미래에셋");
    }

    #[test]
    fn test_top5_caps_at_five() {
        let list = Top5List::from_entries((1..=7).map(|i| BrokerEntry::new(format!("B{}", i), i)));

        assert_eq!(list.len(), 5);
        assert_eq!(list.total(), 1 + 2 + 3 + 4 + 5);
    }

    #[test]
    fn test_top5_unnamed_rank_is_not_backfilled() {
        let list = Top5List::from_entries(vec![
            BrokerEntry::new("R1", 10),
            BrokerEntry::new("", 20),
            BrokerEntry::new("R3", 30),
            BrokerEntry::new("R4", 40),
            BrokerEntry::new("R5", 50),
            BrokerEntry::new("R6", 60),
        ]);

        let names: Vec<&str> = list.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["R1", "R3", "R4", "R5"]);
        assert_eq!(list.total(), 130);
    }

    #[test]
    fn test_top5_total_saturates() {
        let list = Top5List::from_entries(vec![BrokerEntry::new("A", u64::MAX), BrokerEntry::new("B", 1)]);
        assert_eq!(list.total(), u64::MAX);
    }

    #[test]
    fn test_top5_total_matches_entries() {
        let inputs = [
            vec![],
            vec![BrokerEntry::new("A", 0)],
            vec![BrokerEntry::new("A", 7), BrokerEntry::new("", 3), BrokerEntry::new("C", 11)],
        ];
        for input in inputs {
            let list = Top5List::from_entries(input);
            let sum: u64 = list.entries().iter().map(|e| e.quantity).sum();
            assert_eq!(list.total(), sum);
            assert!(list.entries().iter().all(|e| !e.name.is_empty()));
        }
    }

    #[test]
    fn test_empty_list() {
        let list = Top5List::empty();
        assert!(list.is_empty());
        assert_eq!(list.total(), 0);
    }
}
