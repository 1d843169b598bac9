//! Two-phase collection state machine
//!
//! ```text
//! Ranking ──queue empty──▶ Selecting ──results ready──▶ Detailing ──queue empty──▶ Done
//! ```
//!
//! The machine performs no I/O. A driver calls [`PhasedScheduler::pump`] on
//! every pacing tick, performs the returned unit of work, then reports the
//! result through `complete_ranking` / `complete_detail`. While a unit is
//! outstanding the busy flag is set and `pump` issues nothing.

use crate::models::{MarketCapRecord, Ticker, Universe};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ranking,
    Selecting,
    Detailing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkUnit {
    /// Fetch the rankable metric for a ticker
    Rank(Ticker),
    /// Collect order flow and price for a selected ticker
    Detail(Ticker),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PumpAction {
    /// Perform this unit, then report its completion
    Issue(WorkUnit),
    /// A unit is still outstanding
    Busy,
    /// Ranking finished without a single rankable result; retry next tick
    AwaitingResults,
    /// Top-N computed and loaded into the detail queue
    Selected(Vec<MarketCapRecord>),
    Finished,
}

pub struct PhasedScheduler {
    phase: Phase,
    top_n: usize,
    ranking_queue: VecDeque<(usize, Ticker)>,
    detail_queue: VecDeque<Ticker>,
    results: Vec<MarketCapRecord>,
    selection: Vec<MarketCapRecord>,
    in_flight: Option<WorkUnit>,
    in_flight_index: usize,
    ranking_total: usize,
}

impl PhasedScheduler {
    pub fn new(universe: &Universe, top_n: usize) -> Self {
        let ranking_queue: VecDeque<(usize, Ticker)> = universe.iter().cloned().enumerate().collect();
        Self {
            phase: Phase::Ranking,
            top_n,
            ranking_total: ranking_queue.len(),
            ranking_queue,
            detail_queue: VecDeque::new(),
            results: Vec::new(),
            selection: Vec::new(),
            in_flight: None,
            in_flight_index: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn ranking_results(&self) -> &[MarketCapRecord] {
        &self.results
    }

    pub fn selection(&self) -> &[MarketCapRecord] {
        &self.selection
    }

    pub fn pending_ranking(&self) -> usize {
        self.ranking_queue.len()
    }

    pub fn pending_detail(&self) -> usize {
        self.detail_queue.len()
    }

    /// Advance by one tick
    pub fn pump(&mut self) -> PumpAction {
        if self.in_flight.is_some() {
            return PumpAction::Busy;
        }

        loop {
            match self.phase {
                Phase::Ranking => match self.ranking_queue.pop_front() {
                    Some((index, ticker)) => {
                        self.in_flight_index = index;
                        return self.issue(WorkUnit::Rank(ticker));
                    }
                    None => {
                        info!(
                            ranked = self.results.len(),
                            total = self.ranking_total,
                            "Ranking queue drained"
                        );
                        self.phase = Phase::Selecting;
                    }
                },
                Phase::Selecting => {
                    if self.results.is_empty() {
                        warn!("No rankable results yet, retrying selection on next tick");
                        return PumpAction::AwaitingResults;
                    }

                    self.selection = select_top_n(&self.results, self.top_n);
                    self.detail_queue = self.selection.iter().map(|r| r.ticker.clone()).collect();
                    self.results.clear();
                    self.phase = Phase::Detailing;

                    info!(selected = self.selection.len(), top_n = self.top_n, "Top-N selection complete");
                    return PumpAction::Selected(self.selection.clone());
                }
                Phase::Detailing => match self.detail_queue.pop_front() {
                    Some(ticker) => return self.issue(WorkUnit::Detail(ticker)),
                    None => {
                        info!(collected = self.selection.len(), "Detail queue drained");
                        self.phase = Phase::Done;
                    }
                },
                Phase::Done => return PumpAction::Finished,
            }
        }
    }

    fn issue(&mut self, unit: WorkUnit) -> PumpAction {
        self.in_flight = Some(unit.clone());
        PumpAction::Issue(unit)
    }

    /// Completion handler for a ranking unit; `None` when the call failed
    pub fn complete_ranking(&mut self, market_cap: Option<u64>) {
        match self.in_flight.take() {
            Some(WorkUnit::Rank(ticker)) => match market_cap {
                Some(market_cap) => self.results.push(MarketCapRecord {
                    ticker,
                    market_cap,
                    enumeration_index: self.in_flight_index,
                }),
                None => debug!(ticker = %ticker.id, "No rankable metric, excluded from selection"),
            },
            other => {
                warn!(in_flight = ?other, "Ranking completion without a ranking unit in flight");
                self.in_flight = other;
            }
        }
    }

    /// Completion handler for a detail unit
    pub fn complete_detail(&mut self) {
        match self.in_flight.take() {
            Some(WorkUnit::Detail(_)) => {}
            other => {
                warn!(in_flight = ?other, "Detail completion without a detail unit in flight");
                self.in_flight = other;
            }
        }
    }
}

/// Highest `n` records by market cap; ties keep enumeration order
pub fn select_top_n(records: &[MarketCapRecord], n: usize) -> Vec<MarketCapRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        b.market_cap
            .cmp(&a.market_cap)
            .then(a.enumeration_index.cmp(&b.enumeration_index))
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(ids: &[&str]) -> Universe {
        Universe::from_ids(ids.iter().map(|s| s.to_string())).unwrap()
    }

    fn record(id: &str, market_cap: u64, enumeration_index: usize) -> MarketCapRecord {
        MarketCapRecord {
            ticker: Ticker::from_id(id),
            market_cap,
            enumeration_index,
        }
    }

    fn issued_id(action: PumpAction) -> String {
        match action {
            PumpAction::Issue(WorkUnit::Rank(t)) | PumpAction::Issue(WorkUnit::Detail(t)) => t.id,
            other => panic!("expected issued unit, got {:?}", other),
        }
    }

    #[test]
    fn test_full_walk_through_phases() {
        let mut fsm = PhasedScheduler::new(&universe(&["A", "B", "C"]), 2);
        let caps = [("A", 10), ("B", 30), ("C", 20)];

        for (id, cap) in caps {
            let action = fsm.pump();
            assert_eq!(action, PumpAction::Issue(WorkUnit::Rank(Ticker::from_id(id))));
            assert_eq!(fsm.pump(), PumpAction::Busy);
            fsm.complete_ranking(Some(cap));
        }
        assert_eq!(fsm.phase(), Phase::Ranking);

        match fsm.pump() {
            PumpAction::Selected(selection) => {
                let ids: Vec<&str> = selection.iter().map(|r| r.ticker.id.as_str()).collect();
                assert_eq!(ids, vec!["B", "C"]);
            }
            other => panic!("expected selection, got {:?}", other),
        }
        assert_eq!(fsm.phase(), Phase::Detailing);
        assert_eq!(fsm.pending_detail(), 2);

        assert_eq!(issued_id(fsm.pump()), "B");
        assert_eq!(fsm.pump(), PumpAction::Busy);
        fsm.complete_detail();
        assert_eq!(issued_id(fsm.pump()), "C");
        fsm.complete_detail();

        assert_eq!(fsm.pump(), PumpAction::Finished);
        assert_eq!(fsm.phase(), Phase::Done);
        assert_eq!(fsm.pump(), PumpAction::Finished);
    }

    #[test]
    fn test_selection_waits_for_ranking_to_drain() {
        let mut fsm = PhasedScheduler::new(&universe(&["A", "B", "C"]), 1);

        for cap in [5, 50] {
            fsm.pump();
            fsm.complete_ranking(Some(cap));
            assert!(fsm.selection().is_empty());
            assert_eq!(fsm.phase(), Phase::Ranking);
        }

        // Last ranking unit still in flight: nothing may be selected
        fsm.pump();
        assert_eq!(fsm.pump(), PumpAction::Busy);
        assert!(fsm.selection().is_empty());

        fsm.complete_ranking(Some(500));
        assert!(matches!(fsm.pump(), PumpAction::Selected(_)));
        assert_eq!(fsm.selection()[0].ticker.id, "C");
    }

    #[test]
    fn test_empty_results_stay_in_selecting() {
        let mut fsm = PhasedScheduler::new(&universe(&["A", "B"]), 5);
        for _ in 0..2 {
            fsm.pump();
            fsm.complete_ranking(None);
        }

        for _ in 0..3 {
            assert_eq!(fsm.pump(), PumpAction::AwaitingResults);
            assert_eq!(fsm.phase(), Phase::Selecting);
        }
        assert!(!fsm.is_busy());
    }

    #[test]
    fn test_failed_ranking_excluded() {
        let mut fsm = PhasedScheduler::new(&universe(&["A", "B", "C"]), 3);
        for cap in [Some(1), None, Some(2)] {
            fsm.pump();
            fsm.complete_ranking(cap);
        }

        match fsm.pump() {
            PumpAction::Selected(selection) => {
                let ids: Vec<&str> = selection.iter().map(|r| r.ticker.id.as_str()).collect();
                assert_eq!(ids, vec!["C", "A"]);
            }
            other => panic!("expected selection, got {:?}", other),
        }
    }

    #[test]
    fn test_select_top_n_ties_keep_enumeration_order() {
        let records = vec![record("A", 5, 0), record("B", 7, 1), record("C", 5, 2), record("D", 5, 3)];
        let ids: Vec<String> = select_top_n(&records, 3).into_iter().map(|r| r.ticker.id).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_select_top_n_size_and_order() {
        let records: Vec<MarketCapRecord> = (0..12)
            .map(|i| record(&format!("T{}", i), (i as u64 * 7919) % 13, i))
            .collect();

        for n in [1, 5, 12, 50] {
            let selected = select_top_n(&records, n);
            assert_eq!(selected.len(), n.min(records.len()));
            for pair in selected.windows(2) {
                assert!(
                    pair[0].market_cap > pair[1].market_cap
                        || (pair[0].market_cap == pair[1].market_cap
                            && pair[0].enumeration_index < pair[1].enumeration_index)
                );
            }
        }
    }

    #[test]
    fn test_mismatched_completion_is_ignored() {
        let mut fsm = PhasedScheduler::new(&universe(&["A"]), 1);
        fsm.complete_detail();
        assert!(!fsm.is_busy());

        fsm.pump();
        fsm.complete_detail();
        assert!(fsm.is_busy());
        fsm.complete_ranking(Some(1));
        assert!(!fsm.is_busy());
        assert_eq!(fsm.ranking_results().len(), 1);
    }
}
