//! Scan batch — the immutable input snapshot for one pipeline run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Instrument};

/// Immutable per-scan snapshot of the universe under evaluation.
///
/// Supplied fully materialized by the data-acquisition collaborator; the
/// core never blocks on network or disk I/O. Instruments are keyed by
/// ticker in a `BTreeMap` so iteration order (and therefore every survivor
/// list) is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanBatch {
    instruments: BTreeMap<String, Instrument>,
    /// Broad benchmark index series used by the relative-strength test.
    /// May be empty; relative strength then degrades to a recorded failure.
    pub benchmark: Vec<Bar>,
    /// Minutes elapsed in the current trading session, for intraday volume
    /// proration. `None` means the session is complete (end-of-day batch).
    pub session_elapsed_min: Option<f64>,
}

impl ScanBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instrument, keyed by its ticker.
    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.ticker.clone(), instrument);
    }

    pub fn get(&self, ticker: &str) -> Option<&Instrument> {
        self.instruments.get(ticker)
    }

    /// All tickers, sorted. This is the Gate 1 entry set.
    pub fn tickers(&self) -> Vec<String> {
        self.instruments.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }
}
