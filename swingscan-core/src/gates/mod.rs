//! Gate stages: outcome types, rationale trail, and the stage trait.
//!
//! A gate tests a single investment criterion over the current survivor
//! set and produces, per instrument, a three-way outcome:
//!
//! - `Pass` — the instrument advances to the next gate
//! - `SoftFail` — structurally sound but not confirmed (watchlist, not
//!   rejection); only the trend gate produces this
//! - `HardFail` — rejected, excluded from everything downstream
//!
//! Every outcome carries a [`GateResult`] with numeric metrics and a
//! human-readable reason, pass or fail, because the accumulated trail is
//! the compliance audit record.

pub mod execution;
pub mod fundamentals;
pub mod institutional;
pub mod spread;
pub mod trend;

pub use execution::ExecutionGate;
pub use fundamentals::FundamentalsGate;
pub use institutional::InstitutionalGate;
pub use spread::SpreadGate;
pub use trend::TrendGate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ScanBatch;

/// Stable gate names used as rationale-trail keys. Persisted audit records
/// key on these strings; renaming one is a schema change.
pub mod names {
    pub const SPREAD: &str = "Gate1_Spread";
    pub const FUNDAMENTALS: &str = "Gate2_Fundamentals";
    pub const INSTITUTIONAL: &str = "Gate2B_Institutional";
    pub const TECHNICALS: &str = "Gate3_Technicals";
    pub const EXECUTION: &str = "Gate4_Execution";
}

/// Per-instrument soft-failure taxonomy.
///
/// None of these abort a scan: each becomes a failed [`GateResult`] (or a
/// documented threshold fallback, for `DegenerateGroup`) and the batch
/// continues.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("insufficient history: need {required} sessions, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("sector '{sector}' has too few peers for a z-score ({count} member(s))")]
    DegenerateGroup { sector: String, count: usize },
    #[error("compute error: {0}")]
    Compute(String),
}

/// Immutable per-instrument, per-gate audit record.
///
/// Serializes to a plain mapping of primitives; this exact structure is
/// persisted verbatim by the audit collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub passed: bool,
    pub metrics: BTreeMap<String, f64>,
    pub reason: String,
}

impl GateResult {
    pub fn pass(reason: impl Into<String>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            passed: true,
            metrics,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            passed: false,
            metrics,
            reason: reason.into(),
        }
    }

    /// Failed result from a gate error, no metrics recorded.
    pub fn from_error(err: &GateError) -> Self {
        Self::fail(err.to_string(), BTreeMap::new())
    }
}

/// Three-way gate outcome (see module docs).
#[derive(Debug, Clone)]
pub enum GateOutcome {
    Pass(GateResult),
    SoftFail(GateResult),
    HardFail(GateResult),
}

impl GateOutcome {
    pub fn result(&self) -> &GateResult {
        match self {
            GateOutcome::Pass(r) | GateOutcome::SoftFail(r) | GateOutcome::HardFail(r) => r,
        }
    }

    pub fn into_result(self) -> GateResult {
        match self {
            GateOutcome::Pass(r) | GateOutcome::SoftFail(r) | GateOutcome::HardFail(r) => r,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass(_))
    }

    pub fn is_soft_fail(&self) -> bool {
        matches!(self, GateOutcome::SoftFail(_))
    }
}

/// Output of one gate stage over its survivor set.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    /// Instruments that advance to the next gate, input order preserved.
    pub survivors: Vec<String>,
    /// Soft-failed instruments (coiling springs); empty for binary gates.
    pub soft_failed: Vec<String>,
    /// Audit record for every instrument this stage evaluated.
    pub results: BTreeMap<String, GateResult>,
}

impl StageOutput {
    /// Partition per-instrument outcomes, preserving evaluation order.
    pub fn from_outcomes(outcomes: Vec<(String, GateOutcome)>) -> Self {
        let mut output = StageOutput::default();
        for (ticker, outcome) in outcomes {
            match &outcome {
                GateOutcome::Pass(_) => output.survivors.push(ticker.clone()),
                GateOutcome::SoftFail(_) => output.soft_failed.push(ticker.clone()),
                GateOutcome::HardFail(_) => {}
            }
            output.results.insert(ticker, outcome.into_result());
        }
        output
    }
}

/// One filtering stage of the pipeline.
///
/// Stages are pure with respect to the batch: `(survivors, batch)` in,
/// `(new survivors, results)` out. A stage never sees instruments rejected
/// upstream, and its survivor list is always a subset of its input.
pub trait GateStage: Send + Sync {
    /// Stable stage name used as the rationale-trail key.
    fn name(&self) -> &'static str;

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput;
}

/// Accumulated audit trail: ticker → gate name → result.
///
/// Append-only; entries are never overwritten. An instrument only ever has
/// entries for gates that actually evaluated it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RationaleTrail(BTreeMap<String, BTreeMap<String, GateResult>>);

impl RationaleTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one stage's results under its gate name.
    pub fn absorb(&mut self, gate_name: &str, results: BTreeMap<String, GateResult>) {
        for (ticker, result) in results {
            self.0
                .entry(ticker)
                .or_default()
                .insert(gate_name.to_string(), result);
        }
    }

    pub fn get(&self, ticker: &str, gate_name: &str) -> Option<&GateResult> {
        self.0.get(ticker).and_then(|gates| gates.get(gate_name))
    }

    pub fn gates_for(&self, ticker: &str) -> Option<&BTreeMap<String, GateResult>> {
        self.0.get(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
