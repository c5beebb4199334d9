//! Instrument — the per-ticker snapshot evaluated by the gates.
//!
//! An instrument bundles everything the pipeline knows about one ticker at
//! scan time: the daily series plus sector, market-cap tier, fundamentals
//! and institutional metadata. All metadata fields are optional; the gates
//! define a conservative fallback for every missing value.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Market-capitalization classification used to vary gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapTier {
    Large,
    Mid,
    Small,
}

impl std::fmt::Display for CapTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapTier::Large => write!(f, "LARGE"),
            CapTier::Mid => write!(f, "MID"),
            CapTier::Small => write!(f, "SMALL"),
        }
    }
}

/// One fiscal year of accounting line items.
///
/// Every field is optional: disclosures in the target market are frequently
/// partial, and a missing input must fail the signal that needs it rather
/// than crash or silently pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearFigures {
    pub net_income: Option<f64>,
    pub cfo: Option<f64>,
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub gross_profit: Option<f64>,
    pub revenue: Option<f64>,
}

/// Fundamentals snapshot: current and prior fiscal year, plus governance data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub current: YearFigures,
    pub prior: YearFigures,
    /// Percentage of the promoter/controlling-shareholder stake pledged.
    pub promoter_pledge_pct: Option<f64>,
}

/// Institutional ownership and float metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionalSnapshot {
    pub inst_ownership_pct: Option<f64>,
    pub free_float_pct: Option<f64>,
}

/// Immutable per-scan snapshot for one ticker.
///
/// Owned by the batch for the duration of a scan; gates read it and produce
/// result records, they never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    /// Daily OHLCV rows, chronological. May be empty or short; gates degrade
    /// to a per-instrument fail, never a crash.
    pub series: Vec<Bar>,
    /// Sector name; "Unknown" (or empty) marks an unsectored instrument.
    pub sector: String,
    pub cap_tier: Option<CapTier>,
    pub fundamentals: FundamentalsSnapshot,
    pub institutional: InstitutionalSnapshot,
}

impl Instrument {
    /// Bare instrument with a series and no metadata resolved.
    pub fn new(ticker: impl Into<String>, series: Vec<Bar>) -> Self {
        Self {
            ticker: ticker.into(),
            series,
            sector: "Unknown".to_string(),
            cap_tier: None,
            fundamentals: FundamentalsSnapshot::default(),
            institutional: InstitutionalSnapshot::default(),
        }
    }

    /// Close of the most recent session, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.series.last().map(|bar| bar.close)
    }

    /// True when the sector is unresolved and must be treated as its own
    /// degenerate peer group.
    pub fn is_unsectored(&self) -> bool {
        self.sector.is_empty() || self.sector.eq_ignore_ascii_case("unknown")
    }
}
