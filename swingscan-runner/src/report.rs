//! Scan report and export — the artifacts downstream collaborators consume.
//!
//! The report is the verbatim persistence payload: candidates, watchlist,
//! funnel counts, and the full rationale trail, all plain nested mappings
//! of primitives. Exports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: candidate tape for external analysis tools

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use swingscan_core::config::ScanConfig;
use swingscan_core::gates::RationaleTrail;

use crate::candidates::Candidate;
use crate::watchlist::WatchlistEntry;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Survivor counts at each stage of the funnel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub total_scanned: usize,
    pub passed_g1: usize,
    pub passed_g2: usize,
    pub passed_g2b: usize,
    pub trend_confirmed: usize,
    pub buy_candidates: usize,
    pub coiling_springs: usize,
}

/// Complete output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Fingerprint of the configuration that produced this report.
    pub config_fingerprint: String,
    /// Ordered candidates: BUY first, then COILING_SPRING.
    pub candidates: Vec<Candidate>,
    /// Daily coiling-spring watchlist.
    pub watchlist: Vec<WatchlistEntry>,
    pub funnel: FunnelMetrics,
    /// Full audit trail for every instrument that entered Gate 1.
    pub rationale: RationaleTrail,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ScanReport {
    pub fn new(
        config: &ScanConfig,
        candidates: Vec<Candidate>,
        watchlist: Vec<WatchlistEntry>,
        rationale: RationaleTrail,
        funnel: FunnelMetrics,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config_fingerprint: config.fingerprint(),
            candidates,
            watchlist,
            funnel,
            rationale,
        }
    }
}

/// Serialize a `ScanReport` to pretty JSON.
pub fn export_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

/// Deserialize a `ScanReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScanReport> {
    let report: ScanReport =
        serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

/// Export the candidate list as CSV.
///
/// Columns: ticker, status, sector, cap_tier, adx, mrs, mrs_slope, f_score,
/// pattern, entry, stop, target, period, risk_reward
pub fn export_candidates_csv(candidates: &[Candidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "status",
        "sector",
        "cap_tier",
        "adx",
        "mrs",
        "mrs_slope",
        "f_score",
        "pattern",
        "entry",
        "stop",
        "target",
        "period",
        "risk_reward",
    ])
    .context("failed to write CSV header")?;

    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.4}")).unwrap_or_default();

    for candidate in candidates {
        let (entry, stop, target, period, rr) = match &candidate.trade {
            Some(trade) => (
                format!("{:.2}", trade.entry),
                format!("{:.2}", trade.stop),
                format!("{:.2}", trade.target),
                trade.period.clone(),
                trade.risk_reward.clone(),
            ),
            None => Default::default(),
        };

        wtr.write_record([
            candidate.ticker.as_str(),
            &candidate.status.to_string(),
            candidate.sector.as_str(),
            &candidate
                .cap_tier
                .map(|t| t.to_string())
                .unwrap_or_default(),
            &fmt(candidate.adx),
            &fmt(candidate.mrs),
            &fmt(candidate.mrs_slope),
            &fmt(candidate.f_score),
            candidate.pattern.as_str(),
            &entry,
            &stop,
            &target,
            &period,
            &rr,
        ])
        .context("failed to write CSV row")?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
