//! Candidate assembly — trade metadata for everything that cleared Gate 2B
//! and finished as BUY or COILING_SPRING.

use serde::{Deserialize, Serialize};

use swingscan_core::config::Gate4Config;
use swingscan_core::domain::{CapTier, Instrument, ScanBatch};
use swingscan_core::gates::{names, RationaleTrail};
use swingscan_core::gates::trend::{detect_pattern, Pattern};
use swingscan_core::indicators::{Atr, Indicator};

/// Final classification of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    /// Cleared every gate.
    #[serde(rename = "BUY")]
    Buy,
    /// Cleared Gate 2B, held the trend template, but missed the strength
    /// tests — watchlisted, not rejected.
    #[serde(rename = "COILING_SPRING")]
    CoilingSpring,
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateStatus::Buy => write!(f, "BUY"),
            CandidateStatus::CoilingSpring => write!(f, "COILING_SPRING"),
        }
    }
}

/// Entry/stop/target and holding-period metadata for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    /// Holding-period label derived from the detected pattern.
    pub period: String,
    /// Reward:risk label; the target construction fixes this at 1:2.
    pub risk_reward: String,
}

/// One actionable scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub status: CandidateStatus,
    pub sector: String,
    pub cap_tier: Option<CapTier>,
    pub adx: Option<f64>,
    pub mrs: Option<f64>,
    pub mrs_slope: Option<f64>,
    pub f_score: Option<f64>,
    pub pattern: String,
    pub reason: String,
    /// None when the series cannot support an ATR stop.
    pub trade: Option<TradePlan>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Holding-period label for a detected pattern: tight-consolidation
/// breakouts trade on a swing horizon, everything else positional.
fn holding_period(pattern: Pattern) -> &'static str {
    match pattern {
        Pattern::VcpBreakout => "Swing (2-6 Weeks)",
        Pattern::TrendContinuation => "Positional (1-3 Months)",
    }
}

/// Build the ATR-based trade plan for one instrument.
///
/// Returns None when the ATR is degenerate (no usable stop distance) or
/// the series is too short to compute it.
pub fn plan_trade(instrument: &Instrument, cfg: &Gate4Config) -> Option<TradePlan> {
    let entry = instrument.last_close()?;
    let atr = *Atr::new(cfg.atr_period)
        .compute(&instrument.series)
        .last()?;
    if !atr.is_finite() || atr <= 0.0 {
        return None;
    }

    let stop = entry - cfg.atr_stop_multiplier * atr;
    if stop >= entry {
        return None;
    }
    let risk = entry - stop;
    let target = entry + 2.0 * risk;
    let pattern = detect_pattern(&instrument.series);

    Some(TradePlan {
        entry: round2(entry),
        stop: round2(stop),
        target: round2(target),
        period: holding_period(pattern).to_string(),
        risk_reward: "1:2".to_string(),
    })
}

fn build_candidate(
    instrument: &Instrument,
    status: CandidateStatus,
    trail: &RationaleTrail,
    cfg: &Gate4Config,
) -> Candidate {
    let g3 = trail.get(&instrument.ticker, names::TECHNICALS);
    let g2 = trail.get(&instrument.ticker, names::FUNDAMENTALS);
    let metric = |name: &str| g3.and_then(|r| r.metrics.get(name).copied());

    Candidate {
        ticker: instrument.ticker.clone(),
        status,
        sector: instrument.sector.clone(),
        cap_tier: instrument.cap_tier,
        adx: metric("adx"),
        mrs: metric("mrs"),
        mrs_slope: metric("mrs_slope"),
        f_score: g2.and_then(|r| r.metrics.get("f_score").copied()),
        pattern: detect_pattern(&instrument.series).to_string(),
        reason: g3
            .map(|r| r.reason.clone())
            .unwrap_or_else(|| "Consolidating".to_string()),
        trade: plan_trade(instrument, cfg),
    }
}

/// Assemble the ordered candidate list: BUY first, then COILING_SPRING,
/// alphabetical within status.
pub fn assemble_candidates(
    batch: &ScanBatch,
    trail: &RationaleTrail,
    buy: &[String],
    coiling: &[String],
    cfg: &Gate4Config,
) -> Vec<Candidate> {
    let mut buy: Vec<&String> = buy.iter().collect();
    let mut coiling: Vec<&String> = coiling.iter().collect();
    buy.sort();
    coiling.sort();

    buy.into_iter()
        .map(|t| (t, CandidateStatus::Buy))
        .chain(coiling.into_iter().map(|t| (t, CandidateStatus::CoilingSpring)))
        .filter_map(|(ticker, status)| {
            batch
                .get(ticker)
                .map(|instrument| build_candidate(instrument, status, trail, cfg))
        })
        .collect()
}
