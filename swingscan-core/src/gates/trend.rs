//! Gate 3 — technical trend.
//!
//! Two independent tests over each instrument's series:
//!
//! 1. **Trend template** (hard): close above the short/mid/long moving
//!    averages, the averages stacked short > mid > long, and the long
//!    average itself rising over its trailing window. Failing the template
//!    is a rejection, not a watchlist entry.
//! 2. **Strength** (soft): ADX at or above its floor and Mansfield relative
//!    strength non-negative with a rising slope. An instrument that holds
//!    the template but misses strength is a "coiling spring": structurally
//!    sound, momentum not yet confirmed. It is excluded from the execution
//!    gate but kept on the watchlist with the failing metric recorded so
//!    the list can be regenerated later.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Gate3Config;
use crate::domain::{Bar, Instrument, ScanBatch};
use crate::gates::{GateError, GateOutcome, GateResult, GateStage, StageOutput};
use crate::indicators::{trailing_slope, Adx, Atr, Indicator, MansfieldRs, Sma};

/// Consolidation structure detected on a trend-template survivor.
///
/// Drives the holding-period label downstream: a tight-consolidation
/// breakout trades on a shorter horizon than an established trend leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Volatility contraction with price pressed against its recent high.
    VcpBreakout,
    /// Established uptrend without a distinct contraction.
    TrendContinuation,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::VcpBreakout => write!(f, "VCP (tight consolidation)"),
            Pattern::TrendContinuation => write!(f, "Trend continuation"),
        }
    }
}

/// ATR window used for the contraction measurement.
const PATTERN_ATR_PERIOD: usize = 10;
/// Sessions between the two ATR readings being compared.
const PATTERN_CONTRACTION_SESSIONS: usize = 30;
/// Current ATR must be below this fraction of the earlier reading.
const PATTERN_CONTRACTION_RATIO: f64 = 0.7;
/// High-water lookback for the breakout proximity test.
const PATTERN_HIGH_SESSIONS: usize = 60;
/// Close must be within this fraction of the recent high.
const PATTERN_HIGH_PROXIMITY: f64 = 0.95;

/// Classify the consolidation structure of a series.
///
/// Volatility contraction: trailing ATR well below its own level a month
/// ago while price holds near the recent high. Anything else (including a
/// series too short to measure) reads as trend continuation.
pub fn detect_pattern(bars: &[Bar]) -> Pattern {
    let n = bars.len();
    if n < PATTERN_HIGH_SESSIONS.max(PATTERN_ATR_PERIOD + PATTERN_CONTRACTION_SESSIONS + 1) {
        return Pattern::TrendContinuation;
    }

    let atr = Atr::new(PATTERN_ATR_PERIOD).compute(bars);
    let now = atr[n - 1];
    let prior = atr[n - 1 - PATTERN_CONTRACTION_SESSIONS];
    if now.is_nan() || prior.is_nan() || prior <= 0.0 {
        return Pattern::TrendContinuation;
    }

    let high = bars[n - PATTERN_HIGH_SESSIONS..]
        .iter()
        .map(|b| b.high)
        .fold(f64::NAN, f64::max);
    let close = bars[n - 1].close;
    if high.is_nan() || close.is_nan() {
        return Pattern::TrendContinuation;
    }

    if now <= PATTERN_CONTRACTION_RATIO * prior && close >= PATTERN_HIGH_PROXIMITY * high {
        Pattern::VcpBreakout
    } else {
        Pattern::TrendContinuation
    }
}

#[derive(Debug, Clone)]
pub struct TrendGate {
    cfg: Gate3Config,
}

impl TrendGate {
    pub fn new(cfg: Gate3Config) -> Self {
        Self { cfg }
    }

    pub fn evaluate(&self, instrument: &Instrument, benchmark: &[Bar]) -> GateOutcome {
        let series = &instrument.series;
        let n = series.len();
        let required = self.cfg.ma_long + self.cfg.ma_long_trend_sessions;
        if n < required {
            return GateOutcome::HardFail(GateResult::from_error(
                &GateError::InsufficientHistory {
                    required,
                    actual: n,
                },
            ));
        }

        let close = series[n - 1].close;
        let sma_short = Sma::new(self.cfg.ma_short).compute(series)[n - 1];
        let sma_mid = Sma::new(self.cfg.ma_mid).compute(series)[n - 1];
        let long_series = Sma::new(self.cfg.ma_long).compute(series);
        let sma_long = long_series[n - 1];
        let sma_long_prior = long_series[n - 1 - self.cfg.ma_long_trend_sessions];

        let mut metrics = BTreeMap::new();
        metrics.insert("close".to_string(), close);
        metrics.insert(format!("sma_{}", self.cfg.ma_short), sma_short);
        metrics.insert(format!("sma_{}", self.cfg.ma_mid), sma_mid);
        metrics.insert(format!("sma_{}", self.cfg.ma_long), sma_long);

        if close.is_nan()
            || sma_short.is_nan()
            || sma_mid.is_nan()
            || sma_long.is_nan()
            || sma_long_prior.is_nan()
        {
            return GateOutcome::HardFail(GateResult::fail(
                GateError::Compute("moving averages unavailable".to_string()).to_string(),
                metrics,
            ));
        }

        // Template checks are strict inequalities: a flat tape where price
        // sits on its averages is not an uptrend.
        let template_failure = if close <= sma_short {
            Some(format!("close {close:.2} not above SMA{}", self.cfg.ma_short))
        } else if close <= sma_mid {
            Some(format!("close {close:.2} not above SMA{}", self.cfg.ma_mid))
        } else if close <= sma_long {
            Some(format!("close {close:.2} not above SMA{}", self.cfg.ma_long))
        } else if sma_short <= sma_mid {
            Some(format!(
                "SMA{} not above SMA{}",
                self.cfg.ma_short, self.cfg.ma_mid
            ))
        } else if sma_mid <= sma_long {
            Some(format!(
                "SMA{} not above SMA{}",
                self.cfg.ma_mid, self.cfg.ma_long
            ))
        } else if sma_long <= sma_long_prior {
            Some(format!(
                "SMA{} not rising over {} sessions",
                self.cfg.ma_long, self.cfg.ma_long_trend_sessions
            ))
        } else {
            None
        };

        if let Some(condition) = template_failure {
            return GateOutcome::HardFail(GateResult::fail(
                format!("trend template failed: {condition}"),
                metrics,
            ));
        }

        // Strength tests. Failures here are soft: the structure is intact,
        // momentum is not confirmed yet.
        let adx = *Adx::new(self.cfg.adx_period)
            .compute(series)
            .last()
            .unwrap_or(&f64::NAN);
        if adx.is_nan() {
            return GateOutcome::SoftFail(GateResult::fail(
                "ADX unavailable (insufficient directional history)",
                metrics,
            ));
        }
        metrics.insert("adx".to_string(), adx);
        if adx < self.cfg.min_adx {
            return GateOutcome::SoftFail(GateResult::fail(
                format!("ADX {adx:.1} < {:.1}", self.cfg.min_adx),
                metrics,
            ));
        }

        let mrs_series = MansfieldRs::new(self.cfg.rs_lookback_weeks).compute(series, benchmark);
        let mrs = *mrs_series.last().unwrap_or(&f64::NAN);
        if mrs.is_nan() {
            return GateOutcome::SoftFail(GateResult::fail(
                "Mansfield RS unavailable (insufficient benchmark overlap)",
                metrics,
            ));
        }
        metrics.insert("mrs".to_string(), mrs);
        if mrs < 0.0 {
            return GateOutcome::SoftFail(GateResult::fail(
                format!("Mansfield RS negative ({mrs:.2})"),
                metrics,
            ));
        }

        let slope = trailing_slope(&mrs_series, self.cfg.mrs_slope_window);
        if slope.is_nan() {
            return GateOutcome::SoftFail(GateResult::fail(
                "RS slope unavailable (insufficient benchmark overlap)",
                metrics,
            ));
        }
        metrics.insert("mrs_slope".to_string(), slope);
        if slope < self.cfg.min_mansfield_slope {
            return GateOutcome::SoftFail(GateResult::fail(
                format!("RS slope {slope:.4} < {:.4}", self.cfg.min_mansfield_slope),
                metrics,
            ));
        }

        let pattern = detect_pattern(series);
        GateOutcome::Pass(GateResult::pass(
            format!(
                "trend template intact; ADX {adx:.1}, MRS {mrs:.2}, RS slope {slope:.4}; pattern: {pattern}"
            ),
            metrics,
        ))
    }
}

impl GateStage for TrendGate {
    fn name(&self) -> &'static str {
        crate::gates::names::TECHNICALS
    }

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput {
        let outcomes: Vec<(String, GateOutcome)> = survivors
            .par_iter()
            .map(|ticker| {
                let outcome = match batch.get(ticker) {
                    Some(instrument) => self.evaluate(instrument, &batch.benchmark),
                    None => GateOutcome::HardFail(GateResult::fail(
                        "missing field: instrument",
                        BTreeMap::new(),
                    )),
                };
                (ticker.clone(), outcome)
            })
            .collect();

        StageOutput::from_outcomes(outcomes)
    }
}
