//! Gate 4 — execution timing.
//!
//! Applies only to trend-confirmed survivors. Two admission checks:
//!
//! - **Volume confirmation**: the session's accumulated volume must meet a
//!   prorated expectation — trailing average daily volume scaled by the
//!   fraction of the trading day elapsed and a dampening factor.
//! - **Risk/reward**: an ATR-sized stop below the close, a target at twice
//!   the risk above it, and a reward:risk floor. With the target built as
//!   exactly 2x risk the ratio check is satisfied by construction whenever
//!   stop < entry; the effective gating is a non-degenerate ATR.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Gate4Config;
use crate::domain::{Instrument, ScanBatch};
use crate::gates::{GateError, GateOutcome, GateResult, GateStage, StageOutput};
use crate::indicators::{Atr, Indicator};

#[derive(Debug, Clone)]
pub struct ExecutionGate {
    cfg: Gate4Config,
}

impl ExecutionGate {
    pub fn new(cfg: Gate4Config) -> Self {
        Self { cfg }
    }

    pub fn evaluate(&self, instrument: &Instrument, session_elapsed_min: Option<f64>) -> GateOutcome {
        let series = &instrument.series;
        let n = series.len();
        let required = (self.cfg.vol_avg_days + 1).max(self.cfg.atr_period + 1);
        if n < required {
            return GateOutcome::HardFail(GateResult::from_error(
                &GateError::InsufficientHistory {
                    required,
                    actual: n,
                },
            ));
        }

        let mut metrics = BTreeMap::new();
        let mut failures: Vec<String> = Vec::new();

        // Volume confirmation against the prorated baseline. The baseline
        // excludes the current (possibly partial) session.
        let session_volume = series[n - 1].volume as f64;
        let baseline = &series[n - 1 - self.cfg.vol_avg_days..n - 1];
        let avg_volume =
            baseline.iter().map(|b| b.volume as f64).sum::<f64>() / self.cfg.vol_avg_days as f64;
        let elapsed = session_elapsed_min
            .unwrap_or(self.cfg.market_open_minutes)
            .clamp(1.0, self.cfg.market_open_minutes);
        let expected =
            avg_volume * (elapsed / self.cfg.market_open_minutes) * self.cfg.vol_prorate_factor;

        metrics.insert("session_volume".to_string(), session_volume);
        metrics.insert("avg_volume".to_string(), avg_volume);
        metrics.insert("expected_volume".to_string(), expected);

        if session_volume < expected {
            failures.push(format!(
                "volume {session_volume:.0} below prorated expectation {expected:.0}"
            ));
        }

        // Risk/reward from an ATR-sized stop.
        let entry = series[n - 1].close;
        let atr = *Atr::new(self.cfg.atr_period)
            .compute(series)
            .last()
            .unwrap_or(&f64::NAN);

        if !atr.is_finite() || atr <= 0.0 {
            failures.push("ATR degenerate, no usable stop distance".to_string());
        } else {
            metrics.insert("atr".to_string(), atr);
            let stop = entry - self.cfg.atr_stop_multiplier * atr;
            if stop >= entry {
                failures.push(format!("stop {stop:.2} at or above entry {entry:.2}"));
            } else {
                let risk = entry - stop;
                let target = entry + 2.0 * risk;
                let rr = (target - entry) / risk;
                metrics.insert("entry".to_string(), entry);
                metrics.insert("stop".to_string(), stop);
                metrics.insert("target".to_string(), target);
                metrics.insert("risk_reward".to_string(), rr);
                if rr < self.cfg.min_rr_ratio {
                    failures.push(format!(
                        "reward:risk {rr:.2} < {:.2}",
                        self.cfg.min_rr_ratio
                    ));
                }
            }
        }

        if failures.is_empty() {
            let reason = format!(
                "volume {session_volume:.0} >= prorated {expected:.0}; stop {:.2}, target {:.2}, R:R {:.1}",
                metrics["stop"], metrics["target"], metrics["risk_reward"],
            );
            GateOutcome::Pass(GateResult::pass(reason, metrics))
        } else {
            GateOutcome::HardFail(GateResult::fail(failures.join("; "), metrics))
        }
    }
}

impl GateStage for ExecutionGate {
    fn name(&self) -> &'static str {
        crate::gates::names::EXECUTION
    }

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput {
        let outcomes: Vec<(String, GateOutcome)> = survivors
            .par_iter()
            .map(|ticker| {
                let outcome = match batch.get(ticker) {
                    Some(instrument) => self.evaluate(instrument, batch.session_elapsed_min),
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
