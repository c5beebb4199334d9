//! Gate 2B — institutional confirmation.
//!
//! Minimum institutional ownership and free float, with thresholds that
//! tighten as the cap tier shrinks: institutional presence is a stronger
//! validating signal for names with less coverage and liquidity. An
//! unresolved cap tier is held to the strictest (SMALL) thresholds, and a
//! missing metric fails conservatively.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Gate2bConfig;
use crate::domain::{CapTier, Instrument, ScanBatch};
use crate::gates::{GateError, GateOutcome, GateResult, GateStage, StageOutput};

#[derive(Debug, Clone)]
pub struct InstitutionalGate {
    cfg: Gate2bConfig,
}

impl InstitutionalGate {
    pub fn new(cfg: Gate2bConfig) -> Self {
        Self { cfg }
    }

    fn evaluate(&self, instrument: &Instrument) -> GateOutcome {
        let tier = instrument.cap_tier;
        let thresholds = self.cfg.for_tier(tier);
        let tier_label = tier
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("{} (tier unresolved)", CapTier::Small));

        let mut metrics = BTreeMap::new();
        metrics.insert(
            "min_inst_ownership".to_string(),
            thresholds.min_inst_ownership_pct,
        );
        metrics.insert("min_free_float".to_string(), thresholds.min_free_float_pct);

        let mut failures: Vec<String> = Vec::new();

        match instrument.institutional.inst_ownership_pct {
            Some(ownership) => {
                metrics.insert("inst_ownership".to_string(), ownership);
                if ownership < thresholds.min_inst_ownership_pct {
                    failures.push(format!(
                        "institutional ownership {ownership:.1}% < {:.1}% ({tier_label})",
                        thresholds.min_inst_ownership_pct
                    ));
                }
            }
            None => {
                let err = GateError::MissingField("inst_ownership_pct");
                failures.push(err.to_string());
            }
        }

        match instrument.institutional.free_float_pct {
            Some(float) => {
                metrics.insert("free_float".to_string(), float);
                if float < thresholds.min_free_float_pct {
                    failures.push(format!(
                        "free float {float:.1}% < {:.1}% ({tier_label})",
                        thresholds.min_free_float_pct
                    ));
                }
            }
            None => {
                let err = GateError::MissingField("free_float_pct");
                failures.push(err.to_string());
            }
        }

        if failures.is_empty() {
            let reason = format!(
                "institutional ownership {:.1}% and free float {:.1}% meet {tier_label} minimums",
                metrics["inst_ownership"], metrics["free_float"],
            );
            GateOutcome::Pass(GateResult::pass(reason, metrics))
        } else {
            GateOutcome::HardFail(GateResult::fail(failures.join("; "), metrics))
        }
    }
}

impl GateStage for InstitutionalGate {
    fn name(&self) -> &'static str {
        crate::gates::names::INSTITUTIONAL
    }

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput {
        let outcomes: Vec<(String, GateOutcome)> = survivors
            .par_iter()
            .map(|ticker| {
                let outcome = match batch.get(ticker) {
                    Some(instrument) => self.evaluate(instrument),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstitutionalSnapshot;

    fn instrument(tier: Option<CapTier>, ownership: Option<f64>, float: Option<f64>) -> Instrument {
        let mut inst = Instrument::new("TEST", vec![]);
        inst.cap_tier = tier;
        inst.institutional = InstitutionalSnapshot {
            inst_ownership_pct: ownership,
            free_float_pct: float,
        };
        inst
    }

    fn gate() -> InstitutionalGate {
        InstitutionalGate::new(Gate2bConfig::default())
    }

    #[test]
    fn large_cap_passes_its_tier_minimums() {
        // Below SMALL minimums but above LARGE ones.
        let inst = instrument(Some(CapTier::Large), Some(6.0), Some(16.0));
        let outcome = gate().evaluate(&inst);
        assert!(outcome.is_pass());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let defaults = Gate2bConfig::default();
        let inst = instrument(
            Some(CapTier::Mid),
            Some(defaults.mid.min_inst_ownership_pct),
            Some(defaults.mid.min_free_float_pct),
        );
        assert!(gate().evaluate(&inst).is_pass());
    }

    #[test]
    fn unresolved_tier_defaults_to_small() {
        // 6% ownership clears LARGE but not SMALL; with no tier resolved the
        // instrument is held to SMALL and fails.
        let inst = instrument(None, Some(6.0), Some(40.0));
        let outcome = gate().evaluate(&inst);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("tier unresolved"));
    }

    #[test]
    fn missing_metric_fails_conservatively() {
        let inst = instrument(Some(CapTier::Large), None, Some(40.0));
        let outcome = gate().evaluate(&inst);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("missing field"));
    }

    #[test]
    fn both_metrics_must_clear() {
        let inst = instrument(Some(CapTier::Small), Some(30.0), Some(10.0));
        let outcome = gate().evaluate(&inst);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("free float"));
    }
}
