//! Gate 1 — spread quality, sector-adjusted.
//!
//! Two passes with a fork/join barrier between them:
//!
//! 1. compute every instrument's trailing-window mean of (High-Low)/Close,
//!    then reduce per-sector mean and standard deviation into an immutable
//!    lookup table;
//! 2. z-test each instrument against its sector peers, plus an absolute
//!    spread cap that applies to everyone.
//!
//! Sectors with fewer than two members or near-zero dispersion cannot
//! support a z-score; those instruments fall back to the absolute cap only.
//! Unsectored instruments ("Unknown") form their own degenerate group and
//! are likewise exempt from the z-test, which the reason string records
//! explicitly.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Gate1Config;
use crate::domain::{Instrument, ScanBatch};
use crate::gates::{GateError, GateOutcome, GateResult, GateStage, StageOutput};

/// Sector dispersion below this is treated as degenerate.
const STD_EPSILON: f64 = 1e-9;

/// Per-sector spread aggregate, computed once per scan.
#[derive(Debug, Clone, Copy)]
pub struct SectorStats {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl SectorStats {
    /// Sample mean and standard deviation of a sector's spreads.
    fn from_spreads(spreads: &[f64]) -> Self {
        let count = spreads.len();
        let mean = spreads.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            0.0
        } else {
            let ss: f64 = spreads.iter().map(|s| (s - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };
        Self { mean, std, count }
    }

    fn supports_z_test(&self) -> bool {
        self.count >= 2 && self.std > STD_EPSILON
    }
}

#[derive(Debug, Clone)]
pub struct SpreadGate {
    cfg: Gate1Config,
}

impl SpreadGate {
    pub fn new(cfg: Gate1Config) -> Self {
        Self { cfg }
    }

    /// Trailing-window mean of the per-session range spread.
    fn rolling_spread(&self, instrument: &Instrument) -> Result<f64, GateError> {
        let window = self.cfg.rolling_window;
        let n = instrument.series.len();
        if n < window {
            return Err(GateError::InsufficientHistory {
                required: window,
                actual: n,
            });
        }

        let mut sum = 0.0;
        for bar in &instrument.series[n - window..] {
            let spread = bar.range_spread();
            if spread.is_nan() {
                return Err(GateError::Compute(format!(
                    "invalid bar on {} while computing spread",
                    bar.date
                )));
            }
            sum += spread;
        }
        Ok(sum / window as f64)
    }

    /// Pass-2 decision for one instrument, given its sector aggregate.
    ///
    /// `stats` is `None` for unsectored instruments and for sectors that
    /// cannot support a z-test; `degenerate_note` explains which.
    fn evaluate(
        &self,
        spread: f64,
        stats: Option<&SectorStats>,
        degenerate_note: &str,
    ) -> GateOutcome {
        let mut metrics = BTreeMap::new();
        metrics.insert("spread".to_string(), spread);

        let z_verdict = match stats {
            Some(stats) => {
                let z = (spread - stats.mean) / stats.std;
                metrics.insert("spread_z".to_string(), z);
                metrics.insert("sector_mean".to_string(), stats.mean);
                metrics.insert("sector_std".to_string(), stats.std);
                if z > self.cfg.max_spread_z {
                    Some(format!(
                        "spread z-score {z:.2} > {:.2} (sector-anomalous)",
                        self.cfg.max_spread_z
                    ))
                } else {
                    None
                }
            }
            None => None,
        };

        // The absolute cap applies to everyone; an instrument at the cap is
        // already untradeable however normal its sector looks.
        let cap_verdict = if spread >= self.cfg.max_abs_spread {
            let prefix = if stats.is_none() && !degenerate_note.is_empty() {
                format!("{degenerate_note}; ")
            } else {
                String::new()
            };
            Some(format!(
                "{prefix}spread {spread:.4} breaches absolute cap {:.2}",
                self.cfg.max_abs_spread
            ))
        } else {
            None
        };

        match (cap_verdict, z_verdict) {
            (None, None) => {
                let reason = match stats {
                    Some(_) => format!(
                        "spread {spread:.4} within sector norm (z {:.2} <= {:.2}) and below cap {:.2}",
                        metrics["spread_z"], self.cfg.max_spread_z, self.cfg.max_abs_spread,
                    ),
                    None => format!(
                        "{degenerate_note}; spread {spread:.4} below absolute cap {:.2}",
                        self.cfg.max_abs_spread
                    ),
                };
                GateOutcome::Pass(GateResult::pass(reason, metrics))
            }
            (Some(cap_reason), _) => GateOutcome::HardFail(GateResult::fail(cap_reason, metrics)),
            (None, Some(z_reason)) => GateOutcome::HardFail(GateResult::fail(z_reason, metrics)),
        }
    }
}

impl GateStage for SpreadGate {
    fn name(&self) -> &'static str {
        crate::gates::names::SPREAD
    }

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput {
        // Pass 1: per-instrument spreads (parallel), then the sector
        // reduction. The aggregate table is immutable before pass 2 starts.
        let spreads: Vec<(String, Result<f64, GateError>)> = survivors
            .par_iter()
            .map(|ticker| {
                let result = match batch.get(ticker) {
                    Some(instrument) => self.rolling_spread(instrument),
                    None => Err(GateError::MissingField("instrument")),
                };
                (ticker.clone(), result)
            })
            .collect();

        let mut sector_spreads: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (ticker, spread) in &spreads {
            if let (Some(instrument), Ok(spread)) = (batch.get(ticker), spread) {
                if !instrument.is_unsectored() {
                    sector_spreads
                        .entry(instrument.sector.clone())
                        .or_default()
                        .push(*spread);
                }
            }
        }
        let sector_stats: BTreeMap<String, SectorStats> = sector_spreads
            .iter()
            .map(|(sector, spreads)| (sector.clone(), SectorStats::from_spreads(spreads)))
            .collect();

        // Pass 2: z-test against the frozen aggregates (parallel).
        let outcomes: Vec<(String, GateOutcome)> = spreads
            .into_par_iter()
            .map(|(ticker, spread)| {
                let outcome = match spread {
                    Err(err) => {
                        tracing::debug!(ticker = %ticker, error = %err, "spread computation failed");
                        GateOutcome::HardFail(GateResult::from_error(&err))
                    }
                    Ok(spread) => match batch.get(&ticker) {
                        Some(instrument) if !instrument.is_unsectored() => {
                            let sector = &instrument.sector;
                            match sector_stats.get(sector) {
                                Some(stats) if stats.supports_z_test() => {
                                    self.evaluate(spread, Some(stats), "")
                                }
                                Some(stats) => {
                                    let err = GateError::DegenerateGroup {
                                        sector: sector.clone(),
                                        count: stats.count,
                                    };
                                    self.evaluate(spread, None, &format!("{err}, z-test skipped"))
                                }
                                None => self.evaluate(spread, None, "sector had no usable peers"),
                            }
                        }
                        _ => self.evaluate(
                            spread,
                            None,
                            "sector unresolved; degenerate group exempt from z-test",
                        ),
                    },
                };
                (ticker, outcome)
            })
            .collect();

        StageOutput::from_outcomes(outcomes)
    }
}
