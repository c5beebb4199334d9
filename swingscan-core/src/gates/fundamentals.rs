//! Gate 2 — fundamental quality.
//!
//! A nine-signal accounting-health score (Piotroski-style), a cash-backing
//! ratio, and a governance check on promoter pledging. Every signal that
//! cannot be computed from the disclosed figures counts as failed, never
//! skipped: incomplete disclosure biases toward rejection, not admission.
//!
//! Signals:
//! - profitability: ROA > 0, CFO > 0, ROA improving YoY, CFO > net income
//! - leverage/liquidity: long-term-debt ratio declining, current ratio
//!   improving, no net new share issuance
//! - efficiency: gross margin improving, asset turnover improving

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Gate2Config;
use crate::domain::{FundamentalsSnapshot, ScanBatch, YearFigures};
use crate::gates::{GateOutcome, GateResult, GateStage, StageOutput};

#[derive(Debug, Clone)]
pub struct FundamentalsGate {
    cfg: Gate2Config,
}

/// `num / den`, or `None` when either side is missing or the denominator
/// is zero. Missing propagates into a failed signal at the call site.
fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// True only when both sides are present and the comparison holds.
fn both(lhs: Option<f64>, rhs: Option<f64>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    matches!((lhs, rhs), (Some(a), Some(b)) if cmp(a, b))
}

/// Count of accounting-quality signals satisfied (0-9).
pub fn f_score(f: &FundamentalsSnapshot) -> u32 {
    let cur = &f.current;
    let prior = &f.prior;

    let roa = |y: &YearFigures| ratio(y.net_income, y.total_assets);
    let ltd_ratio = |y: &YearFigures| ratio(y.long_term_debt, y.total_assets);
    let current_ratio = |y: &YearFigures| ratio(y.current_assets, y.current_liabilities);
    let gross_margin = |y: &YearFigures| ratio(y.gross_profit, y.revenue);
    let asset_turnover = |y: &YearFigures| ratio(y.revenue, y.total_assets);

    let signals = [
        roa(cur).map(|r| r > 0.0).unwrap_or(false),
        cur.cfo.map(|c| c > 0.0).unwrap_or(false),
        both(roa(cur), roa(prior), |a, b| a > b),
        both(cur.cfo, cur.net_income, |a, b| a > b),
        both(ltd_ratio(cur), ltd_ratio(prior), |a, b| a < b),
        both(current_ratio(cur), current_ratio(prior), |a, b| a > b),
        both(cur.shares_outstanding, prior.shares_outstanding, |a, b| a <= b),
        both(gross_margin(cur), gross_margin(prior), |a, b| a > b),
        both(asset_turnover(cur), asset_turnover(prior), |a, b| a > b),
    ];

    signals.iter().filter(|&&s| s).count() as u32
}

impl FundamentalsGate {
    pub fn new(cfg: Gate2Config) -> Self {
        Self { cfg }
    }

    fn evaluate(&self, fundamentals: &FundamentalsSnapshot) -> GateOutcome {
        let score = f_score(fundamentals);

        let mut metrics = BTreeMap::new();
        metrics.insert("f_score".to_string(), score as f64);

        let mut failures: Vec<String> = Vec::new();

        if score < self.cfg.min_f_score {
            failures.push(format!(
                "F-Score {score}/9 < {}",
                self.cfg.min_f_score
            ));
        }

        // Earnings not backed by cash are not earnings.
        let cfo_pat = match (fundamentals.current.cfo, fundamentals.current.net_income) {
            (Some(_), Some(pat)) if pat <= 0.0 => {
                failures.push("PAT non-positive, CFO/PAT undefined".to_string());
                None
            }
            (Some(cfo), Some(pat)) => {
                let r = cfo / pat;
                metrics.insert("cfo_pat".to_string(), r);
                if r < self.cfg.min_cfo_pat {
                    failures.push(format!("CFO/PAT {r:.2} < {:.2}", self.cfg.min_cfo_pat));
                }
                Some(r)
            }
            _ => {
                failures.push("CFO or PAT undisclosed".to_string());
                None
            }
        };

        match fundamentals.promoter_pledge_pct {
            Some(pledge) => {
                metrics.insert("promoter_pledge".to_string(), pledge);
                if pledge > self.cfg.max_promoter_pledge {
                    failures.push(format!(
                        "promoter pledge {pledge:.1}% > {:.1}%",
                        self.cfg.max_promoter_pledge
                    ));
                }
            }
            None => failures.push("promoter pledge undisclosed".to_string()),
        }

        if failures.is_empty() {
            let reason = format!(
                "F-Score {score}/9, CFO/PAT {:.2}, pledge {:.1}% — quality checks met",
                cfo_pat.unwrap_or(f64::NAN),
                fundamentals.promoter_pledge_pct.unwrap_or(f64::NAN),
            );
            GateOutcome::Pass(GateResult::pass(reason, metrics))
        } else {
            GateOutcome::HardFail(GateResult::fail(failures.join("; "), metrics))
        }
    }
}

impl GateStage for FundamentalsGate {
    fn name(&self) -> &'static str {
        crate::gates::names::FUNDAMENTALS
    }

    fn run(&self, survivors: &[String], batch: &ScanBatch) -> StageOutput {
        let outcomes: Vec<(String, GateOutcome)> = survivors
            .par_iter()
            .map(|ticker| {
                let outcome = match batch.get(ticker) {
                    Some(instrument) => self.evaluate(&instrument.fundamentals),
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

    /// Fundamentals satisfying all nine signals comfortably.
    fn strong() -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            current: YearFigures {
                net_income: Some(100.0),
                cfo: Some(120.0),
                total_assets: Some(1000.0),
                current_assets: Some(300.0),
                current_liabilities: Some(150.0),
                long_term_debt: Some(200.0),
                shares_outstanding: Some(100.0),
                gross_profit: Some(400.0),
                revenue: Some(1000.0),
            },
            prior: YearFigures {
                net_income: Some(80.0),
                cfo: Some(90.0),
                total_assets: Some(950.0),
                current_assets: Some(280.0),
                current_liabilities: Some(160.0),
                long_term_debt: Some(250.0),
                shares_outstanding: Some(100.0),
                gross_profit: Some(350.0),
                revenue: Some(900.0),
            },
            promoter_pledge_pct: Some(0.5),
        }
    }

    /// Exactly four signals true (ROA>0, CFO>0, margin and turnover
    /// improving), CFO/PAT exactly 0.5, pledge exactly 5.0.
    fn all_boundaries() -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            current: YearFigures {
                net_income: Some(100.0),
                cfo: Some(50.0),
                total_assets: Some(1000.0),
                current_assets: Some(200.0),
                current_liabilities: Some(100.0),
                long_term_debt: Some(300.0),
                shares_outstanding: Some(110.0),
                gross_profit: Some(400.0),
                revenue: Some(1000.0),
            },
            prior: YearFigures {
                net_income: Some(120.0),
                cfo: Some(90.0),
                total_assets: Some(1000.0),
                current_assets: Some(250.0),
                current_liabilities: Some(100.0),
                long_term_debt: Some(250.0),
                shares_outstanding: Some(100.0),
                gross_profit: Some(300.0),
                revenue: Some(900.0),
            },
            promoter_pledge_pct: Some(5.0),
        }
    }

    fn gate() -> FundamentalsGate {
        FundamentalsGate::new(Gate2Config::default())
    }

    #[test]
    fn strong_fundamentals_score_nine() {
        assert_eq!(f_score(&strong()), 9);
    }

    #[test]
    fn strong_fundamentals_pass() {
        let outcome = gate().evaluate(&strong());
        assert!(outcome.is_pass());
        assert_eq!(outcome.result().metrics["f_score"], 9.0);
    }

    #[test]
    fn all_inclusive_boundaries_pass() {
        let f = all_boundaries();
        assert_eq!(f_score(&f), 4);
        let outcome = gate().evaluate(&f);
        assert!(outcome.is_pass(), "boundary values must pass: {}", outcome.result().reason);
        assert_eq!(outcome.result().metrics["cfo_pat"], 0.5);
        assert_eq!(outcome.result().metrics["promoter_pledge"], 5.0);
    }

    #[test]
    fn score_one_below_threshold_fails() {
        let mut f = all_boundaries();
        // Remove the turnover improvement: score drops from 4 to 3.
        f.prior.revenue = Some(1100.0);
        assert_eq!(f_score(&f), 3);
        let outcome = gate().evaluate(&f);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("F-Score 3/9"));
    }

    #[test]
    fn missing_field_fails_only_that_signal() {
        let mut f = strong();
        f.current.gross_profit = None;
        // Gross margin signal lost, everything else intact.
        assert_eq!(f_score(&f), 8);
    }

    #[test]
    fn empty_disclosure_scores_zero() {
        let f = FundamentalsSnapshot::default();
        assert_eq!(f_score(&f), 0);
        let outcome = gate().evaluate(&f);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("undisclosed"));
    }

    #[test]
    fn negative_pat_fails_cash_backing() {
        let mut f = strong();
        f.current.net_income = Some(-10.0);
        let outcome = gate().evaluate(&f);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("PAT non-positive"));
    }

    #[test]
    fn heavy_pledge_is_rejected() {
        let mut f = strong();
        f.promoter_pledge_pct = Some(35.0);
        let outcome = gate().evaluate(&f);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("promoter pledge"));
    }

    #[test]
    fn undisclosed_pledge_is_conservatively_rejected() {
        let mut f = strong();
        f.promoter_pledge_pct = None;
        let outcome = gate().evaluate(&f);
        assert!(!outcome.is_pass());
        assert!(outcome.result().reason.contains("pledge undisclosed"));
    }
}
