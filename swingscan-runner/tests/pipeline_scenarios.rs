mod common;

use common::*;

use swingscan_core::config::ScanConfig;
use swingscan_core::domain::{FundamentalsSnapshot, Instrument, ScanBatch};
use swingscan_core::gates::names;
use swingscan_runner::{export_json, run_scan, CandidateStatus};

#[test]
fn empty_batch_returns_empty_candidates_and_trail() {
    let report = run_scan(&ScanBatch::new(), &ScanConfig::default());
    assert!(report.candidates.is_empty());
    assert!(report.rationale.is_empty());
    assert!(report.watchlist.is_empty());
    assert_eq!(report.funnel.total_scanned, 0);
}

#[test]
fn trending_universe_produces_buy_candidates() {
    let batch = batch_with(vec![
        trending_instrument("ALPHA"),
        trending_instrument("BETA"),
        trending_instrument("GAMMA"),
    ]);
    let report = run_scan(&batch, &ScanConfig::default());

    assert_eq!(report.candidates.len(), 3);
    for candidate in &report.candidates {
        assert_eq!(candidate.status, CandidateStatus::Buy);
        let trade = candidate.trade.as_ref().expect("BUY candidate has a plan");
        // Target construction: entry + 2 * (entry - stop), within rounding.
        let implied = trade.entry + 2.0 * (trade.entry - trade.stop);
        assert!((trade.target - implied).abs() < 0.05, "target {} vs implied {implied}", trade.target);
        assert!(trade.stop < trade.entry);
    }

    assert_eq!(report.funnel.total_scanned, 3);
    assert_eq!(report.funnel.passed_g1, 3);
    assert_eq!(report.funnel.passed_g2b, 3);
    assert_eq!(report.funnel.trend_confirmed, 3);
    assert_eq!(report.funnel.buy_candidates, 3);
    assert_eq!(report.funnel.coiling_springs, 0);

    // Every gate recorded a passing rationale entry.
    for ticker in ["ALPHA", "BETA", "GAMMA"] {
        for gate in [
            names::SPREAD,
            names::FUNDAMENTALS,
            names::INSTITUTIONAL,
            names::TECHNICALS,
            names::EXECUTION,
        ] {
            let result = report
                .rationale
                .get(ticker, gate)
                .unwrap_or_else(|| panic!("{ticker} missing {gate} entry"));
            assert!(result.passed, "{ticker}/{gate}: {}", result.reason);
        }
    }
}

#[test]
fn rejected_instruments_have_no_downstream_entries() {
    let mut weak = trending_instrument("WEAK");
    weak.fundamentals = FundamentalsSnapshot::default();

    let short = {
        let mut inst = Instrument::new("SHORT", bars_from_closes(&[100.0; 5], 1000));
        inst.sector = "Auto".to_string();
        inst
    };

    let batch = batch_with(vec![
        trending_instrument("GOOD"),
        weak,
        short,
        flat_instrument("FLAT"),
    ]);
    let report = run_scan(&batch, &ScanConfig::default());

    // SHORT fell at Gate 1: exactly one trail entry.
    let short_gates = report.rationale.gates_for("SHORT").unwrap();
    assert_eq!(short_gates.len(), 1);
    assert!(short_gates[names::SPREAD]
        .reason
        .contains("insufficient history"));

    // WEAK fell at Gate 2: no institutional or technical entries.
    let weak_gates = report.rationale.gates_for("WEAK").unwrap();
    assert_eq!(weak_gates.len(), 2);
    assert!(weak_gates.contains_key(names::SPREAD));
    assert!(weak_gates.contains_key(names::FUNDAMENTALS));

    // FLAT held through Gate 2B, hard-failed the trend template: no Gate 4
    // entry and no watchlist membership.
    let flat_gates = report.rationale.gates_for("FLAT").unwrap();
    assert_eq!(flat_gates.len(), 4);
    assert!(!flat_gates.contains_key(names::EXECUTION));
    assert!(flat_gates[names::TECHNICALS]
        .reason
        .contains("trend template failed"));
    assert!(report.watchlist.iter().all(|w| w.ticker != "FLAT"));
    assert!(report.candidates.iter().all(|c| c.ticker != "FLAT"));

    // Only GOOD survived to candidacy.
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].ticker, "GOOD");
}

#[test]
fn weak_momentum_is_watchlisted_not_rejected() {
    // Raise the ADX floor above the saturation point so the trend template
    // holds but strength cannot confirm.
    let mut config = ScanConfig::default();
    config.gate3.min_adx = 101.0;

    let batch = batch_with(vec![trending_instrument("COIL")]);
    let report = run_scan(&batch, &config);

    assert_eq!(report.funnel.trend_confirmed, 0);
    assert_eq!(report.funnel.coiling_springs, 1);
    assert_eq!(report.funnel.buy_candidates, 0);

    assert_eq!(report.candidates.len(), 1);
    let candidate = &report.candidates[0];
    assert_eq!(candidate.status, CandidateStatus::CoilingSpring);
    assert!(candidate.reason.contains("ADX"));
    assert!(candidate.adx.is_some(), "failing ADX value must be recorded");

    assert_eq!(report.watchlist.len(), 1);
    let entry = &report.watchlist[0];
    assert_eq!(entry.ticker, "COIL");
    assert!(entry.reason.contains("ADX"));
    assert_eq!(entry.f_score, Some(9.0));
    assert_eq!(entry.inst_ownership, Some(30.0));

    // Soft-failed at Gate 3: the execution gate never saw it.
    let gates = report.rationale.gates_for("COIL").unwrap();
    assert!(!gates.contains_key(names::EXECUTION));
}

#[test]
fn candidates_are_a_subset_of_gate2b_survivors() {
    let mut weak = trending_instrument("WEAK");
    weak.institutional.inst_ownership_pct = Some(0.5);

    let batch = batch_with(vec![
        trending_instrument("GOOD"),
        weak,
        flat_instrument("FLAT"),
    ]);
    let report = run_scan(&batch, &ScanConfig::default());

    for candidate in &report.candidates {
        let g2b = report
            .rationale
            .get(&candidate.ticker, names::INSTITUTIONAL)
            .expect("candidate must have cleared Gate 2B");
        assert!(g2b.passed);
    }
    assert!(report.candidates.iter().all(|c| c.ticker != "WEAK"));
}

#[test]
fn all_rejected_at_gate1_short_circuits_with_partial_trail() {
    let mut batch = ScanBatch::new();
    for ticker in ["A", "B"] {
        batch.insert(Instrument::new(ticker, bars_from_closes(&[100.0; 3], 1000)));
    }
    let report = run_scan(&batch, &ScanConfig::default());

    assert!(report.candidates.is_empty());
    assert_eq!(report.funnel.passed_g1, 0);
    assert_eq!(report.funnel.passed_g2, 0);
    // The partial trail still covers everything Gate 1 evaluated.
    assert_eq!(report.rationale.len(), 2);
    assert_eq!(report.rationale.gates_for("A").unwrap().len(), 1);
}

#[test]
fn scan_is_deterministic_across_runs() {
    let batch = batch_with(vec![
        trending_instrument("ALPHA"),
        trending_instrument("BETA"),
        flat_instrument("FLAT"),
    ]);
    let config = ScanConfig::default();

    let first = export_json(&run_scan(&batch, &config)).unwrap();
    let second = export_json(&run_scan(&batch, &config)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn report_fingerprint_tracks_config() {
    let batch = batch_with(vec![trending_instrument("ALPHA")]);
    let config = ScanConfig::default();
    let report = run_scan(&batch, &config);
    assert_eq!(report.config_fingerprint, config.fingerprint());
}
