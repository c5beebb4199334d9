//! Pipeline state machine — folds the gate stages over the batch.
//!
//! States run strictly linearly: INIT -> G1 -> G2 -> G2B -> G3 -> G4 ->
//! DONE. Each transition requires the previous stage's survivor set to be
//! non-empty; an empty set short-circuits straight to DONE with no BUY
//! candidates while the rationale accumulated so far is still returned (a
//! partial audit trail is still an audit trail). Gates never see
//! instruments rejected upstream, so each survivor set is a subset of the
//! previous one by construction.

use swingscan_core::config::ScanConfig;
use swingscan_core::domain::ScanBatch;
use swingscan_core::gates::{
    ExecutionGate, FundamentalsGate, GateStage, InstitutionalGate, RationaleTrail, SpreadGate,
    StageOutput, TrendGate,
};

use crate::candidates::assemble_candidates;
use crate::report::{FunnelMetrics, ScanReport};
use crate::watchlist::build_watchlist;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Gate1,
    Gate2,
    Gate2b,
    Gate3,
    Gate4,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PipelineStage::Init => "INIT",
            PipelineStage::Gate1 => "G1",
            PipelineStage::Gate2 => "G2",
            PipelineStage::Gate2b => "G2B",
            PipelineStage::Gate3 => "G3",
            PipelineStage::Gate4 => "G4",
            PipelineStage::Done => "DONE",
        };
        write!(f, "{label}")
    }
}

/// Run the full gate pipeline over a batch.
///
/// Never fails: every per-instrument problem becomes a recorded gate
/// result, and an empty batch returns an empty report.
pub fn run_scan(batch: &ScanBatch, config: &ScanConfig) -> ScanReport {
    let mut trail = RationaleTrail::new();
    let mut funnel = FunnelMetrics {
        total_scanned: batch.len(),
        ..FunnelMetrics::default()
    };

    if batch.is_empty() {
        tracing::info!("empty input batch, returning empty report");
        return ScanReport::new(config, Vec::new(), Vec::new(), trail, funnel);
    }

    let stages: Vec<(PipelineStage, Box<dyn GateStage>)> = vec![
        (
            PipelineStage::Gate1,
            Box::new(SpreadGate::new(config.gate1.clone())),
        ),
        (
            PipelineStage::Gate2,
            Box::new(FundamentalsGate::new(config.gate2.clone())),
        ),
        (
            PipelineStage::Gate2b,
            Box::new(InstitutionalGate::new(config.gate2b.clone())),
        ),
        (
            PipelineStage::Gate3,
            Box::new(TrendGate::new(config.gate3.clone())),
        ),
        (
            PipelineStage::Gate4,
            Box::new(ExecutionGate::new(config.gate4.clone())),
        ),
    ];

    let mut stage = PipelineStage::Init;
    let mut survivors = batch.tickers();
    let mut coiling: Vec<String> = Vec::new();
    let mut buy: Vec<String> = Vec::new();

    tracing::info!(instruments = survivors.len(), "starting scan pipeline");

    for (next_stage, gate) in &stages {
        if survivors.is_empty() {
            tracing::info!(%stage, "survivor set empty, short-circuiting to DONE");
            break;
        }
        stage = *next_stage;

        let StageOutput {
            survivors: passed,
            soft_failed,
            results,
        } = gate.run(&survivors, batch);

        tracing::info!(
            gate = gate.name(),
            evaluated = survivors.len(),
            survivors = passed.len(),
            soft_failed = soft_failed.len(),
            "gate complete"
        );

        trail.absorb(gate.name(), results);
        survivors = passed;

        match stage {
            PipelineStage::Gate1 => funnel.passed_g1 = survivors.len(),
            PipelineStage::Gate2 => funnel.passed_g2 = survivors.len(),
            PipelineStage::Gate2b => funnel.passed_g2b = survivors.len(),
            PipelineStage::Gate3 => {
                funnel.trend_confirmed = survivors.len();
                // The coiling springs are a terminal classification, not a
                // survivor set: they keep their watchlist status even when
                // the trend-confirmed set short-circuits Gate 4.
                coiling = soft_failed;
            }
            PipelineStage::Gate4 => buy = survivors.clone(),
            PipelineStage::Init | PipelineStage::Done => {}
        }
    }
    stage = PipelineStage::Done;

    funnel.buy_candidates = buy.len();
    funnel.coiling_springs = coiling.len();

    let candidates = assemble_candidates(batch, &trail, &buy, &coiling, &config.gate4);
    let watchlist = build_watchlist(&coiling, batch, &trail);

    tracing::info!(
        %stage,
        candidates = candidates.len(),
        watchlist = watchlist.len(),
        "scan complete"
    );

    ScanReport::new(config, candidates, watchlist, trail, funnel)
}
