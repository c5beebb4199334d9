//! SwingScan Core — domain types, indicators, and the five gate stages.
//!
//! This crate contains the computational heart of the daily screening
//! pipeline:
//! - Domain types (bars, instruments, fundamentals, the scan batch)
//! - Vectorized indicators (SMA, ATR, ADX, Mansfield RS)
//! - Gate stages with three-way outcomes and the append-only rationale trail
//! - The threshold configuration layer with content fingerprinting
//!
//! Orchestration of the stages into a pipeline lives in `swingscan-runner`.

pub mod config;
pub mod domain;
pub mod gates;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything crossing the rayon fork/join boundary
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::ScanBatch>();
        require_sync::<domain::ScanBatch>();
        require_send::<domain::FundamentalsSnapshot>();
        require_sync::<domain::FundamentalsSnapshot>();
        require_send::<domain::InstitutionalSnapshot>();
        require_sync::<domain::InstitutionalSnapshot>();
        require_send::<domain::CapTier>();
        require_sync::<domain::CapTier>();

        // Gate outcome types
        require_send::<gates::GateResult>();
        require_sync::<gates::GateResult>();
        require_send::<gates::GateOutcome>();
        require_sync::<gates::GateOutcome>();
        require_send::<gates::StageOutput>();
        require_sync::<gates::StageOutput>();
        require_send::<gates::RationaleTrail>();
        require_sync::<gates::RationaleTrail>();

        // Gate stages (shared across worker threads by reference)
        require_send::<gates::SpreadGate>();
        require_sync::<gates::SpreadGate>();
        require_send::<gates::FundamentalsGate>();
        require_sync::<gates::FundamentalsGate>();
        require_send::<gates::InstitutionalGate>();
        require_sync::<gates::InstitutionalGate>();
        require_send::<gates::TrendGate>();
        require_sync::<gates::TrendGate>();
        require_send::<gates::ExecutionGate>();
        require_sync::<gates::ExecutionGate>();

        // Config
        require_send::<config::ScanConfig>();
        require_sync::<config::ScanConfig>();
    }

    /// Architecture contract: a gate stage sees only the survivor list and
    /// the immutable batch — no portfolio, no mutable shared state.
    #[test]
    fn gate_stage_trait_is_survivors_and_batch_only() {
        fn _check_trait_object_builds(
            gate: &dyn gates::GateStage,
            survivors: &[String],
            batch: &domain::ScanBatch,
        ) -> gates::StageOutput {
            gate.run(survivors, batch)
        }
    }
}
