//! SwingScan Runner — pipeline orchestration, candidates, watchlist, reporting.
//!
//! This crate builds on `swingscan-core` to provide:
//! - The pipeline state machine folding the five gates with short-circuit
//! - Candidate assembly with ATR-based trade plans
//! - The daily coiling-spring watchlist and its weekly aggregation
//! - The serializable scan report with funnel metrics and JSON/CSV export

pub mod candidates;
pub mod pipeline;
pub mod report;
pub mod watchlist;

pub use candidates::{assemble_candidates, plan_trade, Candidate, CandidateStatus, TradePlan};
pub use pipeline::{run_scan, PipelineStage};
pub use report::{
    export_candidates_csv, export_json, import_json, FunnelMetrics, ScanReport, SCHEMA_VERSION,
};
pub use watchlist::{aggregate_weekly, build_watchlist, WatchlistEntry, WeeklyEntry};
