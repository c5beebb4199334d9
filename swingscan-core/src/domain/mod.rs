//! Domain types: bars, instruments, and the scan batch.

pub mod bar;
pub mod batch;
pub mod instrument;

pub use bar::Bar;
pub use batch::ScanBatch;
pub use instrument::{CapTier, FundamentalsSnapshot, Instrument, InstitutionalSnapshot, YearFigures};
