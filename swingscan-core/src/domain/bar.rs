//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument on a single session.
///
/// Series handed to the core are assumed split-adjusted by the data
/// collaborator; the core never adjusts prices itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Intraday range relative to close: (high - low) / close.
    ///
    /// Used by the spread-quality gate as a liquidity proxy. Returns NaN for
    /// void bars or a non-positive close.
    pub fn range_spread(&self) -> f64 {
        if self.is_void() || self.close <= 0.0 {
            return f64::NAN;
        }
        (self.high - self.low) / self.close
    }
}
