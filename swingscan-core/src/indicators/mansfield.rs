//! Mansfield Relative Strength (MRS).
//!
//! Price performance rebased against a broad benchmark index:
//!
//! 1. RP[t] = 100 * close[t] / benchmark_close[t]
//! 2. zero line = SMA(RP, lookback_weeks * 5 sessions)
//! 3. MRS[t] = (RP[t] / zero_line[t] - 1) * 100
//!
//! MRS > 0 means the instrument is outperforming its own trailing-year
//! relationship to the index; a rising MRS marks sustained outperformance.
//! The two series are aligned from the tail: both are assumed to end on the
//! scan date, per the data collaborator's contract.

use crate::domain::Bar;

/// Trading sessions per calendar week.
pub const SESSIONS_PER_WEEK: usize = 5;

#[derive(Debug, Clone)]
pub struct MansfieldRs {
    zero_line_weeks: usize,
    name: String,
}

impl MansfieldRs {
    pub fn new(zero_line_weeks: usize) -> Self {
        assert!(zero_line_weeks >= 1, "MRS zero-line lookback must be >= 1 week");
        Self {
            zero_line_weeks,
            name: format!("mrs_{zero_line_weeks}w"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-line window in sessions.
    pub fn zero_line_sessions(&self) -> usize {
        self.zero_line_weeks * SESSIONS_PER_WEEK
    }

    /// Sessions of overlap consumed before the first valid output.
    pub fn lookback(&self) -> usize {
        self.zero_line_sessions() - 1
    }

    /// Compute MRS for `bars` against `benchmark`.
    ///
    /// Returns a series the same length as `bars`; positions with no
    /// benchmark overlap or inside the zero-line warmup are NaN.
    pub fn compute(&self, bars: &[Bar], benchmark: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        let overlap = n.min(benchmark.len());
        if overlap < self.zero_line_sessions() {
            return result;
        }

        // Tail-aligned relative price
        let offset = n - overlap;
        let bench_offset = benchmark.len() - overlap;
        let mut rp = vec![f64::NAN; overlap];
        for i in 0..overlap {
            let close = bars[offset + i].close;
            let bench = benchmark[bench_offset + i].close;
            if close.is_nan() || bench.is_nan() || bench <= 0.0 {
                continue;
            }
            rp[i] = 100.0 * close / bench;
        }

        let zero_line = rolling_mean(&rp, self.zero_line_sessions());
        for i in 0..overlap {
            let zl = zero_line[i];
            if rp[i].is_nan() || zl.is_nan() || zl <= 0.0 {
                continue;
            }
            result[offset + i] = (rp[i] / zl - 1.0) * 100.0;
        }

        result
    }
}

/// Rolling mean over a raw f64 series; NaN in the window yields NaN.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }
    for i in (window - 1)..n {
        let segment = &values[i + 1 - window..=i];
        if segment.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = segment.iter().sum::<f64>() / window as f64;
    }
    result
}

/// Least-squares slope of the trailing `window` points of a series.
///
/// Returns NaN when the series is shorter than the window or any point in
/// the trailing segment is NaN.
pub fn trailing_slope(values: &[f64], window: usize) -> f64 {
    if window < 2 || values.len() < window {
        return f64::NAN;
    }
    let segment = &values[values.len() - window..];
    if segment.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }

    let n = window as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = segment.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, &y) in segment.iter().enumerate() {
        let dx = i as f64 - x_mean;
        cov += dx * (y - y_mean);
        var += dx * dx;
    }
    cov / var
}
