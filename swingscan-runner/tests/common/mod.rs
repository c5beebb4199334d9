//! Shared fixtures for the pipeline integration tests.
#![allow(dead_code)] // not every test binary uses every fixture

use chrono::NaiveDate;
use swingscan_core::domain::{
    Bar, CapTier, FundamentalsSnapshot, Instrument, InstitutionalSnapshot, ScanBatch, YearFigures,
};

pub fn bars_from_closes(closes: &[f64], volume: u64) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume,
            }
        })
        .collect()
}

/// A series that clears every gate under the default configuration: a slow
/// base for 200 sessions, then a strong 120-session advance. The late
/// acceleration keeps the Mansfield RS slope positive against a flat
/// benchmark.
pub fn trending_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            if i < 200 {
                100.0 + 0.05 * i as f64
            } else {
                110.0 + (i - 200) as f64
            }
        })
        .collect()
}

/// Fundamentals satisfying all nine quality signals.
pub fn strong_fundamentals() -> FundamentalsSnapshot {
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

pub fn backed_institutional() -> InstitutionalSnapshot {
    InstitutionalSnapshot {
        inst_ownership_pct: Some(30.0),
        free_float_pct: Some(40.0),
    }
}

/// An instrument that clears every gate under the default configuration.
pub fn trending_instrument(ticker: &str) -> Instrument {
    let mut inst = Instrument::new(ticker, bars_from_closes(&trending_closes(320), 1_000_000));
    inst.sector = "Auto".to_string();
    inst.cap_tier = Some(CapTier::Large);
    inst.fundamentals = strong_fundamentals();
    inst.institutional = backed_institutional();
    inst
}

/// 250 sessions of a perfectly flat tape (high == low == close): clears the
/// spread and fundamental gates, hard-fails the trend template.
pub fn flat_instrument(ticker: &str) -> Instrument {
    let base_date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let series: Vec<Bar> = (0..250)
        .map(|i| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1_000_000,
        })
        .collect();
    let mut inst = Instrument::new(ticker, series);
    inst.sector = "Auto".to_string();
    inst.cap_tier = Some(CapTier::Large);
    inst.fundamentals = strong_fundamentals();
    inst.institutional = backed_institutional();
    inst
}

/// Batch with a flat benchmark long enough for the 52-week RS zero line.
pub fn batch_with(instruments: Vec<Instrument>) -> ScanBatch {
    let mut batch = ScanBatch::new();
    for inst in instruments {
        batch.insert(inst);
    }
    batch.benchmark = bars_from_closes(&vec![100.0; 320], 1_000_000);
    batch
}
