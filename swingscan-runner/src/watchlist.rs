//! Coiling-spring watchlist — daily entries and the weekly aggregation.
//!
//! A coiling spring holds the trend template but has not confirmed
//! momentum. The daily watchlist carries enough context (score, RS,
//! institutional backing) to be regenerated or reviewed without re-running
//! the scan; the weekly aggregation surfaces names that keep showing up,
//! which is the actual signal a consolidation is maturing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use swingscan_core::domain::{CapTier, ScanBatch};
use swingscan_core::gates::{names, RationaleTrail};

/// One daily watchlist row for a coiling-spring instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub close: Option<f64>,
    pub sector: String,
    pub cap_tier: Option<CapTier>,
    /// The specific strength test that failed (ADX or RS slope), verbatim
    /// from the trend gate.
    pub reason: String,
    pub f_score: Option<f64>,
    pub mrs: Option<f64>,
    pub inst_ownership: Option<f64>,
}

/// A watchlist entry that recurred across the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyEntry {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub days_on_watchlist: usize,
}

/// Build the daily watchlist from the coiling-spring set.
pub fn build_watchlist(
    coiling: &[String],
    batch: &ScanBatch,
    trail: &RationaleTrail,
) -> Vec<WatchlistEntry> {
    let mut tickers: Vec<&String> = coiling.iter().collect();
    tickers.sort();

    tickers
        .into_iter()
        .filter_map(|ticker| {
            let instrument = batch.get(ticker)?;
            let g3 = trail.get(ticker, names::TECHNICALS);
            let g2 = trail.get(ticker, names::FUNDAMENTALS);
            Some(WatchlistEntry {
                ticker: instrument.ticker.clone(),
                close: instrument.last_close(),
                sector: instrument.sector.clone(),
                cap_tier: instrument.cap_tier,
                reason: g3
                    .map(|r| r.reason.clone())
                    .unwrap_or_else(|| "Technical filters not met".to_string()),
                f_score: g2.and_then(|r| r.metrics.get("f_score").copied()),
                mrs: g3.and_then(|r| r.metrics.get("mrs").copied()),
                inst_ownership: instrument.institutional.inst_ownership_pct,
            })
        })
        .collect()
}

/// Aggregate a week of daily watchlists.
///
/// Keeps tickers appearing in at least `min_occurrences` daily lists,
/// carrying each ticker's most recent entry, sorted by persistence
/// (descending) then ticker. Sustained consolidation across the week is a
/// stronger setup than a single appearance.
pub fn aggregate_weekly(
    daily_lists: &[Vec<WatchlistEntry>],
    min_occurrences: usize,
) -> Vec<WeeklyEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut latest: BTreeMap<String, WatchlistEntry> = BTreeMap::new();

    for list in daily_lists {
        for entry in list {
            *counts.entry(entry.ticker.clone()).or_insert(0) += 1;
            latest.insert(entry.ticker.clone(), entry.clone());
        }
    }

    let mut weekly: Vec<WeeklyEntry> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_occurrences)
        .filter_map(|(ticker, count)| {
            latest.remove(&ticker).map(|entry| WeeklyEntry {
                entry,
                days_on_watchlist: count,
            })
        })
        .collect();

    weekly.sort_by(|a, b| {
        b.days_on_watchlist
            .cmp(&a.days_on_watchlist)
            .then_with(|| a.entry.ticker.cmp(&b.entry.ticker))
    });
    weekly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ticker: &str, close: f64) -> WatchlistEntry {
        WatchlistEntry {
            ticker: ticker.to_string(),
            close: Some(close),
            sector: "Auto".to_string(),
            cap_tier: Some(CapTier::Mid),
            reason: "ADX 8.0 < 10.0".to_string(),
            f_score: Some(6.0),
            mrs: Some(1.2),
            inst_ownership: Some(12.0),
        }
    }

    #[test]
    fn weekly_keeps_recurring_tickers_only() {
        let daily = vec![
            vec![entry("AAA", 100.0), entry("BBB", 50.0)],
            vec![entry("AAA", 101.0)],
            vec![entry("AAA", 102.0), entry("BBB", 51.0)],
        ];
        let weekly = aggregate_weekly(&daily, 3);
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].entry.ticker, "AAA");
        assert_eq!(weekly[0].days_on_watchlist, 3);
        // Latest close wins.
        assert_eq!(weekly[0].entry.close, Some(102.0));
    }

    #[test]
    fn weekly_sorts_by_persistence_then_ticker() {
        let daily = vec![
            vec![entry("AAA", 1.0), entry("BBB", 1.0), entry("CCC", 1.0)],
            vec![entry("AAA", 1.0), entry("BBB", 1.0)],
            vec![entry("BBB", 1.0)],
        ];
        let weekly = aggregate_weekly(&daily, 1);
        let order: Vec<(&str, usize)> = weekly
            .iter()
            .map(|w| (w.entry.ticker.as_str(), w.days_on_watchlist))
            .collect();
        assert_eq!(order, vec![("BBB", 3), ("AAA", 2), ("CCC", 1)]);
    }

    #[test]
    fn empty_week_is_empty() {
        assert!(aggregate_weekly(&[], 3).is_empty());
    }

    #[test]
    fn weekly_entry_flattens_in_json() {
        let weekly = WeeklyEntry {
            entry: entry("AAA", 100.0),
            days_on_watchlist: 4,
        };
        let json = serde_json::to_value(&weekly).unwrap();
        assert_eq!(json["ticker"], "AAA");
        assert_eq!(json["days_on_watchlist"], 4);
    }
}
