//! Central threshold configuration.
//!
//! Every tunable the gates consult lives here; the gate code itself carries
//! no magic numbers. All structs deserialize from TOML with per-gate
//! `[gate1]`..`[gate4]` tables, every field individually defaultable, and a
//! `validate()` pass that rejects incoherent thresholds up front.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::CapTier;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid threshold {field}: {message}")]
    InvalidThreshold {
        field: &'static str,
        message: String,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Gate 1 — sector-adjusted spread z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gate1Config {
    /// Maximum sector-relative z-score (boundary inclusive).
    pub max_spread_z: f64,
    /// Absolute spread cap; an instrument at or above the cap fails
    /// regardless of its sector z-score.
    pub max_abs_spread: f64,
    /// Trailing sessions averaged to produce the per-instrument spread.
    pub rolling_window: usize,
}

impl Default for Gate1Config {
    fn default() -> Self {
        Self {
            max_spread_z: 2.0,
            max_abs_spread: 0.5,
            rolling_window: 20,
        }
    }
}

/// Gate 2 — fundamental quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gate2Config {
    /// Minimum accounting-quality score out of 9 (boundary inclusive).
    /// Deliberately below the textbook 8/9 bar: disclosure in the target
    /// market is noisier, and missing inputs already bias toward rejection.
    pub min_f_score: u32,
    /// Minimum CFO / PAT ratio (boundary inclusive).
    pub min_cfo_pat: f64,
    /// Maximum promoter pledge percentage (boundary inclusive).
    pub max_promoter_pledge: f64,
}

impl Default for Gate2Config {
    fn default() -> Self {
        Self {
            min_f_score: 4,
            min_cfo_pat: 0.5,
            max_promoter_pledge: 5.0,
        }
    }
}

/// Minimum institutional backing for one market-cap tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub min_inst_ownership_pct: f64,
    pub min_free_float_pct: f64,
}

/// Gate 2B — institutional confirmation, per cap tier.
///
/// The numeric values are policy, not algorithm: the defaults below are
/// placeholders to be overridden by the deploying desk. Smaller tiers are
/// held to stricter minimums on the premise that institutional presence is
/// a stronger validating signal for less-covered names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gate2bConfig {
    pub large: TierThresholds,
    pub mid: TierThresholds,
    pub small: TierThresholds,
}

impl Default for Gate2bConfig {
    fn default() -> Self {
        Self {
            large: TierThresholds {
                min_inst_ownership_pct: 5.0,
                min_free_float_pct: 15.0,
            },
            mid: TierThresholds {
                min_inst_ownership_pct: 10.0,
                min_free_float_pct: 20.0,
            },
            small: TierThresholds {
                min_inst_ownership_pct: 15.0,
                min_free_float_pct: 25.0,
            },
        }
    }
}

impl Gate2bConfig {
    /// Thresholds for a tier; unresolved tiers take the strictest (SMALL).
    pub fn for_tier(&self, tier: Option<CapTier>) -> TierThresholds {
        match tier.unwrap_or(CapTier::Small) {
            CapTier::Large => self.large,
            CapTier::Mid => self.mid,
            CapTier::Small => self.small,
        }
    }
}

/// Gate 3 — trend template, ADX, Mansfield relative strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gate3Config {
    /// Minimum ADX. A low bar, intentionally permissive toward
    /// early-stage trends.
    pub min_adx: f64,
    pub adx_period: usize,
    /// Minimum Mansfield RS slope over the trailing segment (inclusive).
    pub min_mansfield_slope: f64,
    pub ma_short: usize,
    pub ma_mid: usize,
    pub ma_long: usize,
    /// The long MA must exceed its own value this many sessions ago.
    pub ma_long_trend_sessions: usize,
    /// Mansfield zero-line lookback in weeks.
    pub rs_lookback_weeks: usize,
    /// Trailing sessions over which the RS slope is regressed.
    pub mrs_slope_window: usize,
}

impl Default for Gate3Config {
    fn default() -> Self {
        Self {
            min_adx: 10.0,
            adx_period: 14,
            min_mansfield_slope: 0.01,
            ma_short: 50,
            ma_mid: 150,
            ma_long: 200,
            ma_long_trend_sessions: 20,
            rs_lookback_weeks: 52,
            mrs_slope_window: 20,
        }
    }
}

/// Gate 4 — execution timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gate4Config {
    /// Dampening applied to the prorated volume expectation, avoiding false
    /// negatives early in the session.
    pub vol_prorate_factor: f64,
    pub min_rr_ratio: f64,
    pub atr_period: usize,
    pub atr_stop_multiplier: f64,
    /// Trailing sessions averaged for the baseline daily volume.
    pub vol_avg_days: usize,
    /// Full session length in minutes (9:15–15:30 = 375).
    pub market_open_minutes: f64,
}

impl Default for Gate4Config {
    fn default() -> Self {
        Self {
            vol_prorate_factor: 0.85,
            min_rr_ratio: 2.0,
            atr_period: 14,
            atr_stop_multiplier: 2.0,
            vol_avg_days: 20,
            market_open_minutes: 375.0,
        }
    }
}

/// Assembled scan configuration — the single value threaded through a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub gate1: Gate1Config,
    pub gate2: Gate2Config,
    pub gate2b: Gate2bConfig,
    pub gate3: Gate3Config,
    pub gate4: Gate4Config,
}

impl ScanConfig {
    /// Parse from a TOML document; missing tables/fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Content fingerprint: identical configurations hash identically, so a
    /// scan report can be traced back to the exact thresholds it ran under.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("ScanConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidThreshold {
                    field,
                    message: format!("must be positive and finite, got {value}"),
                })
            }
        }

        if self.gate1.rolling_window == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "gate1.rolling_window",
                message: "must be >= 1".into(),
            });
        }
        positive("gate1.max_abs_spread", self.gate1.max_abs_spread)?;

        if self.gate2.min_f_score > 9 {
            return Err(ConfigError::InvalidThreshold {
                field: "gate2.min_f_score",
                message: format!("score is out of 9 signals, got {}", self.gate2.min_f_score),
            });
        }

        for (field, t) in [
            ("gate2b.large", self.gate2b.large),
            ("gate2b.mid", self.gate2b.mid),
            ("gate2b.small", self.gate2b.small),
        ] {
            if t.min_inst_ownership_pct < 0.0 || t.min_free_float_pct < 0.0 {
                return Err(ConfigError::InvalidThreshold {
                    field,
                    message: "tier thresholds must be non-negative".into(),
                });
            }
        }

        if !(self.gate3.ma_short < self.gate3.ma_mid && self.gate3.ma_mid < self.gate3.ma_long) {
            return Err(ConfigError::InvalidThreshold {
                field: "gate3.ma_short/ma_mid/ma_long",
                message: format!(
                    "moving averages must be strictly ordered, got {}/{}/{}",
                    self.gate3.ma_short, self.gate3.ma_mid, self.gate3.ma_long
                ),
            });
        }
        if self.gate3.ma_long_trend_sessions == 0
            || self.gate3.adx_period == 0
            || self.gate3.rs_lookback_weeks == 0
            || self.gate3.mrs_slope_window < 2
        {
            return Err(ConfigError::InvalidThreshold {
                field: "gate3 windows",
                message: "trend/RS windows must allow at least a two-point slope".into(),
            });
        }

        if self.gate4.vol_prorate_factor <= 0.0 || self.gate4.vol_prorate_factor > 1.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "gate4.vol_prorate_factor",
                message: format!("must be in (0, 1], got {}", self.gate4.vol_prorate_factor),
            });
        }
        positive("gate4.market_open_minutes", self.gate4.market_open_minutes)?;
        positive("gate4.atr_stop_multiplier", self.gate4.atr_stop_multiplier)?;
        if self.gate4.atr_period == 0 || self.gate4.vol_avg_days == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "gate4.atr_period/vol_avg_days",
                message: "must be >= 1".into(),
            });
        }

        Ok(())
    }
}
