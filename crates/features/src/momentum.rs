//! Drift direction and momentum strength of the close series.

use tracing::info;
use tradyx_core::config::MomentumConfig;
use tradyx_core::{
    ensure_history, round_dp, BreadthMomentum, Config, Error, MarketSeries, MomentumStrength,
    Result,
};

use crate::degrade;
use crate::stats::{self, annualize_pct, tail};

/// `EMA(fast) - EMA(slow)` of the closes, evaluated at the last close.
pub fn drift_direction(closes: &[f64], cfg: &MomentumConfig) -> Result<f64> {
    ensure_history("drift_direction", cfg.ema_slow_span, closes.len())?;
    let fast = stats::ema(closes, cfg.ema_fast_span);
    let slow = stats::ema(closes, cfg.ema_slow_span);
    match (fast.last(), slow.last()) {
        (Some(f), Some(s)) => Ok(f - s),
        _ => Err(Error::degenerate("empty close series")),
    }
}

/// Percent change from the close `lookback` sessions ago to the last close.
fn performance(closes: &[f64], lookback: usize) -> Option<f64> {
    let last = *closes.last()?;
    let base = closes[closes.len().checked_sub(lookback + 1)?];
    (base > 0.0).then(|| (last - base) / base * 100.0)
}

/// Percent change from the first close to the last close.
fn performance_since_start(closes: &[f64]) -> Option<f64> {
    performance(closes, closes.len().checked_sub(1)?)
}

/// Annualized volatility (percent) of the last `days` simple returns.
fn trailing_vol(closes: &[f64], days: usize, trading_days: f64) -> Option<f64> {
    let returns = stats::simple_returns(tail(closes, days + 1));
    if returns.len() < 2 {
        return None;
    }
    stats::population_std(&returns)
        .ok()
        .map(|std| annualize_pct(std, trading_days))
}

/// Momentum strength: summed 3/6/9-month performance over 3M + 1M volatility.
///
/// When history is short, the 6- and 9-month performance terms fall back to
/// the earliest close once the next-shorter horizon is covered.
pub fn momentum_strength(closes: &[f64], cfg: &MomentumConfig) -> Result<MomentumStrength> {
    ensure_history("momentum_strength", cfg.momentum_min_closes, closes.len())?;
    let n = closes.len();
    let month = cfg.days_per_month;
    let (d1, d3, d6, d9) = (month, 3 * month, 6 * month, 9 * month);

    let perf_6m = if n > d6 {
        performance(closes, d6)
    } else if n > d3 {
        performance_since_start(closes)
    } else {
        None
    };
    let perf_3m = if n > d3 { performance(closes, d3) } else { None };
    let perf_9m = if n > d9 {
        performance(closes, d9)
    } else if n > d6 {
        performance_since_start(closes)
    } else {
        None
    };

    let perfs: Vec<f64> = [perf_6m, perf_3m, perf_9m].into_iter().flatten().collect();
    if perfs.is_empty() {
        return Err(Error::insufficient("momentum_strength", d3 + 1, n));
    }

    let vol_3m = trailing_vol(closes, d3.min(n - 1), cfg.trading_days);
    let vol_1m = trailing_vol(closes, d1.min(n - 1), cfg.trading_days);
    let (Some(vol_3m), Some(vol_1m)) = (vol_3m, vol_1m) else {
        return Err(Error::degenerate("momentum volatility unavailable"));
    };
    let denominator = vol_3m + vol_1m;
    if denominator == 0.0 {
        return Err(Error::degenerate("momentum volatility is zero"));
    }

    let raw = perfs.iter().sum::<f64>() / denominator;
    let half = cfg.scale_half_range;
    let scaled = ((raw + half) / (2.0 * half) * 100.0).clamp(0.0, 100.0);
    Ok(MomentumStrength { raw, scaled })
}

/// Computes [`BreadthMomentum`] from the close series.
pub struct BreadthMomentumEngine {
    config: MomentumConfig,
}

impl BreadthMomentumEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.momentum.clone(),
        }
    }

    /// Compute drift direction and momentum strength from the close series.
    pub fn compute(&self, series: &MarketSeries) -> BreadthMomentum {
        let closes = series.closes();
        let out = BreadthMomentum {
            drift_direction: degrade("drift_direction", drift_direction(&closes, &self.config))
                .map(|d| round_dp(d, 2)),
            momentum_strength: degrade(
                "momentum_strength",
                momentum_strength(&closes, &self.config),
            )
            .map(|m| MomentumStrength {
                raw: round_dp(m.raw, 4),
                scaled: round_dp(m.scaled, 1),
            }),
        };
        info!(
            drift = ?out.drift_direction,
            strength = ?out.momentum_strength.as_ref().map(|m| m.scaled),
            "Breadth momentum computed"
        );
        out
    }
}
