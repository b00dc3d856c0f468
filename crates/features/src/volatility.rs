//! Volatility regime indicators.
//!
//! Twelve indicators over trailing windows of the close, high/low, VIX and
//! return series. Each one degrades to null on its own when its window is
//! short or its inputs are degenerate.

use tracing::info;
use tradyx_core::config::VolatilityConfig;
use tradyx_core::{
    ensure_history, round_dp, Config, Error, MarketSeries, Result, SpotSnapshot,
    VolRegime, VolatilityIndicatorSet,
};

use crate::degrade;
use crate::stats::{self, annualize_pct, tail};

/// Annualized realized volatility (percent) of the last `window` log returns.
pub fn realized_vol(closes: &[f64], window: usize, trading_days: f64) -> Result<f64> {
    ensure_history("realized_vol", window + 1, closes.len())?;
    let returns = stats::log_returns(closes);
    ensure_history("realized_vol", window, returns.len())?;
    let std = stats::population_std(tail(&returns, window))?;
    Ok(annualize_pct(std, trading_days))
}

/// Parkinson range-based volatility (percent, annualized) of the given bars.
///
/// Every bar must satisfy `high >= low > 0`.
pub fn parkinson(highs: &[f64], lows: &[f64], trading_days: f64) -> Result<f64> {
    if highs.is_empty() || highs.len() != lows.len() {
        return Err(Error::degenerate("parkinson needs aligned high/low bars"));
    }
    let mut sq = Vec::with_capacity(highs.len());
    for (&h, &l) in highs.iter().zip(lows) {
        if !(h > 0.0 && l > 0.0 && h >= l) {
            return Err(Error::degenerate(format!("invalid high/low pair {h}/{l}")));
        }
        sq.push((h / l).ln().powi(2));
    }
    let variance = stats::mean(&sq)? / (4.0 * std::f64::consts::LN_2);
    Ok(annualize_pct(variance.sqrt(), trading_days))
}

/// Parkinson volatility over the trailing `window` bars.
pub fn parkinson_window(
    highs: &[f64],
    lows: &[f64],
    window: usize,
    trading_days: f64,
) -> Result<f64> {
    ensure_history("parkinson", window, highs.len().min(lows.len()))?;
    parkinson(tail(highs, window), tail(lows, window), trading_days)
}

/// Expected move in points over `days` calendar days.
#[inline]
pub fn expected_move(spot: f64, vix: f64, days: f64) -> f64 {
    spot * (vix / 100.0) * (days / 365.0).sqrt()
}

/// Pearson correlation of VIX % changes and the underlying's returns.
pub fn vix_correlation(
    vix: &[f64],
    returns: &[f64],
    window: usize,
    min_points: usize,
) -> Result<f64> {
    ensure_history("vix_correlation", window + 1, vix.len())?;
    ensure_history("vix_correlation", window, returns.len())?;
    // A change touching a non-positive level is undefined; its return is dropped with it.
    let vix_changes: Vec<Option<f64>> = vix
        .windows(2)
        .map(|w| (w[0] > 0.0 && w[1] > 0.0).then(|| (w[1] - w[0]) / w[0]))
        .collect();
    let n = vix_changes.len().min(returns.len()).min(window);
    let (changes, rets): (Vec<f64>, Vec<f64>) = tail(&vix_changes, n)
        .iter()
        .zip(tail(returns, n))
        .filter_map(|(change, r)| change.map(|c| (c, *r)))
        .unzip();
    ensure_history("vix_correlation", min_points, changes.len())?;
    stats::pearson(&changes, &rets)
}

/// Fraction of up-closes among the consecutive pairs of the trailing window.
pub fn trend_consistency(closes: &[f64], window: usize) -> Result<f64> {
    ensure_history("trend_consistency", window.max(2), closes.len())?;
    let recent = tail(closes, window);
    let ups = recent.windows(2).filter(|w| w[1] > w[0]).count();
    Ok(ups as f64 / (recent.len() - 1) as f64)
}

/// Percentile rank (percent) of the latest return within the trailing window.
pub fn return_quantile_position(returns: &[f64], window: usize) -> Result<f64> {
    ensure_history("return_quantile_position", window.max(1), returns.len())?;
    let recent = tail(returns, window);
    let last = recent[recent.len() - 1];
    let rank = recent.iter().filter(|r| **r <= last).count();
    Ok(rank as f64 / recent.len() as f64 * 100.0)
}

/// Short-window over long-window Parkinson volatility.
pub fn range_compression(short: f64, long: f64) -> Result<f64> {
    if long == 0.0 {
        return Err(Error::degenerate("long-window parkinson volatility is zero"));
    }
    Ok(short / long)
}

/// Volatility risk premium in variance units: `(vix/100)^2 - (rv/100)^2`.
#[inline]
pub fn risk_premium(vix: f64, rv: f64) -> f64 {
    (vix / 100.0).powi(2) - (rv / 100.0).powi(2)
}

/// Relative change of the VRP over `lag` sessions.
///
/// The lagged VRP pairs the VIX close `lag` sessions back with realized
/// volatility estimated on closes truncated `lag` sessions earlier.
pub fn vrp_slope(vix: &[f64], closes: &[f64], cfg: &VolatilityConfig) -> Result<f64> {
    let lag = cfg.vrp_lag;
    ensure_history("vrp_slope", lag + 1, vix.len())?;
    ensure_history("vrp_slope", lag + 1, closes.len())?;

    let rv_now = realized_vol(closes, cfg.rv_window, cfg.trading_days)?;
    let vrp_now = risk_premium(vix[vix.len() - 1], rv_now);

    let truncated = &closes[..closes.len() - lag];
    let window = cfg.rv_window.min(truncated.len().saturating_sub(1)).max(2);
    let rv_then = realized_vol(truncated, window, cfg.trading_days)?;
    let vrp_then = risk_premium(vix[vix.len() - 1 - lag], rv_then);

    if vrp_then.abs() < cfg.vrp_epsilon {
        return Err(Error::degenerate("lagged VRP is within epsilon of zero"));
    }
    Ok((vrp_now - vrp_then) / vrp_then.abs())
}

/// Computes the [`VolatilityIndicatorSet`].
pub struct VolatilityIndicatorEngine {
    config: VolatilityConfig,
}

impl VolatilityIndicatorEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.volatility.clone(),
        }
    }

    /// Compute every indicator. Spot and VIX come from the authoritative snapshot.
    pub fn compute(&self, series: &MarketSeries, market: &SpotSnapshot) -> VolatilityIndicatorSet {
        let cfg = &self.config;
        let td = cfg.trading_days;
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let vix = market.vix;

        let rv = degrade("realized_vol", realized_vol(&closes, cfg.rv_window, td));
        let p20 = degrade(
            "parkinson_20d",
            parkinson_window(&highs, &lows, cfg.parkinson_short_window, td),
        );
        let p60 = degrade(
            "parkinson_60d",
            parkinson_window(&highs, &lows, cfg.parkinson_long_window, td),
        );

        let set = VolatilityIndicatorSet {
            realized_vol: rv.map(|v| round_dp(v, 2)),
            hv_iv_spread: vix.zip(rv).map(|(v, r)| round_dp(v - r, 2)),
            volatility_ratio: vix
                .zip(rv)
                .filter(|(v, _)| *v != 0.0)
                .map(|(v, r)| round_dp(r / v, 3)),
            parkinson_vol_20d: p20.map(|v| round_dp(v, 2)),
            parkinson_vol_60d: p60.map(|v| round_dp(v, 2)),
            expected_move_1day: market
                .spot
                .zip(vix)
                .map(|(s, v)| round_dp(expected_move(s, v, 1.0), 2)),
            vix_correlation: degrade(
                "vix_correlation",
                vix_correlation(
                    series.vix(),
                    series.returns(),
                    cfg.correlation_window,
                    cfg.correlation_min_points,
                ),
            )
            .map(|v| round_dp(v, 3)),
            trend_consistency_index: degrade(
                "trend_consistency",
                trend_consistency(&closes, cfg.trend_window),
            )
            .map(|v| round_dp(v, 3)),
            return_quantile_position: degrade(
                "return_quantile_position",
                return_quantile_position(series.returns(), cfg.quantile_window),
            )
            .map(|v| round_dp(v, 1)),
            volatility_regime: vix.zip(rv).map(|(v, r)| VolRegime::classify(v, r, &cfg.regime)),
            range_compression_index: p20
                .and_then(|short| {
                    degrade("range_compression", range_compression(short, p60.unwrap_or(short)))
                })
                .map(|v| round_dp(v, 3)),
            volatility_risk_premium: vix.zip(rv).map(|(v, r)| round_dp(risk_premium(v, r), 4)),
            vrp_slope: degrade("vrp_slope", vrp_slope(series.vix(), &closes, cfg))
                .map(|v| round_dp(v, 4)),
        };

        info!(
            bars = series.len(),
            rv = ?set.realized_vol,
            regime = ?set.volatility_regime,
            "Volatility indicators computed"
        );
        set
    }
}
