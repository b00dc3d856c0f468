//! Statistical forecasts: Parkinson regime, expected move, quantile bands and
//! cross-asset beta.

use tracing::info;
use tradyx_core::config::StatisticalConfig;
use tradyx_core::{
    ensure_history, round_dp, Bias, Config, CrossAssetBeta, Error, ExpectedMove, ForecastSet,
    MarketSeries, ParkinsonForecast, QuantileBands, Result, SpotSnapshot,
};

use crate::degrade;
use crate::stats::{self, tail};
use crate::volatility;

/// Parkinson volatility over every valid high/low pair, with its regime.
pub fn parkinson_forecast(
    series: &MarketSeries,
    cfg: &StatisticalConfig,
    trading_days: f64,
) -> Result<ParkinsonForecast> {
    let (highs, lows): (Vec<f64>, Vec<f64>) = series
        .bars()
        .iter()
        .filter(|b| b.high > 0.0 && b.low > 0.0 && b.high >= b.low)
        .map(|b| (b.high, b.low))
        .unzip();
    ensure_history("parkinson_forecast", cfg.parkinson_min_pairs, highs.len())?;
    let value = volatility::parkinson(&highs, &lows, trading_days)?;
    Ok(ParkinsonForecast {
        value,
        regime: Bias::high_is_bearish(value, cfg.parkinson_bearish, cfg.parkinson_bullish),
    })
}

/// Expected move over the configured horizon, in points and percent of spot.
pub fn expected_move(spot: f64, vix: f64, cfg: &StatisticalConfig) -> Result<ExpectedMove> {
    if spot <= 0.0 {
        return Err(Error::degenerate("spot must be positive"));
    }
    let points = volatility::expected_move(spot, vix, cfg.expected_move_days);
    let pct = points / spot * 100.0;
    Ok(ExpectedMove {
        points,
        pct,
        regime: Bias::high_is_bearish(
            pct,
            cfg.expected_move_bearish_pct,
            cfg.expected_move_bullish_pct,
        ),
    })
}

/// Percentile bands of the return series. The regime compares the mean of the
/// most recent returns against the interquartile range.
pub fn quantile_bands(returns: &[f64], cfg: &StatisticalConfig) -> Result<QuantileBands> {
    ensure_history("quantile_bands", cfg.quantile_min_points, returns.len())?;
    let [q05, q25, q50, q75, q95] = stats::percentiles(returns, [0.05, 0.25, 0.5, 0.75, 0.95])?;
    let recent = stats::mean(tail(returns, cfg.quantile_recent))?;
    let regime = if recent > q75 {
        Bias::Bullish
    } else if recent < q25 {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    Ok(QuantileBands {
        q05,
        q25,
        q50,
        q75,
        q95,
        regime,
    })
}

/// OLS beta of sector returns on the underlying's returns over their trailing overlap.
pub fn cross_asset_beta(
    underlying: &[f64],
    sector: &[f64],
    cfg: &StatisticalConfig,
) -> Result<CrossAssetBeta> {
    let n = underlying.len().min(sector.len());
    ensure_history("cross_asset_beta", cfg.beta_min_points, n)?;
    let fit = stats::linear_fit(tail(underlying, n), tail(sector, n))?;
    Ok(CrossAssetBeta {
        beta: fit.beta,
        alpha: fit.alpha,
        r_squared: fit.r_squared,
        regime: Bias::high_is_bearish(fit.beta, cfg.beta_bearish, cfg.beta_bullish),
    })
}

/// Computes the [`ForecastSet`].
pub struct StatisticalForecastEngine {
    config: StatisticalConfig,
    trading_days: f64,
}

impl StatisticalForecastEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.statistical.clone(),
            trading_days: config.volatility.trading_days,
        }
    }

    /// Compute all statistical forecasts.
    pub fn compute(&self, series: &MarketSeries, market: &SpotSnapshot) -> ForecastSet {
        let cfg = &self.config;
        let vix = market.vix.unwrap_or(cfg.fallback_vix);

        let sector_returns = series
            .sectors()
            .get(&cfg.beta_sector)
            .map(|s| s.returns.as_slice())
            .ok_or_else(|| Error::data(format!("sector '{}' not in market series", cfg.beta_sector)));

        let set = ForecastSet {
            parkinson: degrade(
                "parkinson_forecast",
                parkinson_forecast(series, cfg, self.trading_days),
            )
            .map(|mut p| {
                p.value = round_dp(p.value, 2);
                p
            }),
            expected_move: market
                .spot
                .and_then(|spot| degrade("expected_move", expected_move(spot, vix, cfg)))
                .map(|mut em| {
                    em.points = round_dp(em.points, 2);
                    em.pct = round_dp(em.pct, 2);
                    em
                }),
            quantiles: degrade("quantile_bands", quantile_bands(series.returns(), cfg)).map(
                |mut q| {
                    for v in [&mut q.q05, &mut q.q25, &mut q.q50, &mut q.q75, &mut q.q95] {
                        *v = round_dp(*v, 2);
                    }
                    q
                },
            ),
            beta: degrade(
                "cross_asset_beta",
                sector_returns.and_then(|sector| cross_asset_beta(series.returns(), sector, cfg)),
            )
            .map(|mut b| {
                b.beta = round_dp(b.beta, 3);
                b.alpha = round_dp(b.alpha, 3);
                b.r_squared = round_dp(b.r_squared, 3);
                b
            }),
        };

        info!(
            parkinson = set.parkinson.is_some(),
            expected_move = set.expected_move.is_some(),
            quantiles = set.quantiles.is_some(),
            beta = set.beta.is_some(),
            "Statistical forecasts computed"
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tradyx_core::{OhlcBar, SectorSeries};

    fn series_with(bars: usize, sector: Option<Vec<f64>>) -> MarketSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<OhlcBar> = (0..bars)
            .map(|i| {
                let close = 100.0 + ((i * 13) % 7) as f64;
                OhlcBar {
                    date: start + chrono::Days::new(i as u64),
                    open: close,
                    high: close * 1.005,
                    low: close * 0.995,
                    close,
                    volume: 0.0,
                }
            })
            .collect();
        let mut sectors = BTreeMap::new();
        if let Some(returns) = sector {
            sectors.insert(
                "BANKNIFTY".to_string(),
                SectorSeries {
                    close: vec![],
                    returns,
                    current: None,
                },
            );
        }
        MarketSeries::new(bars, vec![], sectors)
    }

    #[test]
    fn test_parkinson_forecast_skips_invalid_bars() {
        let cfg = StatisticalConfig::default();
        let mut series_bars = series_with(25, None).bars().to_vec();
        series_bars[3].low = series_bars[3].high + 1.0;
        let series = MarketSeries::new(series_bars, vec![], BTreeMap::new());
        let p = parkinson_forecast(&series, &cfg, 252.0).unwrap();
        // ln(1.005/0.995) per bar annualizes to ~9.6%
        assert!(p.value < 10.0);
        assert_eq!(p.regime, Bias::Bullish);

        let short = series_with(10, None);
        assert!(parkinson_forecast(&short, &cfg, 252.0).is_err());
    }

    #[test]
    fn test_expected_move() {
        let cfg = StatisticalConfig::default();
        let em = expected_move(25000.0, 15.0, &cfg).unwrap();
        assert_abs_diff_eq!(em.points, 196.28, epsilon = 0.01);
        assert_abs_diff_eq!(em.pct, 0.785, epsilon = 0.001);
        assert_eq!(em.regime, Bias::Neutral);

        let calm = expected_move(25000.0, 5.0, &cfg).unwrap();
        assert_eq!(calm.regime, Bias::Bullish);
        let wild = expected_move(25000.0, 30.0, &cfg).unwrap();
        assert_eq!(wild.regime, Bias::Bearish);
    }

    #[test]
    fn test_quantile_bands() {
        let cfg = StatisticalConfig::default();
        let mut returns: Vec<f64> = (0..40).map(|i| (i % 10) as f64 - 4.5).collect();
        let q = quantile_bands(&returns, &cfg).unwrap();
        assert!(q.q05 <= q.q25 && q.q25 <= q.q50 && q.q50 <= q.q75 && q.q75 <= q.q95);
        // Last five average 2.5, exactly the upper quartile
        assert_eq!(q.q75, 2.5);
        assert_eq!(q.regime, Bias::Neutral);

        returns.extend([4.0; 5]);
        assert_eq!(quantile_bands(&returns, &cfg).unwrap().regime, Bias::Bullish);

        returns.extend([-5.0; 5]);
        assert_eq!(quantile_bands(&returns, &cfg).unwrap().regime, Bias::Bearish);
        assert!(quantile_bands(&returns[..20], &cfg).is_err());
    }

    #[test]
    fn test_cross_asset_beta() {
        let cfg = StatisticalConfig::default();
        let x: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.1 + 1.5 * v).collect();
        let b = cross_asset_beta(&x, &y, &cfg).unwrap();
        assert_abs_diff_eq!(b.beta, 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(b.alpha, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(b.r_squared, 1.0, epsilon = 1e-9);
        assert_eq!(b.regime, Bias::Bearish);

        assert!(cross_asset_beta(&x[..20], &y, &cfg).is_err());
        assert!(cross_asset_beta(&[1.0; 40], &y, &cfg).is_err());
    }

    #[test]
    fn test_engine_missing_sector_only_nulls_beta() {
        let engine = StatisticalForecastEngine::new(&Config::default());
        let market = SpotSnapshot {
            spot: Some(25000.0),
            ..Default::default()
        };
        let set = engine.compute(&series_with(40, None), &market);
        assert!(set.beta.is_none());
        assert!(set.parkinson.is_some());
        assert!(set.quantiles.is_some());
        // VIX falls back to 15
        assert_eq!(set.expected_move.unwrap().points, 196.28);
    }

    #[test]
    fn test_engine_beta_with_sector() {
        let engine = StatisticalForecastEngine::new(&Config::default());
        let series = series_with(40, None);
        let sector: Vec<f64> = series.returns().iter().map(|r| 0.5 * r).collect();
        let series = MarketSeries::new(
            series.bars().to_vec(),
            vec![],
            BTreeMap::from([(
                "BANKNIFTY".to_string(),
                SectorSeries {
                    close: vec![],
                    returns: sector,
                    current: None,
                },
            )]),
        );
        let set = engine.compute(&series, &SpotSnapshot::default());
        let beta = set.beta.unwrap();
        assert_eq!(beta.beta, 0.5);
        assert_eq!(beta.regime, Bias::Bullish);
        assert!(set.expected_move.is_none());
    }
}
