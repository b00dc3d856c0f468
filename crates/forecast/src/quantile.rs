//! Predicted range of the return `horizon` sessions ahead, from a pair of
//! linear quantile regressions.

use tradyx_core::config::MlConfig;
use tradyx_core::{ensure_history, Bias, Error, PredictedRange, Result};

use crate::forecaster::{supervised, Forecaster};
use crate::frame::{Feature, FeatureFrame};
use crate::linalg::{dot, weighted_least_squares, Standardizer};

const FEATURES: [Feature; 3] = [Feature::Vix, Feature::RealizedVol, Feature::VixChange];

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-6;
/// Residuals are floored at this magnitude before inversion.
const RESIDUAL_FLOOR: f64 = 1e-6;
const RIDGE: f64 = 1e-10;

/// Quantile regression by iteratively reweighted least squares.
///
/// Starts from ordinary least squares; each pass reweights a sample by the
/// inverse of its asymmetrically scaled absolute residual.
fn quantile_fit(design: &[Vec<f64>], y: &[f64], q: f64) -> Result<Vec<f64>> {
    if !(0.0..1.0).contains(&q) || q == 0.0 {
        return Err(Error::config(format!("quantile {q} outside (0, 1)")));
    }
    let mut beta = weighted_least_squares(design, y, None, RIDGE)?;
    for _ in 0..MAX_ITERATIONS {
        let weights: Vec<f64> = design
            .iter()
            .zip(y)
            .map(|(row, yi)| {
                let mut resid = yi - dot(&beta, row);
                if resid.abs() < RESIDUAL_FLOOR {
                    resid = RESIDUAL_FLOOR.copysign(resid);
                }
                let scaled = if resid < 0.0 { q * resid } else { (1.0 - q) * resid };
                1.0 / scaled.abs()
            })
            .collect();
        let next = weighted_least_squares(design, y, Some(&weights), RIDGE)?;
        let diff = next
            .iter()
            .zip(&beta)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        beta = next;
        if diff < TOLERANCE {
            break;
        }
    }
    Ok(beta)
}

/// Lower and upper quantiles of the `horizon`-session-ahead return.
#[derive(Debug, Clone)]
pub struct QuantileForecaster {
    min_samples: usize,
    horizon: usize,
    lower_q: f64,
    upper_q: f64,
    regime_pct: f64,
}

impl QuantileForecaster {
    pub fn new(config: &MlConfig) -> Self {
        Self {
            min_samples: config.range_min_samples,
            horizon: config.range_horizon,
            lower_q: config.range_lower_q,
            upper_q: config.range_upper_q,
            regime_pct: config.range_regime_pct,
        }
    }
}

impl Forecaster for QuantileForecaster {
    type Output = PredictedRange;

    fn name(&self) -> &'static str {
        "predicted_range"
    }

    fn min_samples(&self) -> usize {
        self.min_samples
    }

    fn forecast(&self, frame: &FeatureFrame) -> Result<PredictedRange> {
        let horizon = self.horizon.max(1);
        let (x, y) = supervised(frame, &FEATURES, horizon, |f, i| f.rows()[i + horizon].ret);
        ensure_history(self.name(), self.min_samples, x.len())?;
        let latest = frame.latest().ok_or_else(|| Error::degenerate("empty frame"))?;

        let scaler = Standardizer::fit(&x)?;
        let design: Vec<Vec<f64>> = x.iter().map(|row| scaler.design_row(row)).collect();
        let last = scaler.design_row(&latest.select(&FEATURES));

        let upper_pct = dot(&quantile_fit(&design, &y, self.upper_q)?, &last) * 100.0;
        let lower_pct = dot(&quantile_fit(&design, &y, self.lower_q)?, &last) * 100.0;

        let regime = if upper_pct > self.regime_pct {
            Bias::Bullish
        } else if lower_pct < -self.regime_pct {
            Bias::Bearish
        } else {
            Bias::Neutral
        };
        Ok(PredictedRange {
            upper_pct,
            lower_pct,
            regime,
        })
    }
}
