//! Next-session bias from a least-squares fit of the next log return.

use tradyx_core::config::MlConfig;
use tradyx_core::{ensure_history, Bias, Error, NextDayBias, Result};

use crate::forecaster::{supervised, Forecaster};
use crate::frame::{Feature, FeatureFrame};
use crate::linalg::{dot, weighted_least_squares, Standardizer};

const FEATURES: [Feature; 4] = [
    Feature::Vix,
    Feature::VixChange,
    Feature::RealizedVol,
    Feature::Correlation,
];

/// Keeps collinear feature sets solvable without visibly shrinking the fit.
const RIDGE: f64 = 1e-8;

/// Ordinary least squares on {VIX, ΔVIX, RV, correlation}.
#[derive(Debug, Clone)]
pub struct LinearForecaster {
    min_samples: usize,
    neutral_band: f64,
}

impl LinearForecaster {
    pub fn new(config: &MlConfig) -> Self {
        Self {
            min_samples: config.bias_min_samples,
            neutral_band: config.bias_neutral_band,
        }
    }
}

impl Forecaster for LinearForecaster {
    type Output = NextDayBias;

    fn name(&self) -> &'static str {
        "next_day_bias"
    }

    fn min_samples(&self) -> usize {
        self.min_samples
    }

    fn forecast(&self, frame: &FeatureFrame) -> Result<NextDayBias> {
        let (x, y) = supervised(frame, &FEATURES, 1, |f, i| f.rows()[i + 1].ret);
        ensure_history(self.name(), self.min_samples, x.len())?;
        let latest = frame.latest().ok_or_else(|| Error::degenerate("empty frame"))?;

        let scaler = Standardizer::fit(&x)?;
        let design: Vec<Vec<f64>> = x.iter().map(|row| scaler.design_row(row)).collect();
        let coef = weighted_least_squares(&design, &y, None, RIDGE)?;

        let predicted = dot(&coef, &scaler.design_row(&latest.select(&FEATURES)));
        let pct = predicted * 100.0;
        Ok(NextDayBias {
            pct,
            direction: Bias::high_is_bullish(pct, self.neutral_band, -self.neutral_band),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRow;
    use approx::assert_abs_diff_eq;

    fn frame_with(next_ret: impl Fn(&FrameRow) -> f64, n: usize) -> FeatureFrame {
        let mut rows: Vec<FrameRow> = (0..n)
            .map(|i| {
                let t = i as f64;
                FrameRow {
                    vix: 14.0 + (t * 0.5).sin() * 2.0,
                    vix_change: (t * 0.9).cos(),
                    realized_vol: 12.0 + (t * 0.3).cos() * 3.0,
                    correlation: -0.4 + (t * 0.2).sin() * 0.3,
                    ret: 0.0,
                }
            })
            .collect();
        for i in 1..n {
            rows[i].ret = next_ret(&rows[i - 1]);
        }
        FeatureFrame::from_rows(rows)
    }

    #[test]
    fn test_recovers_linear_relationship() {
        let rule = |r: &FrameRow| 0.001 * (r.vix - 14.0) - 0.002 * r.vix_change;
        let frame = frame_with(rule, 40);
        let bias = LinearForecaster::new(&MlConfig::default()).forecast(&frame).unwrap();
        let expected = rule(frame.latest().unwrap()) * 100.0;
        assert_abs_diff_eq!(bias.pct, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_direction_band() {
        let up = frame_with(|_| 0.002, 20);
        let bias = LinearForecaster::new(&MlConfig::default()).forecast(&up).unwrap();
        assert_abs_diff_eq!(bias.pct, 0.2, epsilon = 1e-6);
        assert_eq!(bias.direction, Bias::Bullish);

        let flat = frame_with(|_| 0.00005, 20);
        let bias = LinearForecaster::new(&MlConfig::default()).forecast(&flat).unwrap();
        assert_eq!(bias.direction, Bias::Neutral);

        let down = frame_with(|_| -0.003, 20);
        let bias = LinearForecaster::new(&MlConfig::default()).forecast(&down).unwrap();
        assert_eq!(bias.direction, Bias::Bearish);
    }

    #[test]
    fn test_needs_five_samples() {
        let frame = frame_with(|_| 0.001, 5);
        let err = LinearForecaster::new(&MlConfig::default()).forecast(&frame).unwrap_err();
        assert!(matches!(err, Error::InsufficientHistory { required: 5, available: 4, .. }));
        assert!(LinearForecaster::new(&MlConfig::default())
            .forecast(&frame_with(|_| 0.001, 6))
            .is_ok());
    }
}
