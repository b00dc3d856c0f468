//! Probability that the next session closes up, from an L2-penalized
//! logistic regression fitted by Newton iterations.

use nalgebra::{DMatrix, DVector};
use tradyx_core::config::MlConfig;
use tradyx_core::{ensure_history, Bias, Error, MarketProbability, Result};

use crate::forecaster::{supervised, Forecaster};
use crate::frame::{Feature, FeatureFrame};
use crate::linalg::{design_matrix, solve, Standardizer};

const FEATURES: [Feature; 4] = [
    Feature::Vix,
    Feature::VixChange,
    Feature::RealizedVol,
    Feature::Correlation,
];

const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-8;

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Fit coefficients (intercept first) minimizing log-loss plus
/// `penalty / 2 * |w|^2`, leaving the intercept unpenalized.
fn fit(design: &[Vec<f64>], labels: &[f64], penalty: f64) -> Result<DVector<f64>> {
    let x = design_matrix(design)?;
    let y = DVector::from_column_slice(labels);
    let p = x.ncols();
    let mut w = DVector::zeros(p);

    // Leave the intercept unpenalized, with a tiny jitter so its row stays
    // invertible when every probability saturates.
    let mut penalty_diag = DVector::from_element(p, penalty);
    penalty_diag[0] = 1e-10;
    let penalty_diag = DMatrix::from_diagonal(&penalty_diag);

    for _ in 0..MAX_ITERATIONS {
        let prob = (&x * &w).map(sigmoid);
        let curvature = prob.map(|q| q * (1.0 - q));
        let mut weighted = x.clone();
        for (i, c) in curvature.iter().enumerate() {
            weighted.row_mut(i).scale_mut(*c);
        }

        let mut penalized = w.clone();
        penalized[0] = 0.0;
        let grad = x.tr_mul(&(prob - &y)) + penalty * penalized;
        let hess = x.tr_mul(&weighted) + &penalty_diag;

        let step = solve(hess, grad)?;
        w -= &step;
        if step.amax() < TOLERANCE {
            break;
        }
    }

    if w.iter().any(|v| !v.is_finite()) {
        return Err(Error::degenerate("classifier diverged"));
    }
    Ok(w)
}

/// Binary classifier of the next return's sign.
#[derive(Debug, Clone)]
pub struct ClassifierForecaster {
    min_samples: usize,
    c: f64,
    bullish_above: f64,
    bearish_below: f64,
}

impl ClassifierForecaster {
    pub fn new(config: &MlConfig) -> Self {
        Self {
            min_samples: config.probability_min_samples,
            c: config.probability_c,
            bullish_above: config.probability_bullish,
            bearish_below: config.probability_bearish,
        }
    }
}

impl Forecaster for ClassifierForecaster {
    type Output = MarketProbability;

    fn name(&self) -> &'static str {
        "market_probability"
    }

    fn min_samples(&self) -> usize {
        self.min_samples
    }

    fn forecast(&self, frame: &FeatureFrame) -> Result<MarketProbability> {
        let (x, labels) = supervised(frame, &FEATURES, 1, |f, i| {
            if f.rows()[i + 1].ret > 0.0 {
                1.0
            } else {
                0.0
            }
        });
        ensure_history(self.name(), self.min_samples, x.len())?;
        let ups = labels.iter().filter(|&&y| y > 0.5).count();
        if ups == 0 || ups == labels.len() {
            return Err(Error::degenerate("direction classifier needs both classes"));
        }
        if self.c <= 0.0 {
            return Err(Error::config("ml.probability_c must be positive"));
        }
        let latest = frame.latest().ok_or_else(|| Error::degenerate("empty frame"))?;

        let scaler = Standardizer::fit(&x)?;
        let design: Vec<Vec<f64>> = x.iter().map(|row| scaler.design_row(row)).collect();
        let w = fit(&design, &labels, 1.0 / self.c)?;

        let last = DVector::from_vec(scaler.design_row(&latest.select(&FEATURES)));
        let pct = sigmoid(w.dot(&last)) * 100.0;
        Ok(MarketProbability {
            pct,
            regime: Bias::high_is_bullish(pct, self.bullish_above, self.bearish_below),
        })
    }
}
