//! Bagged regression trees forecasting short-horizon realized volatility.
//!
//! # Tree Growth
//!
//! - Each tree is grown on a bootstrap sample drawn from a seeded RNG
//! - A node splits on the feature/threshold pair with the lowest summed squared
//!   error of its children, thresholds sitting midway between distinct values
//! - Growth stops at `max_depth`, at single-sample nodes, or when no split
//!   reduces the error
//!
//! # Traversal
//!
//! `row[feature] <= threshold` goes left, anything else goes right. The
//! forest prediction is the mean over trees.

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tradyx_core::config::MlConfig;
use tradyx_core::{ensure_history, Error, Result, VolRegime, VolatilityForecast};
use tradyx_features::stats::{annualize_pct, sample_std};

use crate::forecaster::{supervised, Forecaster};
use crate::frame::{Feature, FeatureFrame};

const FEATURES: [Feature; 4] = [
    Feature::Vix,
    Feature::RealizedVol,
    Feature::VixChange,
    Feature::Correlation,
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    sse: f64,
}

/// A regression tree in pre-order, root at index 0.
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, max_depth: usize) -> Self {
        let mut nodes = Vec::new();
        grow(&mut nodes, x, y, sample, 0, max_depth);
        Self { nodes }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

fn sum_sq(y: &[f64], idx: &[usize]) -> (f64, f64) {
    idx.iter()
        .fold((0.0, 0.0), |(s, q), &i| (s + y[i], q + y[i] * y[i]))
}

fn sse(sum: f64, sq: f64, n: usize) -> f64 {
    sq - sum * sum / n as f64
}

fn grow(
    nodes: &mut Vec<TreeNode>,
    x: &[Vec<f64>],
    y: &[f64],
    idx: Vec<usize>,
    depth: usize,
    max_depth: usize,
) -> usize {
    let id = nodes.len();
    let (sum, sq) = sum_sq(y, &idx);
    nodes.push(TreeNode::Leaf {
        value: sum / idx.len() as f64,
    });
    if depth >= max_depth || idx.len() < 2 {
        return id;
    }
    let Some(split) = best_split(x, y, &idx) else {
        return id;
    };
    if split.sse >= sse(sum, sq, idx.len()) - 1e-12 {
        return id;
    }

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
        .into_iter()
        .partition(|&i| x[i][split.feature] <= split.threshold);
    let left = grow(nodes, x, y, left_idx, depth + 1, max_depth);
    let right = grow(nodes, x, y, right_idx, depth + 1, max_depth);
    nodes[id] = TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    id
}

fn best_split(x: &[Vec<f64>], y: &[f64], idx: &[usize]) -> Option<Split> {
    let n = idx.len();
    let (total, total_sq) = sum_sq(y, idx);
    let features = x.first().map(Vec::len).unwrap_or(0);
    let mut best: Option<Split> = None;

    for feature in 0..features {
        let mut order = idx.to_vec();
        order.sort_by_key(|&i| OrderedFloat(x[i][feature]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];
            let (lo, hi) = (x[prev][feature], x[order[k]][feature]);
            if lo >= hi {
                continue;
            }
            let candidate = sse(left_sum, left_sq, k)
                + sse(total - left_sum, total_sq - left_sq, n - k);
            if best.map_or(true, |b| candidate < b.sse) {
                best = Some(Split {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    sse: candidate,
                });
            }
        }
    }
    best
}

/// Seeded bootstrap ensemble of regression trees.
#[derive(Debug, Clone)]
struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    fn fit(x: &[Vec<f64>], y: &[f64], n_trees: usize, max_depth: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = y.len();
        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, max_depth)
            })
            .collect();
        Self { trees }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// Forecasts realized volatility over the next `horizon` sessions.
#[derive(Debug, Clone)]
pub struct EnsembleForecaster {
    min_samples: usize,
    n_trees: usize,
    max_depth: usize,
    horizon: usize,
    seed: u64,
    stress_above: f64,
    calm_below: f64,
    trading_days: f64,
}

impl EnsembleForecaster {
    pub fn new(config: &MlConfig, trading_days: f64) -> Self {
        Self {
            min_samples: config.forest_min_samples,
            n_trees: config.forest_trees,
            max_depth: config.forest_max_depth,
            horizon: config.forest_horizon,
            seed: config.seed,
            stress_above: config.forest_stress,
            calm_below: config.forest_calm,
            trading_days,
        }
    }

    /// Annualized sample volatility of the returns in rows `i+1..=i+horizon`.
    fn target(&self, frame: &FeatureFrame, i: usize) -> f64 {
        let returns: Vec<f64> = frame.rows()[i + 1..=i + self.horizon]
            .iter()
            .map(|r| r.ret)
            .collect();
        sample_std(&returns)
            .map(|std| annualize_pct(std, self.trading_days))
            .unwrap_or(f64::NAN)
    }
}

impl Forecaster for EnsembleForecaster {
    type Output = VolatilityForecast;

    fn name(&self) -> &'static str {
        "volatility_forecast"
    }

    fn min_samples(&self) -> usize {
        self.min_samples
    }

    fn forecast(&self, frame: &FeatureFrame) -> Result<VolatilityForecast> {
        if self.horizon < 2 || self.n_trees == 0 {
            return Err(Error::config("forest needs horizon >= 2 and at least one tree"));
        }
        let (x, y) = supervised(frame, &FEATURES, self.horizon, |f, i| self.target(f, i));
        ensure_history(self.name(), self.min_samples, x.len())?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::degenerate("non-finite volatility target"));
        }
        let latest = frame.latest().ok_or_else(|| Error::degenerate("empty frame"))?;

        let forest = RandomForest::fit(&x, &y, self.n_trees, self.max_depth, self.seed);
        let value = forest.predict(&latest.select(&FEATURES));
        Ok(VolatilityForecast {
            value,
            regime: VolRegime::from_level(value, self.calm_below, self.stress_above),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRow;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_tree_learns_step() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        let tree = RegressionTree::fit(&x, &y, (0..20).collect(), 1);
        assert_eq!(tree.nodes.len(), 3);
        assert!(matches!(
            tree.nodes[0],
            TreeNode::Split { feature: 0, threshold, .. } if threshold == 9.5
        ));
        assert_eq!(tree.predict(&[3.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[15.0, 0.0]), 5.0);
    }

    #[test]
    fn test_constant_target_is_a_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let tree = RegressionTree::fit(&x, &[2.5; 10], (0..10).collect(), 5);
        assert_eq!(tree.nodes, vec![TreeNode::Leaf { value: 2.5 }]);
    }

    fn frame(n: usize) -> FeatureFrame {
        FeatureFrame::from_rows(
            (0..n)
                .map(|i| {
                    let t = i as f64;
                    FrameRow {
                        vix: 14.0 + (t * 0.3).sin() * 4.0,
                        vix_change: (t * 0.8).cos(),
                        realized_vol: 12.0 + (t * 0.2).sin() * 3.0,
                        correlation: -0.3,
                        ret: (if i % 2 == 0 { 0.01 } else { -0.01 }) * (1.0 + (t * 0.3).sin() * 0.5),
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_forecast_deterministic_and_bounded() {
        let cfg = MlConfig::default();
        let forecaster = EnsembleForecaster::new(&cfg, 252.0);
        let frame = frame(50);
        let a = forecaster.forecast(&frame).unwrap();
        let b = forecaster.forecast(&frame).unwrap();
        assert_eq!(a, b);

        let targets: Vec<f64> = (0..47).map(|i| forecaster.target(&frame, i)).collect();
        let lo = targets.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = targets.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(a.value >= lo - 1e-9 && a.value <= hi + 1e-9);
    }

    #[test]
    fn test_target_window() {
        let forecaster = EnsembleForecaster::new(&MlConfig::default(), 252.0);
        let frame = frame(10);
        let rets: Vec<f64> = frame.rows()[1..=3].iter().map(|r| r.ret).collect();
        let expected = sample_std(&rets).unwrap() * 252f64.sqrt() * 100.0;
        assert_abs_diff_eq!(forecaster.target(&frame, 0), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_forecast_needs_ten_samples() {
        let forecaster = EnsembleForecaster::new(&MlConfig::default(), 252.0);
        let err = forecaster.forecast(&frame(12)).unwrap_err();
        assert!(matches!(err, Error::InsufficientHistory { required: 10, available: 9, .. }));
        assert!(forecaster.forecast(&frame(13)).is_ok());
    }

    #[test]
    fn test_regime_thresholds() {
        let cfg = MlConfig::default();
        assert_eq!(VolRegime::from_level(25.0, cfg.forest_calm, cfg.forest_stress), VolRegime::Stress);
        assert_eq!(VolRegime::from_level(10.0, cfg.forest_calm, cfg.forest_stress), VolRegime::Calm);
        assert_eq!(VolRegime::from_level(15.0, cfg.forest_calm, cfg.forest_stress), VolRegime::Normal);
    }
}
