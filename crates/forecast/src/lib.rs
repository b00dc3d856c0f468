//! Learned forecasts for the tradyx analytics pipeline.
//!
//! Every model implements [`Forecaster`], is trained fresh on the current
//! run's [`FeatureFrame`] and predicts from its latest row:
//! - [`LinearForecaster`]: next-session bias (least squares)
//! - [`ClassifierForecaster`]: probability of an up session (logistic)
//! - [`EnsembleForecaster`]: short-horizon realized volatility (bagged trees)
//! - [`QuantileForecaster`]: predicted return range (quantile regression)
//! - [`SequenceForecaster`]: VIX regime (recurrent network, `sequence` feature)

pub mod engine;
pub mod forecaster;
pub mod forest;
pub mod frame;
pub mod linalg;
pub mod logistic;
pub mod ols;
pub mod quantile;
#[cfg(feature = "sequence")]
mod rnn;
pub mod sequence;

pub use engine::MlForecastEngine;
pub use forecaster::Forecaster;
pub use forest::EnsembleForecaster;
pub use frame::{Feature, FeatureFrame, FrameRow};
pub use logistic::ClassifierForecaster;
pub use ols::LinearForecaster;
pub use quantile::QuantileForecaster;
pub use sequence::SequenceForecaster;
