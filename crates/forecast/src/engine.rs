//! Runs the five learned forecasters over one feature frame.

use tracing::info;
use tradyx_core::config::MlConfig;
use tradyx_core::{round_dp, Config, MarketSeries, MlForecastSet};
use tradyx_features::degrade;

use crate::forecaster::Forecaster;
use crate::forest::EnsembleForecaster;
use crate::frame::FeatureFrame;
use crate::logistic::ClassifierForecaster;
use crate::ols::LinearForecaster;
use crate::quantile::QuantileForecaster;
use crate::sequence::SequenceForecaster;

fn run<F: Forecaster>(model: &F, frame: &FeatureFrame) -> Option<F::Output> {
    degrade(model.name(), model.forecast(frame))
}

/// Computes the [`MlForecastSet`]. Every model is trained fresh per call.
pub struct MlForecastEngine {
    config: MlConfig,
    trading_days: f64,
    linear: LinearForecaster,
    classifier: ClassifierForecaster,
    ensemble: EnsembleForecaster,
    quantile: QuantileForecaster,
    sequence: SequenceForecaster,
}

impl MlForecastEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &Config) -> Self {
        let ml = &config.ml;
        let trading_days = config.volatility.trading_days;
        Self {
            config: ml.clone(),
            trading_days,
            linear: LinearForecaster::new(ml),
            classifier: ClassifierForecaster::new(ml),
            ensemble: EnsembleForecaster::new(ml, trading_days),
            quantile: QuantileForecaster::new(ml),
            sequence: SequenceForecaster::new(ml, &config.volatility.regime),
        }
    }

    /// Build the frame from the close and VIX series and run every model.
    pub fn compute(&self, series: &MarketSeries) -> MlForecastSet {
        let frame = degrade(
            "feature_frame",
            FeatureFrame::build(&series.closes(), series.vix(), &self.config, self.trading_days),
        );
        let Some(frame) = frame else {
            return MlForecastSet::default();
        };
        self.compute_frame(&frame)
    }

    /// Run every model over an already built frame.
    pub fn compute_frame(&self, frame: &FeatureFrame) -> MlForecastSet {
        let set = MlForecastSet {
            next_day_bias: run(&self.linear, frame).map(|mut b| {
                b.pct = round_dp(b.pct, 2);
                b
            }),
            market_probability: run(&self.classifier, frame).map(|mut p| {
                p.pct = round_dp(p.pct, 1);
                p
            }),
            volatility_forecast: run(&self.ensemble, frame).map(|mut v| {
                v.value = round_dp(v.value, 2);
                v
            }),
            predicted_range: run(&self.quantile, frame).map(|mut r| {
                r.upper_pct = round_dp(r.upper_pct, 2);
                r.lower_pct = round_dp(r.lower_pct, 2);
                r
            }),
            volatility_regime_forecast: run(&self.sequence, frame).map(|mut v| {
                v.vix = round_dp(v.vix, 2);
                v
            }),
        };

        let populated = [
            set.next_day_bias.is_some(),
            set.market_probability.is_some(),
            set.volatility_forecast.is_some(),
            set.predicted_range.is_some(),
            set.volatility_regime_forecast.is_some(),
        ]
        .iter()
        .filter(|&&p| p)
        .count();
        info!(rows = frame.len(), populated, "Learned forecasts computed");
        set
    }
}
