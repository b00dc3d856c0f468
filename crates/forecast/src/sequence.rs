//! VIX level `horizon` sessions ahead from a recurrent model over fixed-length
//! windows of the frame, mapped onto the volatility regime.

use tradyx_core::config::{MlConfig, VolRegimeThresholds};
use tradyx_core::{Result, VolatilityRegimeForecast};

use crate::forecaster::Forecaster;
#[cfg(feature = "sequence")]
use crate::frame::Feature;
use crate::frame::FeatureFrame;

#[cfg(feature = "sequence")]
const FEATURES: [Feature; 3] = [Feature::Vix, Feature::RealizedVol, Feature::VixChange];

#[cfg(feature = "sequence")]
const DENSE_UNITS: usize = 8;
#[cfg(feature = "sequence")]
const BATCH_SIZE: usize = 4;

/// Recurrent volatility-regime forecaster.
///
/// Only available with the `sequence` cargo feature; otherwise every call
/// reports [`tradyx_core::Error::CapabilityUnavailable`].
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "sequence"), allow(dead_code))]
pub struct SequenceForecaster {
    min_rows: usize,
    min_windows: usize,
    length: usize,
    horizon: usize,
    hidden: usize,
    epochs: usize,
    learning_rate: f64,
    seed: u64,
    calm_below: f64,
    stress_above: f64,
}

impl SequenceForecaster {
    pub fn new(config: &MlConfig, regime: &VolRegimeThresholds) -> Self {
        Self {
            min_rows: config.sequence_min_rows,
            min_windows: config.sequence_min_windows,
            length: config.sequence_length,
            horizon: config.sequence_horizon,
            hidden: config.sequence_hidden,
            epochs: config.sequence_epochs,
            learning_rate: config.sequence_learning_rate,
            seed: config.seed,
            calm_below: regime.calm_vix,
            stress_above: regime.stress_vix,
        }
    }

    #[cfg(not(feature = "sequence"))]
    fn fit_predict(&self, _frame: &FeatureFrame) -> Result<VolatilityRegimeForecast> {
        Err(tradyx_core::Error::CapabilityUnavailable("sequence"))
    }

    #[cfg(feature = "sequence")]
    fn fit_predict(&self, frame: &FeatureFrame) -> Result<VolatilityRegimeForecast> {
        use crate::rnn::{Rnn, RnnSpec};
        use tradyx_core::{ensure_history, Error, VolRegime};

        let n = frame.len();
        ensure_history(self.name(), self.min_rows.max(self.length), n)?;
        if self.length == 0 || self.horizon == 0 {
            return Err(Error::config("sequence length and horizon must be positive"));
        }

        let raw = frame.matrix(&FEATURES, n);
        let scalers: Vec<MinMax> = (0..FEATURES.len())
            .map(|j| MinMax::fit(raw.iter().map(|row| row[j])))
            .collect();
        let scaled: Vec<Vec<f64>> = raw
            .iter()
            .map(|row| row.iter().zip(&scalers).map(|(v, s)| s.transform(*v)).collect())
            .collect();

        // Window `start..start + length` is labelled with the VIX `horizon`
        // sessions after its last row.
        let vix = frame.column(Feature::Vix);
        let starts = 0..(n + 1).saturating_sub(self.length + self.horizon);
        ensure_history("sequence_windows", self.min_windows, starts.len())?;
        let windows: Vec<Vec<Vec<f64>>> = starts
            .clone()
            .map(|s| scaled[s..s + self.length].to_vec())
            .collect();
        let targets: Vec<f64> = starts
            .map(|s| vix[s + self.length - 1 + self.horizon])
            .collect();
        let target_scaler = MinMax::fit(targets.iter().copied());
        let scaled_targets: Vec<f64> = targets.iter().map(|v| target_scaler.transform(*v)).collect();

        let spec = RnnSpec {
            input: FEATURES.len(),
            hidden: self.hidden,
            dense: DENSE_UNITS,
            epochs: self.epochs,
            batch_size: BATCH_SIZE,
            learning_rate: self.learning_rate,
            seed: self.seed,
        };
        let net = Rnn::train(&spec, &windows, &scaled_targets);
        let vix_forecast = target_scaler.inverse(net.predict(&scaled[n - self.length..]));
        if !vix_forecast.is_finite() {
            return Err(Error::degenerate("sequence model produced a non-finite forecast"));
        }
        Ok(VolatilityRegimeForecast {
            vix: vix_forecast,
            regime: VolRegime::from_level(vix_forecast, self.calm_below, self.stress_above),
        })
    }
}

impl Forecaster for SequenceForecaster {
    type Output = VolatilityRegimeForecast;

    fn name(&self) -> &'static str {
        "volatility_regime_forecast"
    }

    fn min_samples(&self) -> usize {
        self.min_windows
    }

    fn forecast(&self, frame: &FeatureFrame) -> Result<VolatilityRegimeForecast> {
        self.fit_predict(frame)
    }
}

/// Min-max scaling onto `[0, 1]`; a constant column keeps a unit span.
#[cfg(feature = "sequence")]
#[derive(Debug, Clone, Copy, PartialEq)]
struct MinMax {
    lo: f64,
    span: f64,
}

#[cfg(feature = "sequence")]
impl MinMax {
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let span = hi - lo;
        Self {
            lo,
            span: if span > 0.0 && span.is_finite() { span } else { 1.0 },
        }
    }

    fn transform(&self, value: f64) -> f64 {
        (value - self.lo) / self.span
    }

    fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.span + self.lo
    }
}
