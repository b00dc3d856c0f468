//! Configuration structures for the analytics engines.
//!
//! A [`Config`] is built once per run and handed to each engine constructor.
//! Engines never consult the process environment.

use serde::{Deserialize, Serialize};

/// Main configuration for a dashboard run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Option chain metrics configuration.
    pub chain: ChainConfig,
    /// Volatility indicator configuration.
    pub volatility: VolatilityConfig,
    /// Statistical forecast configuration.
    pub statistical: StatisticalConfig,
    /// Learned forecast configuration.
    pub ml: MlConfig,
    /// Drift / momentum configuration.
    pub momentum: MomentumConfig,
    /// Run pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no engine can run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.chain.top_n == 0 {
            return Err(crate::Error::config("chain.top_n must be positive"));
        }
        if self.chain.skew_iv_min >= self.chain.skew_iv_max {
            return Err(crate::Error::config("chain.skew_iv_min must be below skew_iv_max"));
        }
        if self.volatility.rv_window < 2 {
            return Err(crate::Error::config("volatility.rv_window must be at least 2"));
        }
        if self.momentum.ema_fast_span >= self.momentum.ema_slow_span {
            return Err(crate::Error::config("momentum.ema_fast_span must be below ema_slow_span"));
        }
        if self.ml.forest_trees == 0 {
            return Err(crate::Error::config("ml.forest_trees must be positive"));
        }
        Ok(())
    }
}

/// Option chain metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Legs reported per side in the OI leaderboard.
    pub top_n: usize,
    /// Strikes sampled (in chain order) for the gamma curve.
    pub gamma_sample_strikes: usize,
    /// Per-unit OI weight of the gamma approximation.
    pub gamma_oi_weight: f64,
    /// Distance from spot (fraction) beyond which proximity stops decaying.
    pub gamma_max_distance: f64,
    /// Entries with |gamma| at or below this are dropped.
    pub gamma_min_magnitude: f64,
    /// Below this many entries the gamma curve is synthesized.
    pub gamma_min_points: usize,
    /// Maximum gamma entries reported.
    pub gamma_cap: usize,
    /// Lowest plausible IV (percent) kept on the skew curve.
    pub skew_iv_min: f64,
    /// Highest plausible IV (percent) kept on the skew curve.
    pub skew_iv_max: f64,
    /// Below this many points the skew curve is synthesized.
    pub skew_min_points: usize,
    /// Maximum skew points reported.
    pub skew_cap: usize,
    /// Base IV (percent) of the synthetic skew curve.
    pub skew_synthetic_base_iv: f64,
    /// Traded volume a leg must exceed to be a whale.
    pub whale_min_volume: f64,
    /// |Change in OI| a leg must exceed to be a whale.
    pub whale_min_oi_change: f64,
    /// Below this many alerts synthetic alerts are generated.
    pub whale_min_alerts: usize,
    /// Maximum alerts reported.
    pub whale_cap: usize,
    /// VIX 52-week high multiplier used when the snapshot lacks one.
    pub vix_high_default_factor: f64,
    /// VIX 52-week low multiplier used when the snapshot lacks one.
    pub vix_low_default_factor: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            gamma_sample_strikes: 50,
            gamma_oi_weight: 0.01,
            gamma_max_distance: 0.1,
            gamma_min_magnitude: 50.0,
            gamma_min_points: 5,
            gamma_cap: 15,
            skew_iv_min: 5.0,
            skew_iv_max: 50.0,
            skew_min_points: 5,
            skew_cap: 15,
            skew_synthetic_base_iv: 15.0,
            whale_min_volume: 50_000.0,
            whale_min_oi_change: 25_000.0,
            whale_min_alerts: 3,
            whale_cap: 5,
            vix_high_default_factor: 1.5,
            vix_low_default_factor: 0.5,
        }
    }
}

/// Volatility indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Realized volatility window (sessions).
    pub rv_window: usize,
    /// Short Parkinson window (sessions).
    pub parkinson_short_window: usize,
    /// Long Parkinson window (sessions).
    pub parkinson_long_window: usize,
    /// VIX / underlying correlation window.
    pub correlation_window: usize,
    /// Minimum overlapping points for the correlation.
    pub correlation_min_points: usize,
    /// Trend consistency window.
    pub trend_window: usize,
    /// Return quantile position window.
    pub quantile_window: usize,
    /// Lag (sessions) of the VRP slope.
    pub vrp_lag: usize,
    /// Denominator guard of the VRP slope.
    pub vrp_epsilon: f64,
    /// Annualization factor (trading sessions per year).
    pub trading_days: f64,
    /// Volatility regime thresholds.
    pub regime: VolRegimeThresholds,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            rv_window: 20,
            parkinson_short_window: 20,
            parkinson_long_window: 60,
            correlation_window: 30,
            correlation_min_points: 10,
            trend_window: 20,
            quantile_window: 30,
            vrp_lag: 5,
            vrp_epsilon: 1e-6,
            trading_days: 252.0,
            regime: VolRegimeThresholds::default(),
        }
    }
}

/// Calm / Stress boundaries shared by the realized and forecast regimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolRegimeThresholds {
    /// VIX below this (with RV below `calm_rv`) is Calm.
    pub calm_vix: f64,
    /// RV below this (with VIX below `calm_vix`) is Calm.
    pub calm_rv: f64,
    /// VIX above this is Stress.
    pub stress_vix: f64,
    /// RV above this is Stress.
    pub stress_rv: f64,
}

impl Default for VolRegimeThresholds {
    fn default() -> Self {
        Self {
            calm_vix: 13.0,
            calm_rv: 15.0,
            stress_vix: 20.0,
            stress_rv: 25.0,
        }
    }
}

/// Statistical forecast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Minimum valid high/low pairs for Parkinson volatility.
    pub parkinson_min_pairs: usize,
    /// Parkinson volatility above this (percent) is Bearish.
    pub parkinson_bearish: f64,
    /// Parkinson volatility below this (percent) is Bullish.
    pub parkinson_bullish: f64,
    /// Expected move horizon in calendar days.
    pub expected_move_days: f64,
    /// VIX used when the snapshot has none.
    pub fallback_vix: f64,
    /// Expected move above this (percent of spot) is Bearish.
    pub expected_move_bearish_pct: f64,
    /// Expected move below this (percent of spot) is Bullish.
    pub expected_move_bullish_pct: f64,
    /// Minimum returns for quantile bands.
    pub quantile_min_points: usize,
    /// Recent returns averaged for the quantile regime.
    pub quantile_recent: usize,
    /// Sector regressed on the underlying for beta.
    pub beta_sector: String,
    /// Minimum paired observations for beta.
    pub beta_min_points: usize,
    /// Beta above this is Bearish (high sensitivity).
    pub beta_bearish: f64,
    /// Beta below this is Bullish (low sensitivity).
    pub beta_bullish: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            parkinson_min_pairs: 20,
            parkinson_bearish: 20.0,
            parkinson_bullish: 10.0,
            expected_move_days: 1.0,
            fallback_vix: 15.0,
            expected_move_bearish_pct: 1.0,
            expected_move_bullish_pct: 0.4,
            quantile_min_points: 30,
            quantile_recent: 5,
            beta_sector: "BANKNIFTY".to_string(),
            beta_min_points: 30,
            beta_bearish: 1.2,
            beta_bullish: 0.8,
        }
    }
}

/// Learned forecast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    /// Closes required before any model is attempted.
    pub min_closes: usize,
    /// Frame rows left after warm-up below which no model is attempted.
    pub min_frame_rows: usize,
    /// Upper bound of the adaptive realized-vol window.
    pub rv_window_max: usize,
    /// Lower bound of the adaptive realized-vol window.
    pub rv_window_min: usize,
    /// Upper bound of the adaptive correlation window.
    pub corr_window_max: usize,
    /// Lower bound of the adaptive correlation window.
    pub corr_window_min: usize,
    /// Minimum samples for the next-day bias regression.
    pub bias_min_samples: usize,
    /// |Bias| (percent) at or below this is Neutral.
    pub bias_neutral_band: f64,
    /// Minimum samples for the direction classifier.
    pub probability_min_samples: usize,
    /// Probability (percent) above this is Bullish.
    pub probability_bullish: f64,
    /// Probability (percent) below this is Bearish.
    pub probability_bearish: f64,
    /// L2 penalty inverse strength of the classifier.
    pub probability_c: f64,
    /// Minimum samples for the volatility forest.
    pub forest_min_samples: usize,
    /// Trees in the volatility forest.
    pub forest_trees: usize,
    /// Maximum tree depth.
    pub forest_max_depth: usize,
    /// Forecast horizon of the volatility forest (sessions).
    pub forest_horizon: usize,
    /// Forest forecast above this is Stress.
    pub forest_stress: f64,
    /// Forest forecast below this is Calm.
    pub forest_calm: f64,
    /// Minimum samples for the range quantile regressions.
    pub range_min_samples: usize,
    /// Forecast horizon of the range regressions (sessions).
    pub range_horizon: usize,
    /// Lower quantile of the range.
    pub range_lower_q: f64,
    /// Upper quantile of the range.
    pub range_upper_q: f64,
    /// Range bound (percent) beyond which the regime leaves Neutral.
    pub range_regime_pct: f64,
    /// Frame rows required by the sequence model.
    pub sequence_min_rows: usize,
    /// Training windows required by the sequence model.
    pub sequence_min_windows: usize,
    /// Window length of the sequence model.
    pub sequence_length: usize,
    /// Forecast horizon of the sequence model (sessions).
    pub sequence_horizon: usize,
    /// Hidden units of the recurrent layer.
    pub sequence_hidden: usize,
    /// Training epochs of the sequence model.
    pub sequence_epochs: usize,
    /// Learning rate of the sequence model.
    pub sequence_learning_rate: f64,
    /// Seed shared by every stochastic model.
    pub seed: u64,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            min_closes: 30,
            min_frame_rows: 10,
            rv_window_max: 20,
            rv_window_min: 10,
            corr_window_max: 30,
            corr_window_min: 15,
            bias_min_samples: 5,
            bias_neutral_band: 0.01,
            probability_min_samples: 5,
            probability_bullish: 60.0,
            probability_bearish: 40.0,
            probability_c: 1.0,
            forest_min_samples: 10,
            forest_trees: 50,
            forest_max_depth: 5,
            forest_horizon: 3,
            forest_stress: 20.0,
            forest_calm: 12.0,
            range_min_samples: 15,
            range_horizon: 5,
            range_lower_q: 0.05,
            range_upper_q: 0.95,
            range_regime_pct: 1.5,
            sequence_min_rows: 40,
            sequence_min_windows: 10,
            sequence_length: 30,
            sequence_horizon: 3,
            sequence_hidden: 16,
            sequence_epochs: 25,
            sequence_learning_rate: 0.01,
            seed: 42,
        }
    }
}

/// Drift / momentum configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Fast EMA span.
    pub ema_fast_span: usize,
    /// Slow EMA span (also the minimum closes for drift).
    pub ema_slow_span: usize,
    /// Trading sessions per month.
    pub days_per_month: usize,
    /// Minimum closes for momentum strength.
    pub momentum_min_closes: usize,
    /// Raw momentum mapped to 0 on the scaled axis is `-scale_half_range`.
    pub scale_half_range: f64,
    /// Annualization factor (trading sessions per year).
    pub trading_days: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            ema_fast_span: 20,
            ema_slow_span: 50,
            days_per_month: 21,
            momentum_min_closes: 30,
            scale_half_range: 2.0,
            trading_days: 252.0,
        }
    }
}

/// Run pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the leaf engines one after another even when built with `parallel`.
    pub force_sequential: bool,
}
