//! Core data types for the tradyx analytics engines.
//!
//! Input snapshots ([`OptionChainSnapshot`], [`MarketSeries`], [`SpotSnapshot`])
//! are immutable value objects shared read-only by every engine. Engine outputs
//! are plain serde structs whose field names match the dashboard wire format.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};

/// Round to `dp` decimal places for display.
#[inline]
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

// ============================================================================
// Option chain
// ============================================================================

/// One side (call or put) of a strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLeg {
    #[serde(rename = "openInterest")]
    pub open_interest: f64,
    #[serde(rename = "changeinOpenInterest")]
    pub change_in_oi: f64,
    #[serde(rename = "impliedVolatility")]
    pub implied_volatility: f64,
    #[serde(rename = "lastPrice")]
    pub last_price: f64,
    #[serde(rename = "totalTradedVolume")]
    pub traded_volume: f64,
}

impl OptionLeg {
    /// Change in OI as a percentage of current OI.
    #[inline]
    pub fn oi_change_pct(&self) -> f64 {
        if self.open_interest > 0.0 {
            self.change_in_oi / self.open_interest.max(1.0) * 100.0
        } else {
            0.0
        }
    }
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

/// All legs quoted at one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    #[serde(rename = "strikePrice")]
    pub strike: f64,
    #[serde(rename = "CE", default, skip_serializing_if = "Option::is_none")]
    pub call: Option<OptionLeg>,
    #[serde(rename = "PE", default, skip_serializing_if = "Option::is_none")]
    pub put: Option<OptionLeg>,
}

impl StrikeRecord {
    /// Get the leg for a side.
    #[inline]
    pub fn leg(&self, side: OptionSide) -> Option<&OptionLeg> {
        match side {
            OptionSide::Call => self.call.as_ref(),
            OptionSide::Put => self.put.as_ref(),
        }
    }
}

/// Point-in-time option chain.
///
/// Strikes are unique and ascending. The `underlying` value is advisory only;
/// engines take spot from the market-data snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChainSnapshot {
    records: Vec<StrikeRecord>,
    /// Exchange-local time of the snapshot.
    pub timestamp: NaiveDateTime,
    /// Underlying value quoted alongside the chain.
    pub underlying: Option<f64>,
}

impl OptionChainSnapshot {
    /// Build a snapshot, ordering by strike and keeping the first record of any duplicate strike.
    pub fn new(
        mut records: Vec<StrikeRecord>,
        timestamp: NaiveDateTime,
        underlying: Option<f64>,
    ) -> Self {
        records.retain(|r| r.strike.is_finite());
        records.sort_by_key(|r| OrderedFloat(r.strike));
        records.dedup_by(|later, earlier| later.strike == earlier.strike);
        Self {
            records,
            timestamp,
            underlying,
        }
    }

    /// Strike records in ascending strike order.
    pub fn records(&self) -> &[StrikeRecord] {
        &self.records
    }

    /// Strikes in ascending order.
    pub fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.strike)
    }

    /// Find the record at a strike.
    pub fn record_at(&self, strike: f64) -> Option<&StrikeRecord> {
        self.records
            .binary_search_by_key(&OrderedFloat(strike), |r| OrderedFloat(r.strike))
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// Market series
// ============================================================================

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Close and return series of one sector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorSeries {
    pub close: Vec<f64>,
    /// Percentage returns.
    pub returns: Vec<f64>,
    pub current: Option<f64>,
}

/// Percentage change between consecutive values; a non-positive base yields 0.
pub fn pct_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0] * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Chronological bars of the primary underlying plus aligned VIX and sector series.
///
/// Invariant: `returns().len() == bars().len() - 1` (or 0 when there are no bars).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSeries {
    bars: Vec<OhlcBar>,
    vix: Vec<f64>,
    returns: Vec<f64>,
    sectors: BTreeMap<String, SectorSeries>,
}

impl MarketSeries {
    /// Build a series, deriving percentage returns from the closes.
    pub fn new(bars: Vec<OhlcBar>, vix: Vec<f64>, sectors: BTreeMap<String, SectorSeries>) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let returns = pct_returns(&closes);
        Self {
            bars,
            vix,
            returns,
            sectors,
        }
    }

    /// Build a series with a supplied return series, which must be first-differenced.
    pub fn with_returns(
        bars: Vec<OhlcBar>,
        vix: Vec<f64>,
        returns: Vec<f64>,
        sectors: BTreeMap<String, SectorSeries>,
    ) -> crate::Result<Self> {
        let expected = bars.len().saturating_sub(1);
        if returns.len() != expected {
            return Err(crate::Error::data(format!(
                "return series has {} points, expected {} for {} bars",
                returns.len(),
                expected,
                bars.len()
            )));
        }
        Ok(Self {
            bars,
            vix,
            returns,
            sectors,
        })
    }

    pub fn bars(&self) -> &[OhlcBar] {
        &self.bars
    }

    /// VIX closes, chronologically.
    pub fn vix(&self) -> &[f64] {
        &self.vix
    }

    /// Percentage returns of the underlying.
    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn sectors(&self) -> &BTreeMap<String, SectorSeries> {
        &self.sectors
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Latest close.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

// ============================================================================
// Spot / VIX snapshot
// ============================================================================

/// Latest daily VIX bar plus the previous close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VixOhlc {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub previous_close: Option<f64>,
}

/// Authoritative spot / VIX snapshot from the market-data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpotSnapshot {
    pub spot: Option<f64>,
    pub vix: Option<f64>,
    /// Short intraday spot series.
    pub spot_series: Vec<f64>,
    /// Short intraday VIX series.
    pub vix_series: Vec<f64>,
    /// One year of daily VIX closes.
    pub vix_daily: Vec<f64>,
    #[serde(rename = "vix52wHigh")]
    pub vix_52w_high: Option<f64>,
    #[serde(rename = "vix52wLow")]
    pub vix_52w_low: Option<f64>,
    pub vix_ohlc: Option<VixOhlc>,
}

// ============================================================================
// Regimes and provenance
// ============================================================================

/// Directional regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Neutral,
    Bearish,
}

impl Bias {
    /// High values are Bearish, low values Bullish.
    pub fn high_is_bearish(value: f64, bearish_above: f64, bullish_below: f64) -> Self {
        if value > bearish_above {
            Bias::Bearish
        } else if value < bullish_below {
            Bias::Bullish
        } else {
            Bias::Neutral
        }
    }

    /// High values are Bullish, low values Bearish.
    pub fn high_is_bullish(value: f64, bullish_above: f64, bearish_below: f64) -> Self {
        if value > bullish_above {
            Bias::Bullish
        } else if value < bearish_below {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }

    /// Sign of a value, with zero as Neutral.
    pub fn from_sign(value: f64) -> Self {
        Self::high_is_bullish(value, 0.0, 0.0)
    }
}

/// Volatility regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolRegime {
    Calm,
    Normal,
    Stress,
}

impl VolRegime {
    /// Classify from implied (VIX) and realized volatility.
    pub fn classify(vix: f64, rv: f64, t: &crate::config::VolRegimeThresholds) -> Self {
        if vix < t.calm_vix && rv < t.calm_rv {
            VolRegime::Calm
        } else if vix > t.stress_vix || rv > t.stress_rv {
            VolRegime::Stress
        } else {
            VolRegime::Normal
        }
    }

    /// Classify a single volatility level.
    pub fn from_level(value: f64, calm_below: f64, stress_above: f64) -> Self {
        if value > stress_above {
            VolRegime::Stress
        } else if value < calm_below {
            VolRegime::Calm
        } else {
            VolRegime::Normal
        }
    }
}

/// Whether a field holds measured data or a synthetic placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    #[default]
    Measured,
    Synthetic,
}

/// A value tagged with its provenance. Serializes as the bare value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Sourced<T> {
    pub fn measured(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Measured,
        }
    }

    pub fn synthetic(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Synthetic,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }
}

impl<T: Serialize> Serialize for Sourced<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

// ============================================================================
// Chain metrics
// ============================================================================

/// A leg on the OI leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OiLeg {
    pub strike: f64,
    pub oi: f64,
    /// Change in OI as a percentage of OI.
    pub change: f64,
}

/// Top-N legs by open interest per side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OiLeaders {
    pub calls_top: Vec<OiLeg>,
    pub puts_top: Vec<OiLeg>,
}

/// ATM straddle cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Straddle {
    pub call: f64,
    pub put: f64,
    pub total: f64,
    pub exp_move_pts: f64,
}

/// One point of the gamma exposure curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GammaPoint {
    pub strike: f64,
    pub gamma: f64,
    pub label: String,
}

/// One point of the IV skew curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkewPoint {
    pub strike: f64,
    /// Implied volatility in percent.
    pub iv: f64,
}

/// Whale direction inferred from the change in OI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WhaleAction {
    Buy,
    Sell,
}

/// Large traded-volume leg with a large OI change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhaleAlert {
    /// `HH:MM:SS`.
    pub time: String,
    pub strike: f64,
    #[serde(rename = "type")]
    pub side: OptionSide,
    pub volume: f64,
    pub premium: f64,
    pub action: WhaleAction,
}

/// Positioning and liquidity indicators from one option chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetrics {
    pub pcr: Option<f64>,
    pub max_pain: Option<f64>,
    pub atm_strike: Option<f64>,
    pub oi: OiLeaders,
    pub straddle: Option<Straddle>,
    pub gamma_exposure: Sourced<Vec<GammaPoint>>,
    pub iv_skew: Sourced<Vec<SkewPoint>>,
    pub whale_alerts: Sourced<Vec<WhaleAlert>>,
    pub iv_rank: Option<f64>,
    pub magnet_pct: Option<f64>,
    pub oi_momentum: Option<f64>,
}

impl ChainMetrics {
    /// Wire names of fields filled by a synthetic fallback.
    pub fn synthetic_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.gamma_exposure.is_synthetic() {
            fields.push("gammaExposure");
        }
        if self.iv_skew.is_synthetic() {
            fields.push("ivSkew");
        }
        if self.whale_alerts.is_synthetic() {
            fields.push("whaleAlerts");
        }
        fields
    }
}

// ============================================================================
// Volatility indicators
// ============================================================================

/// Twelve volatility indicators, each independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityIndicatorSet {
    pub realized_vol: Option<f64>,
    pub hv_iv_spread: Option<f64>,
    pub volatility_ratio: Option<f64>,
    #[serde(rename = "parkinsonVol20d")]
    pub parkinson_vol_20d: Option<f64>,
    #[serde(rename = "parkinsonVol60d")]
    pub parkinson_vol_60d: Option<f64>,
    #[serde(rename = "expectedMove1Day")]
    pub expected_move_1day: Option<f64>,
    #[serde(rename = "vixNiftyCorrelation")]
    pub vix_correlation: Option<f64>,
    pub trend_consistency_index: Option<f64>,
    pub return_quantile_position: Option<f64>,
    pub volatility_regime: Option<VolRegime>,
    pub range_compression_index: Option<f64>,
    pub volatility_risk_premium: Option<f64>,
    pub vrp_slope: Option<f64>,
}

// ============================================================================
// Statistical forecasts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkinsonForecast {
    #[serde(rename = "parkinsonVol")]
    pub value: f64,
    #[serde(rename = "parkinsonRegime")]
    pub regime: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedMove {
    #[serde(rename = "expectedMove")]
    pub points: f64,
    #[serde(rename = "expectedMovePct")]
    pub pct: f64,
    #[serde(rename = "expectedMoveRegime")]
    pub regime: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileBands {
    #[serde(rename = "quantileLower")]
    pub q05: f64,
    #[serde(rename = "quantileQ25")]
    pub q25: f64,
    #[serde(rename = "quantileMedian")]
    pub q50: f64,
    #[serde(rename = "quantileQ75")]
    pub q75: f64,
    #[serde(rename = "quantileUpper")]
    pub q95: f64,
    #[serde(rename = "quantileRegime")]
    pub regime: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossAssetBeta {
    #[serde(rename = "mlBeta")]
    pub beta: f64,
    #[serde(rename = "mlBetaAlpha")]
    pub alpha: f64,
    #[serde(rename = "mlBetaRSquared")]
    pub r_squared: f64,
    #[serde(rename = "betaRegime")]
    pub regime: Bias,
}

/// Statistical forecasts, flattened on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastSet {
    #[serde(flatten)]
    pub parkinson: Option<ParkinsonForecast>,
    #[serde(flatten)]
    pub expected_move: Option<ExpectedMove>,
    #[serde(flatten)]
    pub quantiles: Option<QuantileBands>,
    #[serde(flatten)]
    pub beta: Option<CrossAssetBeta>,
}

// ============================================================================
// Learned forecasts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDayBias {
    /// Predicted next-session log return, in percent.
    #[serde(rename = "nextDayBias")]
    pub pct: f64,
    #[serde(rename = "nextDayBiasDirection")]
    pub direction: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketProbability {
    /// Probability (percent) that the next return is positive.
    #[serde(rename = "marketProbability")]
    pub pct: f64,
    #[serde(rename = "marketProbabilityRegime")]
    pub regime: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityForecast {
    #[serde(rename = "volatilityForecast")]
    pub value: f64,
    #[serde(rename = "volatilityForecastRegime")]
    pub regime: VolRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedRange {
    #[serde(rename = "predictedRangeUpper")]
    pub upper_pct: f64,
    #[serde(rename = "predictedRangeLower")]
    pub lower_pct: f64,
    #[serde(rename = "predictedRangeRegime")]
    pub regime: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityRegimeForecast {
    /// Forecast VIX level.
    #[serde(rename = "volatilityRegimeForecast")]
    pub vix: f64,
    #[serde(rename = "volatilityRegimeForecastCategory")]
    pub regime: VolRegime,
}

/// Learned forecasts, flattened on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MlForecastSet {
    #[serde(flatten)]
    pub next_day_bias: Option<NextDayBias>,
    #[serde(flatten)]
    pub market_probability: Option<MarketProbability>,
    #[serde(flatten)]
    pub volatility_forecast: Option<VolatilityForecast>,
    #[serde(flatten)]
    pub predicted_range: Option<PredictedRange>,
    #[serde(flatten)]
    pub volatility_regime_forecast: Option<VolatilityRegimeForecast>,
}

// ============================================================================
// Breadth / momentum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumStrength {
    pub raw: f64,
    /// Raw strength mapped onto 0..=100.
    pub scaled: f64,
}

/// Drift direction and momentum strength.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreadthMomentum {
    /// EMA(fast) - EMA(slow) of closes.
    pub drift_direction: Option<f64>,
    pub momentum_strength: Option<MomentumStrength>,
}

impl BreadthMomentum {
    /// Consumer-side label of the drift.
    pub fn drift_label(&self) -> Option<Bias> {
        self.drift_direction.map(Bias::from_sign)
    }
}
