//! Dashboard assembler.
//!
//! Merges the five engine outputs and the raw spot/VIX snapshot into one
//! [`DashboardPayload`]. Spot and VIX always come from the spot snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use tradyx_core::{
    round_dp, BreadthMomentum, ChainMetrics, Error, ForecastSet, MarketSeries, MlForecastSet,
    Result, SpotSnapshot, VixOhlc, VolatilityIndicatorSet,
};

/// Latest session bar of the underlying with its change over the previous close.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestOhlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub previous_close: Option<f64>,
    pub change_pct: Option<f64>,
}

impl LatestOhlc {
    /// Build from the last two bars; `None` for an empty series.
    pub fn from_series(series: &MarketSeries) -> Option<Self> {
        let bars = series.bars();
        let last = bars.last()?;
        let previous_close = bars.len().checked_sub(2).map(|i| bars[i].close);
        Some(Self {
            open: last.open,
            high: last.high,
            low: last.low,
            close: last.close,
            previous_close,
            change_pct: previous_close.and_then(|prev| pct_change(last.close, prev)),
        })
    }
}

/// Percent change from `previous` to `current`; undefined for a non-positive base.
fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous > 0.0 && current.is_finite() {
        Some((current - previous) / previous * 100.0)
    } else {
        None
    }
}

/// Outputs of the five leaf engines for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafOutputs {
    pub chain: ChainMetrics,
    pub volatility: VolatilityIndicatorSet,
    pub statistical: ForecastSet,
    pub ml: MlForecastSet,
    pub momentum: BreadthMomentum,
}

/// The dashboard document.
///
/// Chain metrics are flattened to the top level; the forecast sets and the
/// volatility indicators keep their own objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    /// Generation instant of this payload, never a source timestamp.
    pub updated_at: DateTime<Utc>,
    pub spot: f64,
    pub vix: Option<f64>,
    pub spot_series: Vec<f64>,
    pub vix_series: Vec<f64>,
    #[serde(flatten)]
    pub chain: ChainMetrics,
    pub predictions: ForecastSet,
    pub ml_predictions: MlForecastSet,
    pub volatility_indicators: VolatilityIndicatorSet,
    pub ohlc: Option<LatestOhlc>,
    pub vix_ohlc: Option<VixOhlc>,
    pub spot_change_pct: Option<f64>,
    pub vix_change_pct: Option<f64>,
    pub drift_direction: Option<f64>,
    /// Scaled (0..=100) momentum strength.
    pub momentum_strength: Option<f64>,
    pub vrp_slope: Option<f64>,
    /// Chain fields filled by a synthetic fallback rather than measured data.
    pub synthetic_fields: Vec<&'static str>,
}

impl DashboardPayload {
    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Root of the engine graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardAssembler;

impl DashboardAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Merge the leaf outputs. Fails only when the spot snapshot has no spot.
    pub fn assemble(
        &self,
        spot: &SpotSnapshot,
        market: &MarketSeries,
        leaves: LeafOutputs,
        now: DateTime<Utc>,
    ) -> Result<DashboardPayload> {
        let spot_price = spot.spot.ok_or(Error::MissingMandatoryInput("spot"))?;

        let ohlc = LatestOhlc::from_series(market).map(|mut o| {
            o.change_pct = o.change_pct.map(|v| round_dp(v, 2));
            o
        });
        let vix_change_pct = spot
            .vix_ohlc
            .as_ref()
            .and_then(|v| pct_change(v.close?, v.previous_close?))
            .map(|v| round_dp(v, 2));

        let LeafOutputs {
            chain,
            volatility,
            statistical,
            ml,
            momentum,
        } = leaves;
        let synthetic_fields = chain.synthetic_fields();

        let payload = DashboardPayload {
            updated_at: now,
            spot: spot_price,
            vix: spot.vix,
            spot_series: spot.spot_series.clone(),
            vix_series: spot.vix_series.clone(),
            chain,
            predictions: statistical,
            ml_predictions: ml,
            vrp_slope: volatility.vrp_slope,
            volatility_indicators: volatility,
            spot_change_pct: ohlc.as_ref().and_then(|o| o.change_pct),
            ohlc,
            vix_ohlc: spot.vix_ohlc.clone(),
            vix_change_pct,
            drift_direction: momentum.drift_direction,
            momentum_strength: momentum.momentum_strength.map(|m| m.scaled),
            synthetic_fields,
        };

        info!(
            spot = payload.spot,
            vix = ?payload.vix,
            synthetic = ?payload.synthetic_fields,
            "Dashboard payload assembled"
        );
        Ok(payload)
    }
}
