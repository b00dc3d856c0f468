//! Indicator engines for the tradyx analytics pipeline.
//!
//! This crate handles:
//! - Option chain positioning metrics (PCR, max pain, gamma, skew, whales)
//! - Volatility regime indicators
//! - Statistical forecasts (Parkinson, expected move, quantiles, beta)
//! - Drift and momentum strength
//!
//! Engines are stateless: each is built once from a [`tradyx_core::Config`]
//! and maps immutable snapshots to an output record.

pub mod chain_metrics;
pub mod momentum;
pub mod statistical;
pub mod stats;
pub mod volatility;

pub use chain_metrics::ChainMetricsEngine;
pub use momentum::BreadthMomentumEngine;
pub use statistical::StatisticalForecastEngine;
pub use volatility::VolatilityIndicatorEngine;

use tracing::debug;

/// Turn a failed indicator into a null, logging why.
pub fn degrade<T>(indicator: &str, result: tradyx_core::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(indicator, error = %e, "Indicator unavailable");
            None
        }
    }
}
