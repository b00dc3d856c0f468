//! One dashboard run: five independent leaf engines, then the assembler.
//!
//! With the `parallel` feature the leaves run on the rayon pool; the payload
//! is identical either way.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use tradyx_core::{Config, MarketSeries, OptionChainSnapshot, Result, SpotSnapshot};
use tradyx_features::{
    degrade, BreadthMomentumEngine, ChainMetricsEngine, StatisticalForecastEngine,
    VolatilityIndicatorEngine,
};
use tradyx_forecast::MlForecastEngine;
use tradyx_ingestion::{decode_chain, decode_market_series, decode_spot_snapshot};

use crate::assembler::{DashboardAssembler, DashboardPayload, LeafOutputs};

/// The immutable inputs of one run.
#[derive(Debug, Clone)]
pub struct Snapshots {
    /// Authoritative spot / VIX snapshot.
    pub spot: SpotSnapshot,
    /// Option chain, if one was captured this run.
    pub chain: Option<OptionChainSnapshot>,
    pub market: MarketSeries,
}

impl Snapshots {
    /// Decode the three input documents.
    ///
    /// The spot document must decode. A chain or market document that fails
    /// to decode is treated as absent so the run still produces a payload.
    pub fn from_json(
        spot_json: &str,
        chain_json: Option<&str>,
        market_json: &str,
        chain_fallback_time: NaiveDateTime,
    ) -> Result<Self> {
        let spot = decode_spot_snapshot(spot_json)?;
        let chain = chain_json.and_then(|json| match decode_chain(json, chain_fallback_time) {
            Ok(chain) => Some(chain),
            Err(e) => {
                warn!(error = %e, "Option chain unreadable, continuing without it");
                None
            }
        });
        let market = decode_market_series(market_json).unwrap_or_else(|e| {
            warn!(error = %e, "Market series unreadable, continuing without it");
            MarketSeries::new(Vec::new(), Vec::new(), BTreeMap::new())
        });
        Ok(Self {
            spot,
            chain,
            market,
        })
    }
}

/// Runs every engine over one set of snapshots.
pub struct Pipeline {
    chain: ChainMetricsEngine,
    volatility: VolatilityIndicatorEngine,
    statistical: StatisticalForecastEngine,
    ml: MlForecastEngine,
    momentum: BreadthMomentumEngine,
    assembler: DashboardAssembler,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    force_sequential: bool,
}

impl Pipeline {
    /// Build every engine from one configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            chain: ChainMetricsEngine::new(config),
            volatility: VolatilityIndicatorEngine::new(config),
            statistical: StatisticalForecastEngine::new(config),
            ml: MlForecastEngine::new(config),
            momentum: BreadthMomentumEngine::new(config),
            assembler: DashboardAssembler::new(),
            force_sequential: config.pipeline.force_sequential,
        }
    }

    /// Run the pipeline stamped with the current time.
    pub fn run(&self, snapshots: &Snapshots) -> Result<DashboardPayload> {
        self.run_at(snapshots, Utc::now())
    }

    /// Run the pipeline stamped with `now`.
    ///
    /// Returns an error only when the spot snapshot carries no spot.
    pub fn run_at(&self, snapshots: &Snapshots, now: DateTime<Utc>) -> Result<DashboardPayload> {
        if snapshots.spot.spot.is_none() {
            return Err(tradyx_core::Error::MissingMandatoryInput("spot"));
        }
        info!(
            bars = snapshots.market.len(),
            strikes = snapshots.chain.as_ref().map(|c| c.len()),
            "Starting dashboard run"
        );
        let leaves = self.run_leaves(snapshots, now)?;
        self.assembler
            .assemble(&snapshots.spot, &snapshots.market, leaves, now)
    }

    /// Chain metrics; a missing chain runs on an empty one so the fallback curves still appear.
    fn chain_metrics(&self, snapshots: &Snapshots, now: DateTime<Utc>) -> Result<tradyx_core::ChainMetrics> {
        let empty;
        let chain = match &snapshots.chain {
            Some(chain) => chain,
            None => {
                warn!("No option chain this run");
                empty = OptionChainSnapshot::new(Vec::new(), now.naive_utc(), None);
                &empty
            }
        };
        match self.chain.compute(chain, &snapshots.spot) {
            Err(e) if e.is_fatal() => Err(e),
            result => Ok(degrade("chain_metrics", result).unwrap_or_default()),
        }
    }

    fn run_sequential(&self, s: &Snapshots, now: DateTime<Utc>) -> Result<LeafOutputs> {
        Ok(LeafOutputs {
            chain: self.chain_metrics(s, now)?,
            volatility: self.volatility.compute(&s.market, &s.spot),
            statistical: self.statistical.compute(&s.market, &s.spot),
            ml: self.ml.compute(&s.market),
            momentum: self.momentum.compute(&s.market),
        })
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self, s: &Snapshots, now: DateTime<Utc>) -> Result<LeafOutputs> {
        let ((chain, volatility), ((statistical, ml), momentum)) = rayon::join(
            || {
                rayon::join(
                    || self.chain_metrics(s, now),
                    || self.volatility.compute(&s.market, &s.spot),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || self.statistical.compute(&s.market, &s.spot),
                            || self.ml.compute(&s.market),
                        )
                    },
                    || self.momentum.compute(&s.market),
                )
            },
        );
        Ok(LeafOutputs {
            chain: chain?,
            volatility,
            statistical,
            ml,
            momentum,
        })
    }

    #[cfg(feature = "parallel")]
    fn run_leaves(&self, s: &Snapshots, now: DateTime<Utc>) -> Result<LeafOutputs> {
        if self.force_sequential {
            self.run_sequential(s, now)
        } else {
            self.run_parallel(s, now)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_leaves(&self, s: &Snapshots, now: DateTime<Utc>) -> Result<LeafOutputs> {
        self.run_sequential(s, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SPOT: &str = r#"{"spot": 22000.0, "vix": 14.0, "spotSeries": [21990.0, 22000.0]}"#;

    fn fallback() -> NaiveDateTime {
        Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap().naive_utc()
    }

    #[test]
    fn test_unreadable_optional_documents_are_absent() {
        let snapshots = Snapshots::from_json(SPOT, Some("not json"), "[1, 2", fallback()).unwrap();
        assert!(snapshots.chain.is_none());
        assert!(snapshots.market.is_empty());
        assert_eq!(snapshots.spot.spot, Some(22000.0));
    }

    #[test]
    fn test_unreadable_spot_document_fails() {
        assert!(Snapshots::from_json("{", None, "{}", fallback()).is_err());
    }

    #[test]
    fn test_missing_chain_still_has_fallback_curves() {
        let snapshots = Snapshots::from_json(SPOT, None, "{}", fallback()).unwrap();
        let payload = Pipeline::new(&Config::default()).run(&snapshots).unwrap();
        assert!(!payload.chain.gamma_exposure.value.is_empty());
        assert!(!payload.chain.iv_skew.value.is_empty());
        assert!(payload.synthetic_fields.contains(&"gammaExposure"));
        assert!(payload.synthetic_fields.contains(&"ivSkew"));
        assert_eq!(payload.chain.pcr, None);
        assert_eq!(payload.ml_predictions, tradyx_core::MlForecastSet::default());
    }
}
