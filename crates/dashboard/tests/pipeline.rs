//! End-to-end runs of the dashboard pipeline on deterministic snapshots.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tradyx_core::{
    Config, MarketSeries, OhlcBar, OptionChainSnapshot, OptionLeg, SectorSeries, SpotSnapshot,
    StrikeRecord, VolRegime,
};
use tradyx_dashboard::{Pipeline, Snapshots};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 14, 10, 15, 0).unwrap()
}

fn bars(closes: &[f64]) -> Vec<OhlcBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| OhlcBar {
            date: start + chrono::Days::new(i as u64),
            open: c * 0.998,
            high: c * 1.006,
            low: c * 0.994,
            close: c,
            volume: 1.0e6,
        })
        .collect()
}

fn wavy_market(n: usize) -> MarketSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            22_000.0 + t * 12.0 + (t * 0.8).sin() * 150.0 + (t * 0.31).cos() * 90.0
        })
        .collect();
    let vix: Vec<f64> = (0..n)
        .map(|i| 14.5 + (i as f64 * 0.23).sin() * 2.5 + (i as f64 * 0.07).cos())
        .collect();
    let bank: Vec<f64> = closes.iter().enumerate().map(|(i, c)| c * 2.2 + (i as f64 * 1.3).sin() * 80.0).collect();
    let mut sectors = BTreeMap::new();
    sectors.insert(
        "BANKNIFTY".to_string(),
        SectorSeries {
            returns: tradyx_core::pct_returns(&bank),
            current: bank.last().copied(),
            close: bank,
        },
    );
    MarketSeries::new(bars(&closes), vix, sectors)
}

fn leg(oi: f64, chg: f64, iv: f64, price: f64, volume: f64) -> OptionLeg {
    OptionLeg {
        open_interest: oi,
        change_in_oi: chg,
        implied_volatility: iv,
        last_price: price,
        traded_volume: volume,
    }
}

fn chain(spot: f64) -> OptionChainSnapshot {
    let records = (-20..20)
        .map(|k| {
            let strike = (spot / 50.0).round() * 50.0 + k as f64 * 50.0;
            let d = k as f64;
            StrikeRecord {
                strike,
                call: Some(leg(
                    40_000.0 + d.max(0.0) * 9_000.0,
                    1_500.0 * d,
                    13.0 + d.abs() * 0.2,
                    (150.0 - d * 20.0).max(1.0),
                    20_000.0 + d.abs() * 4_000.0,
                )),
                put: Some(leg(
                    40_000.0 + (-d).max(0.0) * 8_000.0,
                    -1_200.0 * d,
                    14.0 + d.abs() * 0.25,
                    (150.0 + d * 20.0).max(1.0),
                    18_000.0 + d.abs() * 3_500.0,
                )),
            }
        })
        .collect();
    OptionChainSnapshot::new(records, now().naive_utc(), Some(spot + 40.0))
}

fn spot(spot: f64, vix: f64) -> SpotSnapshot {
    SpotSnapshot {
        spot: Some(spot),
        vix: Some(vix),
        spot_series: vec![spot - 10.0, spot],
        vix_series: vec![vix - 0.2, vix],
        vix_52w_high: Some(22.0),
        vix_52w_low: Some(10.0),
        ..Default::default()
    }
}

fn full_snapshots() -> Snapshots {
    let market = wavy_market(120);
    let last = market.last_close().unwrap();
    Snapshots {
        spot: spot(last, 14.0),
        chain: Some(chain(last)),
        market,
    }
}

#[test]
fn test_rising_closes_trend_and_drift() {
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 50.0 / 49.0).collect();
    let snapshots = Snapshots {
        spot: spot(150.0, 12.0),
        chain: None,
        market: MarketSeries::new(bars(&closes), Vec::new(), BTreeMap::new()),
    };
    let payload = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap();

    assert_eq!(payload.volatility_indicators.trend_consistency_index, Some(1.0));
    assert!(payload.drift_direction.unwrap() > 0.0);
    // Smooth uptrend: realized vol far below the calm threshold
    assert_eq!(payload.volatility_indicators.volatility_regime, Some(VolRegime::Calm));
}

#[test]
fn test_stress_regime_from_vix() {
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let snapshots = Snapshots {
        spot: spot(149.0, 25.0),
        chain: None,
        market: MarketSeries::new(bars(&closes), Vec::new(), BTreeMap::new()),
    };
    let payload = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap();
    assert_eq!(payload.volatility_indicators.volatility_regime, Some(VolRegime::Stress));
}

#[test]
fn test_expected_move_from_spot_snapshot() {
    let snapshots = Snapshots {
        spot: spot(25_000.0, 15.0),
        chain: Some(chain(24_000.0)),
        market: wavy_market(30),
    };
    let payload = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap();
    assert_abs_diff_eq!(payload.volatility_indicators.expected_move_1day.unwrap(), 196.28, epsilon = 1e-9);
    // Spot comes from the spot snapshot, not the chain
    assert_eq!(payload.spot, 25_000.0);
}

#[test]
fn test_missing_spot_fails_the_run() {
    let mut snapshots = full_snapshots();
    snapshots.spot.spot = None;
    let err = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_full_run_populates_payload() {
    let payload = Pipeline::new(&Config::default()).run_at(&full_snapshots(), now()).unwrap();

    let pcr = payload.chain.pcr.unwrap();
    assert!(pcr >= 0.0);
    let strikes: Vec<f64> = full_snapshots().chain.unwrap().strikes().collect();
    assert!(strikes.contains(&payload.chain.max_pain.unwrap()));
    assert!(strikes.contains(&payload.chain.atm_strike.unwrap()));

    let gamma = &payload.chain.gamma_exposure.value;
    let skew = &payload.chain.iv_skew.value;
    assert!(!gamma.is_empty() && gamma.len() <= 15);
    assert!(!skew.is_empty() && skew.len() <= 15);
    assert!(payload.chain.whale_alerts.value.len() <= 5);

    let rank = payload.chain.iv_rank.unwrap();
    assert!((0.0..=100.0).contains(&rank));
    if let Some(strength) = payload.momentum_strength {
        assert!((0.0..=100.0).contains(&strength));
    }

    assert!(payload.volatility_indicators.realized_vol.is_some());
    assert!(payload.predictions.parkinson.is_some());
    assert!(payload.predictions.beta.is_some());
    assert!(payload.ml_predictions.next_day_bias.is_some());
    assert!(payload.ml_predictions.market_probability.is_some());
    assert!(payload.ml_predictions.volatility_forecast.is_some());
    assert!(payload.ml_predictions.predicted_range.is_some());
    assert!(payload.spot_change_pct.is_some());
}

#[test]
fn test_sequential_and_parallel_runs_agree() {
    let snapshots = full_snapshots();
    let default = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap();

    let mut config = Config::default();
    config.pipeline.force_sequential = true;
    let sequential = Pipeline::new(&config).run_at(&snapshots, now()).unwrap();

    assert_eq!(default, sequential);
}

#[test]
fn test_repeat_runs_are_identical() {
    let pipeline = Pipeline::new(&Config::default());
    let snapshots = full_snapshots();
    let a = pipeline.run_at(&snapshots, now()).unwrap();
    let b = pipeline.run_at(&snapshots, now()).unwrap();
    assert_eq!(a.to_json_pretty().unwrap(), b.to_json_pretty().unwrap());
}

#[test]
fn test_updated_at_is_generation_time() {
    let before = Utc::now();
    let payload = Pipeline::new(&Config::default()).run(&full_snapshots()).unwrap();
    assert!(payload.updated_at >= before);
    assert!(payload.updated_at <= Utc::now());
}

#[test]
fn test_from_documents() {
    let spot_json = r#"{
        "spot": 19550.0, "vix": 12.5,
        "spotSeries": [19540.0, 19550.0], "vixSeries": [12.4, 12.5],
        "vix52wHigh": 20.0, "vix52wLow": 10.0,
        "vixOhlc": {"open": 12.2, "high": 12.8, "low": 12.1, "close": 12.5, "previousClose": 12.0}
    }"#;
    let chain_json = r#"{"records": {
        "timestamp": "14-Jun-2024 15:30:00",
        "underlyingValue": 19561.0,
        "data": [
            {"strikePrice": 19700, "CE": {"openInterest": 900, "changeinOpenInterest": 10, "impliedVolatility": 12.0, "lastPrice": 20, "totalTradedVolume": 100},
                                   "PE": {"openInterest": 100, "changeinOpenInterest": 5, "impliedVolatility": 13.0, "lastPrice": 160, "totalTradedVolume": 80}},
            {"strikePrice": 19500, "CE": {"openInterest": 300, "changeinOpenInterest": 10, "impliedVolatility": 13.0, "lastPrice": 110, "totalTradedVolume": 100},
                                   "PE": {"openInterest": 700, "changeinOpenInterest": 5, "impliedVolatility": 14.0, "lastPrice": 60, "totalTradedVolume": 80}},
            {"strikePrice": 19600, "CE": {"openInterest": 500, "changeinOpenInterest": 10, "impliedVolatility": 12.5, "lastPrice": 60, "totalTradedVolume": 100},
                                   "PE": {"openInterest": 400, "changeinOpenInterest": 5, "impliedVolatility": 13.5, "lastPrice": 105, "totalTradedVolume": 80}}
        ]
    }}"#;
    let market_json = r#"{
        "ohlc": {
            "dates": ["2024-06-12", "2024-06-13", "2024-06-14"],
            "open": [19400, 19450, 19500], "high": [19480, 19520, 19580],
            "low": [19380, 19420, 19490], "close": [19450, 19500, 19550],
            "volume": [1, 1, 1]
        },
        "returns": {"nifty": [0.257, 0.256]},
        "vix_series": [12.0, 12.2, 12.5]
    }"#;
    let fallback = now().naive_utc();
    let snapshots = Snapshots::from_json(spot_json, Some(chain_json), market_json, fallback).unwrap();
    let payload = Pipeline::new(&Config::default()).run_at(&snapshots, now()).unwrap();

    // Tie between 19500 and 19600 goes to the lower strike
    assert_eq!(payload.chain.atm_strike, Some(19_500.0));
    assert_eq!(payload.spot, 19_550.0);
    assert_eq!(payload.vix, Some(12.5));
    assert_abs_diff_eq!(payload.chain.pcr.unwrap(), 0.71, epsilon = 1e-12);
    assert_abs_diff_eq!(payload.vix_change_pct.unwrap(), 4.17, epsilon = 1e-12);
    assert_eq!(payload.ohlc.as_ref().unwrap().previous_close, Some(19_500.0));

    let value: serde_json::Value = serde_json::from_str(&payload.to_json_pretty().unwrap()).unwrap();
    for key in ["updatedAt", "spot", "vix", "pcr", "maxPain", "spotSeries", "vixSeries", "oi"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["updatedAt"], "2024-06-14T10:15:00Z");
    // Three strikes: every curve falls back to synthetic points
    assert!(value["syntheticFields"].as_array().unwrap().contains(&"gammaExposure".into()));
}
