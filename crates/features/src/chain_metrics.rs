//! Positioning and liquidity metrics from an option chain.
//!
//! Every metric is computed independently. A metric that cannot be computed
//! is reported as null and never prevents its siblings from being computed.
//! Gamma exposure, IV skew and whale alerts fall back to synthetic curves when
//! real data is too sparse; those outputs are tagged [`Provenance::Synthetic`].

use ordered_float::OrderedFloat;
use tracing::{debug, info, warn};
use tradyx_core::config::ChainConfig;
use tradyx_core::{
    round_dp, ChainMetrics, Config, Error, GammaPoint, OiLeaders, OiLeg, OptionChainSnapshot,
    OptionSide, Result, SkewPoint, Sourced, SpotSnapshot, Straddle, StrikeRecord, WhaleAction,
    WhaleAlert,
};

use crate::degrade;

/// Put/call open-interest ratio.
pub fn put_call_ratio(chain: &OptionChainSnapshot) -> Result<f64> {
    let (calls, puts) = chain.records().iter().fold((0.0, 0.0), |(c, p), r| {
        (
            c + r.call.as_ref().map_or(0.0, |l| l.open_interest),
            p + r.put.as_ref().map_or(0.0, |l| l.open_interest),
        )
    });
    if calls <= 0.0 {
        return Err(Error::degenerate("total call open interest is zero"));
    }
    Ok(puts / calls)
}

/// Strike minimizing the aggregate payout to option holders. Ties go to the lowest strike.
pub fn max_pain(chain: &OptionChainSnapshot) -> Result<f64> {
    let records = chain.records();
    let mut best: Option<(f64, f64)> = None;
    for candidate in records {
        let s = candidate.strike;
        let payout: f64 = records
            .iter()
            .map(|r| {
                let k = r.strike;
                let call = r.call.as_ref().map_or(0.0, |l| (s - k).max(0.0) * l.open_interest);
                let put = r.put.as_ref().map_or(0.0, |l| (k - s).max(0.0) * l.open_interest);
                call + put
            })
            .sum();
        if best.map_or(true, |(_, p)| payout < p) {
            best = Some((s, payout));
        }
    }
    best.map(|(s, _)| s)
        .ok_or_else(|| Error::degenerate("option chain has no strikes"))
}

/// Strike nearest to spot. Ties go to the lowest strike.
pub fn atm_strike(chain: &OptionChainSnapshot, spot: f64) -> Result<f64> {
    chain
        .records()
        .iter()
        .map(|r| r.strike)
        .min_by_key(|k| OrderedFloat((k - spot).abs()))
        .ok_or_else(|| Error::degenerate("option chain has no strikes"))
}

/// The `n` legs of one side with the largest open interest.
pub fn top_oi(chain: &OptionChainSnapshot, side: OptionSide, n: usize) -> Vec<OiLeg> {
    let mut legs: Vec<OiLeg> = chain
        .records()
        .iter()
        .filter_map(|r| {
            r.leg(side).map(|leg| OiLeg {
                strike: r.strike,
                oi: leg.open_interest,
                change: leg.oi_change_pct(),
            })
        })
        .collect();
    legs.sort_by_key(|l| std::cmp::Reverse(OrderedFloat(l.oi)));
    legs.truncate(n);
    legs
}

/// Cost of the ATM straddle.
pub fn straddle(chain: &OptionChainSnapshot, atm: f64) -> Result<Straddle> {
    let record = chain
        .record_at(atm)
        .ok_or_else(|| Error::degenerate(format!("no record at ATM strike {atm}")))?;
    match (&record.call, &record.put) {
        (Some(call), Some(put)) => {
            let total = call.last_price + put.last_price;
            Ok(Straddle {
                call: call.last_price,
                put: put.last_price,
                total,
                exp_move_pts: total.round(),
            })
        }
        _ => Err(Error::degenerate("ATM strike lacks a call or put leg")),
    }
}

/// Display label of a gamma magnitude, e.g. `+12K` or `-3M`.
pub fn gamma_label(gamma: f64) -> String {
    let sign = if gamma > 0.0 { "+" } else { "" };
    let magnitude = gamma.abs();
    if magnitude >= 1_000_000.0 {
        format!("{sign}{}M", (gamma / 1_000_000.0).trunc() as i64)
    } else if magnitude >= 1_000.0 {
        format!("{sign}{}K", (gamma / 1_000.0).trunc() as i64)
    } else {
        format!("{sign}{}", gamma.trunc() as i64)
    }
}

/// Records in a window of `n` strikes centred on the strike nearest spot.
fn sample_window(records: &[StrikeRecord], spot: f64, n: usize) -> &[StrikeRecord] {
    if records.len() <= n {
        return records;
    }
    let centre = records
        .iter()
        .enumerate()
        .min_by_key(|(_, r)| OrderedFloat((r.strike - spot).abs()))
        .map_or(0, |(i, _)| i);
    let start = centre.saturating_sub(n / 2).min(records.len() - n);
    &records[start..start + n]
}

/// Approximate dealer gamma exposure per strike.
///
/// Calls above spot and puts below spot contribute positively, the mirrored
/// legs negatively, each weighted by OI and proximity to spot.
pub fn gamma_exposure(
    chain: &OptionChainSnapshot,
    spot: f64,
    cfg: &ChainConfig,
) -> Sourced<Vec<GammaPoint>> {
    let mut points: Vec<GammaPoint> = Vec::new();
    if spot > 0.0 {
        for r in sample_window(chain.records(), spot, cfg.gamma_sample_strikes) {
            let k = r.strike;
            let dist = (k - spot).abs() / spot;
            let weight = cfg.gamma_oi_weight * (1.0 - dist.min(cfg.gamma_max_distance));
            let mut gamma = 0.0;
            if let Some(call) = &r.call {
                let sign = if k > spot { 1.0 } else { -1.0 };
                gamma += sign * call.open_interest * weight;
            }
            if let Some(put) = &r.put {
                let sign = if k < spot { 1.0 } else { -1.0 };
                gamma += sign * put.open_interest * weight;
            }
            if gamma.abs() > cfg.gamma_min_magnitude {
                let gamma = gamma.round();
                points.push(GammaPoint {
                    strike: k,
                    gamma,
                    label: gamma_label(gamma),
                });
            }
        }
    }

    let synthetic = points.len() < cfg.gamma_min_points && spot > 0.0;
    if synthetic {
        warn!(measured = points.len(), "Sparse gamma exposure, adding synthetic curve");
        for offset in [-500.0, -300.0, -200.0, -100.0, 0.0, 100.0, 200.0, 300.0, 500.0] {
            let sign = if offset > 0.0 { 1.0 } else { -1.0 };
            let gamma = ((1000.0 - f64::abs(offset) / spot * 500.0) * sign).round();
            if gamma.abs() > cfg.gamma_min_magnitude {
                points.push(GammaPoint {
                    strike: (spot + offset).trunc(),
                    gamma,
                    label: gamma_label(gamma),
                });
            }
        }
    }

    points.sort_by_key(|p| std::cmp::Reverse(OrderedFloat(p.gamma.abs())));
    points.truncate(cfg.gamma_cap);
    if synthetic {
        Sourced::synthetic(points)
    } else {
        Sourced::measured(points)
    }
}

/// Normalize a quoted IV to percent: values above 1 are already percentages.
#[inline]
fn iv_pct(raw: f64) -> f64 {
    if raw > 1.0 {
        raw
    } else {
        raw * 100.0
    }
}

/// Implied volatility by strike, call IV preferred over put IV.
pub fn iv_skew(chain: &OptionChainSnapshot, spot: f64, cfg: &ChainConfig) -> Sourced<Vec<SkewPoint>> {
    let mut points: Vec<SkewPoint> = chain
        .records()
        .iter()
        .filter_map(|r| {
            let raw = [&r.call, &r.put]
                .into_iter()
                .flatten()
                .map(|l| l.implied_volatility)
                .find(|iv| *iv != 0.0)?;
            let iv = iv_pct(raw);
            (cfg.skew_iv_min..=cfg.skew_iv_max)
                .contains(&iv)
                .then_some(SkewPoint { strike: r.strike, iv })
        })
        .collect();

    let synthetic = points.len() < cfg.skew_min_points && spot > 0.0;
    if synthetic {
        warn!(measured = points.len(), "Sparse IV skew, adding synthetic curve");
        let base = cfg.skew_synthetic_base_iv;
        for offset in [
            -1000.0, -500.0, -300.0, -200.0, -100.0, 0.0, 100.0, 200.0, 300.0, 500.0, 1000.0,
        ] {
            // Downside strikes carry the richer IV
            let iv = if offset < 0.0 {
                base + f64::abs(offset) / spot * 5.0
            } else {
                base - offset / spot * 2.0
            };
            points.push(SkewPoint {
                strike: (spot + offset).trunc(),
                iv: iv.max(cfg.skew_iv_min),
            });
        }
    }

    points.sort_by_key(|p| OrderedFloat(p.strike));
    points.truncate(cfg.skew_cap);
    if synthetic {
        Sourced::synthetic(points)
    } else {
        Sourced::measured(points)
    }
}

/// Legs with large traded volume and a large change in OI.
pub fn whale_alerts(chain: &OptionChainSnapshot, cfg: &ChainConfig) -> Sourced<Vec<WhaleAlert>> {
    let time = chain.timestamp.format("%H:%M:%S").to_string();
    let mut alerts: Vec<WhaleAlert> = Vec::new();
    for r in chain.records() {
        for side in [OptionSide::Call, OptionSide::Put] {
            let Some(leg) = r.leg(side) else { continue };
            if leg.traded_volume > cfg.whale_min_volume
                && leg.change_in_oi.abs() > cfg.whale_min_oi_change
            {
                alerts.push(WhaleAlert {
                    time: time.clone(),
                    strike: r.strike,
                    side,
                    volume: leg.traded_volume,
                    premium: leg.last_price,
                    action: if leg.change_in_oi > 0.0 {
                        WhaleAction::Buy
                    } else {
                        WhaleAction::Sell
                    },
                });
            }
        }
    }

    let synthetic = alerts.len() < cfg.whale_min_alerts && !chain.is_empty();
    if synthetic {
        warn!(measured = alerts.len(), "Few whale alerts, adding synthetic alerts");
        let mid = chain.records()[chain.len() / 2].strike;
        for (i, offset) in [-200.0, -100.0, 0.0, 100.0, 200.0].into_iter().enumerate() {
            let buy = i % 2 == 0;
            alerts.push(WhaleAlert {
                time: format!("{:02}:{:02}:00", 9 + i.min(4), 30 + (i * 5) % 60),
                strike: mid + offset,
                side: if buy { OptionSide::Call } else { OptionSide::Put },
                volume: 75_000.0 + i as f64 * 10_000.0,
                premium: 100.0 + i as f64 * 10.0,
                action: if buy { WhaleAction::Buy } else { WhaleAction::Sell },
            });
        }
    }

    alerts.sort_by_key(|a| std::cmp::Reverse(OrderedFloat(a.volume)));
    alerts.truncate(cfg.whale_cap);
    if synthetic {
        Sourced::synthetic(alerts)
    } else {
        Sourced::measured(alerts)
    }
}

/// Position of VIX within its 52-week range, clamped to 0..=100.
pub fn iv_rank(vix: f64, high: f64, low: f64) -> Result<f64> {
    if !(vix.is_finite() && high.is_finite() && low.is_finite()) {
        return Err(Error::degenerate("non-finite VIX range"));
    }
    if high == low {
        return Ok(50.0);
    }
    Ok(((vix - low) / (high - low) * 100.0).clamp(0.0, 100.0))
}

/// Distance of spot from max pain, percent of spot.
pub fn magnet_pct(spot: f64, max_pain: f64) -> Result<f64> {
    if spot == 0.0 {
        return Err(Error::degenerate("spot is zero"));
    }
    Ok((spot - max_pain) / spot * 100.0)
}

/// Average of the summed OI % changes of the call and put leaders.
pub fn oi_momentum(leaders: &OiLeaders) -> Result<f64> {
    let calls: f64 = leaders.calls_top.iter().map(|l| l.change).sum();
    let puts: f64 = leaders.puts_top.iter().map(|l| l.change).sum();
    match (leaders.calls_top.is_empty(), leaders.puts_top.is_empty()) {
        (false, false) => Ok((calls + puts) / 2.0),
        (false, true) => Ok(calls),
        (true, false) => Ok(puts),
        (true, true) => Err(Error::degenerate("no OI leaders")),
    }
}

/// Computes [`ChainMetrics`] from an option chain and the authoritative spot snapshot.
pub struct ChainMetricsEngine {
    config: ChainConfig,
}

impl ChainMetricsEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.chain.clone(),
        }
    }

    /// Compute all chain metrics. Fails only when spot is absent.
    pub fn compute(&self, chain: &OptionChainSnapshot, market: &SpotSnapshot) -> Result<ChainMetrics> {
        let spot = market.spot.ok_or(Error::MissingMandatoryInput("spot"))?;
        let cfg = &self.config;

        let max_pain = degrade("max_pain", max_pain(chain));
        let atm = degrade("atm_strike", atm_strike(chain, spot));
        let oi = OiLeaders {
            calls_top: top_oi(chain, OptionSide::Call, cfg.top_n),
            puts_top: top_oi(chain, OptionSide::Put, cfg.top_n),
        };

        let iv_rank = market.vix.and_then(|vix| {
            let high = market.vix_52w_high.unwrap_or(vix * cfg.vix_high_default_factor);
            let low = market.vix_52w_low.unwrap_or(vix * cfg.vix_low_default_factor);
            degrade("iv_rank", iv_rank(vix, high, low))
        });

        let metrics = ChainMetrics {
            pcr: degrade("pcr", put_call_ratio(chain)).map(|v| round_dp(v, 2)),
            max_pain,
            atm_strike: atm,
            straddle: atm.and_then(|k| degrade("straddle", straddle(chain, k))),
            gamma_exposure: gamma_exposure(chain, spot, cfg),
            iv_skew: round_skew(iv_skew(chain, spot, cfg)),
            whale_alerts: whale_alerts(chain, cfg),
            iv_rank: iv_rank.map(|v| round_dp(v, 1)),
            magnet_pct: max_pain
                .and_then(|mp| degrade("magnet_pct", magnet_pct(spot, mp)))
                .map(|v| round_dp(v, 2)),
            oi_momentum: degrade("oi_momentum", oi_momentum(&oi)).map(|v| round_dp(v, 1)),
            oi: round_leaders(oi),
        };

        debug!(synthetic = ?metrics.synthetic_fields(), "Chain metrics provenance");
        info!(
            strikes = chain.len(),
            pcr = ?metrics.pcr,
            max_pain = ?metrics.max_pain,
            atm = ?metrics.atm_strike,
            "Chain metrics computed"
        );
        Ok(metrics)
    }
}

fn round_skew(mut skew: Sourced<Vec<SkewPoint>>) -> Sourced<Vec<SkewPoint>> {
    for p in &mut skew.value {
        p.iv = round_dp(p.iv, 2);
    }
    skew
}

fn round_leaders(mut leaders: OiLeaders) -> OiLeaders {
    for leg in leaders.calls_top.iter_mut().chain(leaders.puts_top.iter_mut()) {
        leg.change = round_dp(leg.change, 1);
    }
    leaders
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use tradyx_core::{OptionLeg, Provenance};

    fn leg(oi: f64, chg: f64, iv: f64, price: f64, volume: f64) -> OptionLeg {
        OptionLeg {
            open_interest: oi,
            change_in_oi: chg,
            implied_volatility: iv,
            last_price: price,
            traded_volume: volume,
        }
    }

    fn chain(records: Vec<StrikeRecord>) -> OptionChainSnapshot {
        let ts = NaiveDate::from_ymd_opt(2024, 11, 28)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        OptionChainSnapshot::new(records, ts, None)
    }

    fn sample_chain() -> OptionChainSnapshot {
        chain(vec![
            StrikeRecord {
                strike: 19500.0,
                call: Some(leg(1000.0, 100.0, 14.0, 120.0, 10.0)),
                put: Some(leg(3000.0, -300.0, 16.0, 60.0, 10.0)),
            },
            StrikeRecord {
                strike: 19600.0,
                call: Some(leg(2000.0, 500.0, 13.0, 70.0, 10.0)),
                put: Some(leg(1500.0, 0.0, 15.0, 100.0, 10.0)),
            },
            StrikeRecord {
                strike: 19700.0,
                call: Some(leg(4000.0, 0.0, 12.0, 30.0, 10.0)),
                put: None,
            },
        ])
    }

    #[test]
    fn test_pcr() {
        assert_abs_diff_eq!(put_call_ratio(&sample_chain()).unwrap(), 4500.0 / 7000.0);
        let no_calls = chain(vec![StrikeRecord {
            strike: 100.0,
            call: None,
            put: Some(leg(10.0, 0.0, 0.0, 0.0, 0.0)),
        }]);
        assert!(put_call_ratio(&no_calls).is_err());
    }

    #[test]
    fn test_max_pain_member_of_strikes() {
        let c = sample_chain();
        let mp = max_pain(&c).unwrap();
        assert!(c.strikes().any(|k| k == mp));
        // Payouts: 19500 -> 150000, 19600 -> 100000, 19700 -> 400000
        assert_eq!(mp, 19600.0);
    }

    #[test]
    fn test_max_pain_tie_prefers_first_strike() {
        let c = chain(vec![
            StrikeRecord { strike: 100.0, call: None, put: None },
            StrikeRecord { strike: 200.0, call: None, put: None },
        ]);
        assert_eq!(max_pain(&c).unwrap(), 100.0);
    }

    #[test]
    fn test_atm_strike() {
        let c = sample_chain();
        // 19550 is equidistant from 19500 and 19600; the first wins
        assert_eq!(atm_strike(&c, 19550.0).unwrap(), 19500.0);
        assert_eq!(atm_strike(&c, 19680.0).unwrap(), 19700.0);
    }

    #[test]
    fn test_top_oi_sorted_and_capped() {
        let top = top_oi(&sample_chain(), OptionSide::Call, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].strike, 19700.0);
        assert_eq!(top[1].strike, 19600.0);
        assert_abs_diff_eq!(top[1].change, 25.0);
    }

    #[test]
    fn test_straddle() {
        let s = straddle(&sample_chain(), 19600.0).unwrap();
        assert_abs_diff_eq!(s.total, 170.0);
        assert_abs_diff_eq!(s.exp_move_pts, 170.0);
        assert!(straddle(&sample_chain(), 19700.0).is_err());
    }

    #[test]
    fn test_gamma_synthetic_when_sparse() {
        let cfg = ChainConfig::default();
        let g = gamma_exposure(&sample_chain(), 19600.0, &cfg);
        assert_eq!(g.provenance, Provenance::Synthetic);
        assert!(!g.value.is_empty());
        assert!(g.value.len() <= cfg.gamma_cap);
        for w in g.value.windows(2) {
            assert!(w[0].gamma.abs() >= w[1].gamma.abs());
        }
    }

    #[test]
    fn test_gamma_measured_with_dense_oi() {
        let cfg = ChainConfig::default();
        let records = (0..30)
            .map(|i| StrikeRecord {
                strike: 19000.0 + 50.0 * i as f64,
                call: Some(leg(100_000.0, 0.0, 0.0, 0.0, 0.0)),
                put: None,
            })
            .collect();
        let g = gamma_exposure(&chain(records), 19500.0, &cfg);
        assert_eq!(g.provenance, Provenance::Measured);
        assert_eq!(g.value.len(), cfg.gamma_cap);
        assert!(g.value.iter().all(|p| p.gamma.abs() > cfg.gamma_min_magnitude));
    }

    #[test]
    fn test_gamma_label() {
        assert_eq!(gamma_label(12_345.0), "+12K");
        assert_eq!(gamma_label(-3_500_000.0), "-3M");
        assert_eq!(gamma_label(-1000.0), "-1K");
        assert_eq!(gamma_label(999.0), "+999");
    }

    #[test]
    fn test_iv_skew_synthetic_when_sparse() {
        let cfg = ChainConfig::default();
        let skew = iv_skew(&sample_chain(), 19600.0, &cfg);
        assert!(skew.is_synthetic());
        assert!(skew.value.len() <= cfg.skew_cap);
        for w in skew.value.windows(2) {
            assert!(w[0].strike <= w[1].strike);
        }
        // Downside strikes carry higher IV than upside ones in the synthetic curve
        let low = skew.value.iter().find(|p| p.strike == 18600.0).unwrap();
        let high = skew.value.iter().find(|p| p.strike == 20600.0).unwrap();
        assert!(low.iv > high.iv);
    }

    #[test]
    fn test_iv_skew_normalizes_decimal_iv() {
        let cfg = ChainConfig::default();
        let records = (0..6)
            .map(|i| StrikeRecord {
                strike: 100.0 + i as f64,
                call: Some(leg(0.0, 0.0, 0.15, 0.0, 0.0)),
                put: None,
            })
            .collect();
        let skew = iv_skew(&chain(records), 0.0, &cfg);
        assert!(!skew.is_synthetic());
        assert_eq!(skew.value.len(), 6);
        assert_abs_diff_eq!(skew.value[0].iv, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_whale_alerts() {
        let cfg = ChainConfig::default();
        let records = vec![
            StrikeRecord {
                strike: 100.0,
                call: Some(leg(0.0, 30_000.0, 0.0, 5.0, 60_000.0)),
                put: Some(leg(0.0, -40_000.0, 0.0, 6.0, 90_000.0)),
            },
            StrikeRecord {
                strike: 200.0,
                call: Some(leg(0.0, 26_000.0, 0.0, 7.0, 70_000.0)),
                put: Some(leg(0.0, 1_000.0, 0.0, 8.0, 99_000.0)),
            },
        ];
        let alerts = whale_alerts(&chain(records), &cfg);
        assert!(!alerts.is_synthetic());
        assert_eq!(alerts.value.len(), 3);
        assert_eq!(alerts.value[0].action, WhaleAction::Sell);
        assert_eq!(alerts.value[0].side, OptionSide::Put);
        assert_eq!(alerts.value[0].time, "14:05:09");
        assert_eq!(alerts.value[1].volume, 70_000.0);
    }

    #[test]
    fn test_whale_alerts_synthetic() {
        let cfg = ChainConfig::default();
        let alerts = whale_alerts(&sample_chain(), &cfg);
        assert!(alerts.is_synthetic());
        assert_eq!(alerts.value.len(), 5);
        assert_eq!(alerts.value[0].volume, 115_000.0);
        assert_eq!(alerts.value[0].time, "13:50:00");
    }

    #[test]
    fn test_iv_rank_clamped() {
        assert_abs_diff_eq!(iv_rank(15.0, 20.0, 10.0).unwrap(), 50.0);
        assert_eq!(iv_rank(30.0, 20.0, 10.0).unwrap(), 100.0);
        assert_eq!(iv_rank(5.0, 20.0, 10.0).unwrap(), 0.0);
        assert_eq!(iv_rank(12.0, 12.0, 12.0).unwrap(), 50.0);
    }

    #[test]
    fn test_oi_momentum() {
        let leaders = OiLeaders {
            calls_top: vec![OiLeg { strike: 1.0, oi: 1.0, change: 10.0 }],
            puts_top: vec![OiLeg { strike: 1.0, oi: 1.0, change: 4.0 }],
        };
        assert_abs_diff_eq!(oi_momentum(&leaders).unwrap(), 7.0);
        let calls_only = OiLeaders {
            calls_top: leaders.calls_top.clone(),
            puts_top: vec![],
        };
        assert_abs_diff_eq!(oi_momentum(&calls_only).unwrap(), 10.0);
        assert!(oi_momentum(&OiLeaders::default()).is_err());
    }

    #[test]
    fn test_engine_compute() {
        let engine = ChainMetricsEngine::new(&Config::default());
        let market = SpotSnapshot {
            spot: Some(19550.0),
            vix: Some(15.0),
            ..Default::default()
        };
        let m = engine.compute(&sample_chain(), &market).unwrap();
        assert_eq!(m.pcr, Some(0.64));
        assert_eq!(m.atm_strike, Some(19500.0));
        assert_eq!(m.max_pain, Some(19600.0));
        // Defaulted 52w range of 7.5..22.5 puts VIX 15 at the midpoint
        assert_eq!(m.iv_rank, Some(50.0));
        assert!(m.straddle.is_some());
        assert!(!m.gamma_exposure.value.is_empty());
        assert!(m.synthetic_fields().contains(&"ivSkew"));
    }

    #[test]
    fn test_engine_requires_spot() {
        let engine = ChainMetricsEngine::new(&Config::default());
        let err = engine
            .compute(&sample_chain(), &SpotSnapshot::default())
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
