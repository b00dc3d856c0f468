//! Feature frame shared by the learned forecasters.
//!
//! One row per session after warm-up: VIX level, VIX change, rolling realized
//! volatility, rolling return/VIX correlation and the session's log return.
//! Windows adapt to the available history, and any row still missing a
//! feature is dropped before a model sees it.

use tradyx_core::config::MlConfig;
use tradyx_core::{ensure_history, Result};
use tradyx_features::stats::{self, annualize_pct, tail};

/// A column of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Vix,
    VixChange,
    RealizedVol,
    Correlation,
    Return,
}

/// One complete session of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRow {
    pub vix: f64,
    pub vix_change: f64,
    /// Annualized realized volatility in percent.
    pub realized_vol: f64,
    pub correlation: f64,
    /// Log return into this session.
    pub ret: f64,
}

impl FrameRow {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Vix => self.vix,
            Feature::VixChange => self.vix_change,
            Feature::RealizedVol => self.realized_vol,
            Feature::Correlation => self.correlation,
            Feature::Return => self.ret,
        }
    }

    /// The selected features, in the order given.
    pub fn select(&self, features: &[Feature]) -> Vec<f64> {
        features.iter().map(|&f| self.get(f)).collect()
    }
}

/// Rolling window length and minimum observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    len: usize,
    min_periods: usize,
}

impl Window {
    fn adaptive(available: usize, divisor: usize, lo: usize, hi: usize, floor: usize) -> Self {
        let len = (available / divisor).max(lo).min(hi);
        Self {
            len,
            min_periods: floor.max(len / 2),
        }
    }

    fn range(&self, t: usize) -> std::ops::RangeInclusive<usize> {
        (t + 1).saturating_sub(self.len)..=t
    }
}

/// Jointly engineered features over the trailing history.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    rows: Vec<FrameRow>,
}

impl FeatureFrame {
    /// Build the frame from closes and VIX levels aligned at their trailing ends.
    pub fn build(closes: &[f64], vix: &[f64], cfg: &MlConfig, trading_days: f64) -> Result<Self> {
        let n = closes.len().min(vix.len());
        ensure_history("feature_frame", cfg.min_closes, n)?;
        let closes = tail(closes, n);
        let vix = tail(vix, n);

        let returns: Vec<Option<f64>> = (0..n)
            .map(|t| match t {
                0 => None,
                _ if closes[t - 1] > 0.0 && closes[t] > 0.0 => Some((closes[t] / closes[t - 1]).ln()),
                _ => None,
            })
            .collect();

        let rv_window = Window::adaptive(n, 3, cfg.rv_window_min, cfg.rv_window_max, 5);
        let corr_window = Window::adaptive(n, 2, cfg.corr_window_min, cfg.corr_window_max, 10);

        let rows: Vec<FrameRow> = (1..n)
            .filter_map(|t| {
                let ret = returns[t]?;
                let realized_vol = rolling_vol(&returns, rv_window, t, trading_days)?;
                let correlation = rolling_corr(&returns, vix, corr_window, t)?;
                Some(FrameRow {
                    vix: vix[t],
                    vix_change: vix[t] - vix[t - 1],
                    realized_vol,
                    correlation,
                    ret,
                })
            })
            .collect();

        ensure_history("feature_frame_rows", cfg.min_frame_rows, rows.len())?;
        Ok(Self { rows })
    }

    /// Frame over pre-computed rows.
    pub fn from_rows(rows: Vec<FrameRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The most recent row, the one every forecast predicts from.
    pub fn latest(&self) -> Option<&FrameRow> {
        self.rows.last()
    }

    pub fn column(&self, feature: Feature) -> Vec<f64> {
        self.rows.iter().map(|r| r.get(feature)).collect()
    }

    /// Feature matrix of the first `n` rows.
    pub fn matrix(&self, features: &[Feature], n: usize) -> Vec<Vec<f64>> {
        self.rows.iter().take(n).map(|r| r.select(features)).collect()
    }
}

fn rolling_vol(returns: &[Option<f64>], window: Window, t: usize, trading_days: f64) -> Option<f64> {
    let values: Vec<f64> = returns[window.range(t)].iter().flatten().copied().collect();
    if values.len() < window.min_periods {
        return None;
    }
    stats::sample_std(&values)
        .ok()
        .map(|std| annualize_pct(std, trading_days))
}

fn rolling_corr(returns: &[Option<f64>], vix: &[f64], window: Window, t: usize) -> Option<f64> {
    let (x, y): (Vec<f64>, Vec<f64>) = window
        .range(t)
        .filter_map(|i| returns[i].map(|r| (r, vix[i])))
        .unzip();
    if x.len() < window.min_periods {
        return None;
    }
    stats::pearson(&x, &y).ok()
}
