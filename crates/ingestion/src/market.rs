//! Market series decoding.
//!
//! The market-data document stores OHLCV as parallel columns. Columns are
//! zipped into [`OhlcBar`]s after checking their lengths agree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};
use tradyx_core::{Error, MarketSeries, OhlcBar, Result, SectorSeries};

/// Date format of the `ohlc.dates` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OhlcColumns {
    dates: Vec<String>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReturnColumns {
    nifty: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSector {
    close: Vec<f64>,
    returns: Vec<f64>,
    current: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMarketDocument {
    ohlc: OhlcColumns,
    returns: ReturnColumns,
    vix_series: Vec<f64>,
    sectors: BTreeMap<String, RawSector>,
}

/// Decode a market series document.
pub fn decode_market_series(json: &str) -> Result<MarketSeries> {
    let raw: RawMarketDocument = serde_json::from_str(json)?;
    let bars = zip_bars(raw.ohlc)?;

    let sectors: BTreeMap<String, SectorSeries> = raw
        .sectors
        .into_iter()
        .map(|(name, s)| {
            (
                name,
                SectorSeries {
                    close: s.close,
                    returns: s.returns,
                    current: s.current,
                },
            )
        })
        .collect();

    let series = match raw.returns.nifty {
        Some(returns) if returns.len() == bars.len().saturating_sub(1) => {
            MarketSeries::with_returns(bars, raw.vix_series, returns, sectors)?
        }
        Some(returns) => {
            warn!(
                supplied = returns.len(),
                bars = bars.len(),
                "Return series misaligned with bars, re-deriving from closes"
            );
            MarketSeries::new(bars, raw.vix_series, sectors)
        }
        None => MarketSeries::new(bars, raw.vix_series, sectors),
    };

    debug!(
        bars = series.len(),
        vix_points = series.vix().len(),
        sectors = series.sectors().len(),
        "Decoded market series"
    );
    Ok(series)
}

fn zip_bars(cols: OhlcColumns) -> Result<Vec<OhlcBar>> {
    let n = cols.close.len();
    let lengths = [
        ("dates", cols.dates.len()),
        ("open", cols.open.len()),
        ("high", cols.high.len()),
        ("low", cols.low.len()),
    ];
    for (name, len) in lengths {
        if len != n {
            return Err(Error::data(format!(
                "ohlc column '{name}' has {len} entries, close has {n}"
            )));
        }
    }
    // Volume is informational; a missing column reads as zeros.
    if !cols.volume.is_empty() && cols.volume.len() != n {
        return Err(Error::data(format!(
            "ohlc column 'volume' has {} entries, close has {n}",
            cols.volume.len()
        )));
    }

    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let date = NaiveDate::parse_from_str(cols.dates[i].trim(), DATE_FORMAT)
            .map_err(|e| Error::data(format!("bad bar date '{}': {e}", cols.dates[i])))?;
        bars.push(OhlcBar {
            date,
            open: cols.open[i],
            high: cols.high[i],
            low: cols.low[i],
            close: cols.close[i],
            volume: cols.volume.get(i).copied().unwrap_or(0.0),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DOC: &str = r#"{
        "ohlc": {
            "dates": ["2024-11-25", "2024-11-26", "2024-11-27"],
            "open": [100, 101, 102],
            "high": [101, 102, 103],
            "low": [99, 100, 101],
            "close": [100, 102, 101],
            "volume": [1, 2, 3]
        },
        "returns": {"nifty": [2.0, -0.98]},
        "vix_series": [14.0, 14.5, 13.9],
        "sectors": {"BANKNIFTY": {"close": [50000, 50500], "returns": [1.0], "current": 50500}},
        "spot": 101,
        "vix": 13.9
    }"#;

    #[test]
    fn test_decode_market_series() {
        let series = decode_market_series(DOC).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![100.0, 102.0, 101.0]);
        assert_eq!(series.returns(), &[2.0, -0.98]);
        assert_eq!(series.vix().len(), 3);
        assert_eq!(series.sectors()["BANKNIFTY"].current, Some(50500.0));
        assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2024, 11, 25).unwrap());
    }

    #[test]
    fn test_misaligned_returns_rederived() {
        let doc = DOC.replace(r#""nifty": [2.0, -0.98]"#, r#""nifty": [2.0]"#);
        let series = decode_market_series(&doc).unwrap();
        assert_eq!(series.returns().len(), 2);
        assert_abs_diff_eq!(series.returns()[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_column_length_mismatch() {
        let doc = DOC.replace(r#""high": [101, 102, 103]"#, r#""high": [101, 102]"#);
        let err = decode_market_series(&doc).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_empty_document() {
        let series = decode_market_series("{}").unwrap();
        assert!(series.is_empty());
        assert!(series.returns().is_empty());
    }
}
