//! Option chain decoding.
//!
//! Accepts the exchange's raw option-chain document
//! (`{records: {timestamp, underlyingValue, data, expiryDates}}`) or a bare
//! array of strike records, and normalizes it into an [`OptionChainSnapshot`]
//! for the nearest expiry.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use tradyx_core::{Error, OptionChainSnapshot, OptionLeg, Result, StrikeRecord};

/// Exchange timestamp format, e.g. `28-Nov-2024 15:30:00`.
pub const CHAIN_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";
/// Exchange expiry format, e.g. `28-Nov-2024`.
pub const EXPIRY_FORMAT: &str = "%d-%b-%Y";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLeg {
    open_interest: Option<f64>,
    changein_open_interest: Option<f64>,
    implied_volatility: Option<f64>,
    last_price: Option<f64>,
    total_traded_volume: Option<f64>,
}

impl From<RawLeg> for OptionLeg {
    fn from(raw: RawLeg) -> Self {
        OptionLeg {
            open_interest: raw.open_interest.unwrap_or(0.0),
            change_in_oi: raw.changein_open_interest.unwrap_or(0.0),
            implied_volatility: raw.implied_volatility.unwrap_or(0.0),
            last_price: raw.last_price.unwrap_or(0.0),
            traded_volume: raw.total_traded_volume.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "strikePrice")]
    strike: Option<f64>,
    #[serde(rename = "expiryDate", default)]
    expiry: Option<String>,
    #[serde(rename = "CE", default)]
    call: Option<RawLeg>,
    #[serde(rename = "PE", default)]
    put: Option<RawLeg>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRecords {
    timestamp: Option<String>,
    underlying_value: Option<f64>,
    data: Vec<RawRecord>,
    expiry_dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    records: RawRecords,
}

/// Decode an option chain document.
///
/// `fallback_timestamp` is used when the document carries no parseable
/// exchange timestamp. Records for expiries other than the nearest are
/// dropped; strikes are unique and ascending in the result.
pub fn decode_chain(json: &str, fallback_timestamp: NaiveDateTime) -> Result<OptionChainSnapshot> {
    let value: Value = serde_json::from_str(json)?;
    let raw = match value {
        Value::Array(_) => RawRecords {
            data: serde_json::from_value(value)?,
            ..Default::default()
        },
        Value::Object(_) => serde_json::from_value::<RawDocument>(value)?.records,
        _ => return Err(Error::data("option chain must be an object or an array")),
    };

    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(|ts| NaiveDateTime::parse_from_str(ts.trim(), CHAIN_TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| {
            debug!("Chain timestamp missing or unparseable, using fallback");
            fallback_timestamp
        });

    let nearest = nearest_expiry(&raw);
    let total = raw.data.len();

    let records: Vec<StrikeRecord> = raw
        .data
        .into_iter()
        .filter(|r| match (&nearest, r.expiry.as_deref().and_then(parse_expiry)) {
            (Some(nearest), Some(expiry)) => expiry == *nearest,
            _ => true,
        })
        .filter_map(|r| {
            let strike = r.strike?;
            Some(StrikeRecord {
                strike,
                call: r.call.map(OptionLeg::from),
                put: r.put.map(OptionLeg::from),
            })
        })
        .collect();

    if records.is_empty() && total > 0 {
        warn!(total, "No usable strike records in option chain");
    }

    let snapshot = OptionChainSnapshot::new(records, timestamp, raw.underlying_value);
    debug!(
        strikes = snapshot.len(),
        raw_records = total,
        expiry = ?nearest,
        "Decoded option chain"
    );
    Ok(snapshot)
}

fn parse_expiry(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), EXPIRY_FORMAT).ok()
}

/// Earliest expiry listed in the document or on any record.
fn nearest_expiry(raw: &RawRecords) -> Option<NaiveDate> {
    raw.expiry_dates
        .iter()
        .map(String::as_str)
        .chain(raw.data.iter().filter_map(|r| r.expiry.as_deref()))
        .filter_map(parse_expiry)
        .min()
}
