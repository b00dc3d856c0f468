//! Spot / VIX snapshot decoding.

use tracing::{debug, warn};
use tradyx_core::{Result, SpotSnapshot};

/// Decode the spot / VIX document. Every field is optional at this stage;
/// the pipeline decides which absences are fatal.
pub fn decode_spot_snapshot(json: &str) -> Result<SpotSnapshot> {
    let mut snapshot: SpotSnapshot = serde_json::from_str(json)?;

    // Non-finite or non-positive quotes are treated as absent.
    snapshot.spot = snapshot.spot.filter(|s| s.is_finite() && *s > 0.0);
    snapshot.vix = snapshot.vix.filter(|v| v.is_finite() && *v > 0.0);

    if snapshot.spot.is_none() {
        warn!("Spot snapshot has no usable spot price");
    }
    debug!(
        spot = ?snapshot.spot,
        vix = ?snapshot.vix,
        vix_daily = snapshot.vix_daily.len(),
        "Decoded spot snapshot"
    );
    Ok(snapshot)
}
