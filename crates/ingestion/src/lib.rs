//! Snapshot decoding and normalization for the tradyx analytics engines.
//!
//! This crate handles:
//! - Option chain documents (exchange format or bare record arrays)
//! - Columnar market series documents
//! - Spot / VIX snapshots

pub mod chain;
pub mod market;
pub mod spot;

pub use chain::decode_chain;
pub use market::decode_market_series;
pub use spot::decode_spot_snapshot;
