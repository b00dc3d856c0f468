//! Core types and configuration for the tradyx analytics engines.
//!
//! This crate provides shared types used across all other crates:
//! - Input snapshots (option chain, market series, spot / VIX)
//! - Engine output records and regime labels
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{ensure_history, Error, Result};
pub use types::*;
