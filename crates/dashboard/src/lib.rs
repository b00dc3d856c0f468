//! Dashboard assembly for the tradyx analytics pipeline.
//!
//! This crate handles:
//! - Running the five leaf engines over one set of snapshots
//! - Merging their outputs into the dashboard payload
//! - The `tradyx-build` batch binary

pub mod assembler;
pub mod pipeline;

pub use assembler::{DashboardAssembler, DashboardPayload, LatestOhlc, LeafOutputs};
pub use pipeline::{Pipeline, Snapshots};
