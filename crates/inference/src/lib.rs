//! Trade inference for the tradeflow system.
//!
//! This crate handles:
//! - Volume threshold estimation from historical daily volume
//! - Snapshot differencing and fill/cancel disambiguation

pub mod diff;
pub mod threshold;

pub use diff::DiffEngine;
pub use threshold::ThresholdEstimator;
