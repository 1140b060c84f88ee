//! Streaming extraction pipeline for the tradeflow system.
//!
//! This crate handles:
//! - Archive streaming over a pluggable snapshot source
//! - Bounded-memory batch accumulation
//! - Trade event ordering and serialization
//! - The end-to-end extraction driver

pub mod archive;
pub mod batch;
pub mod extract;
pub mod history;
pub mod sink;

pub use archive::{ArchiveStream, SnapshotSource};
pub use batch::BatchAccumulator;
pub use extract::extract_trades;
pub use history::{DateRange, HistoryProvider};
pub use sink::TradeSink;
