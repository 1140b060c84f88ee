//! Bulk archive storage for the tradeflow system.
//!
//! This crate handles:
//! - Archive index parsing and byte-range reconstruction
//! - Order book text parsing and gap repair
//! - File-backed snapshot source and history provider

pub mod book;
pub mod gaps;
pub mod history;
pub mod index;
pub mod source;

pub use history::BulkHistoryProvider;
pub use source::BulkSnapshotSource;
