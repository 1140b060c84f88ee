//! Core types and configuration for the tradeflow system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (orders, snapshots, order books, trade events)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::ExtractConfig;
pub use error::{Error, Result};
pub use types::*;
