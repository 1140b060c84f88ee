//! Configuration structures for trade extraction.

use serde::{Deserialize, Serialize};

/// Main configuration for a trade extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Maximum number of item order books held in memory per batch.
    pub batch_size: usize,
    /// Volume threshold configuration.
    pub threshold: ThresholdConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            batch_size: 200,
            threshold: ThresholdConfig::default(),
        }
    }
}

/// Volume threshold estimation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Fraction of the trailing average daily volume below which a
    /// disappeared order counts as a fill rather than a cancellation.
    pub ratio: f64,
    /// Trailing moving-average window in days.
    pub window: usize,
    /// Days of history requested before the compute date.
    pub lookback_days: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ratio: 0.04,
            window: 5,
            lookback_days: 6,
        }
    }
}
