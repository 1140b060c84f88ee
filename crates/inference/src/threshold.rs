//! Volume threshold estimation from historical daily volume.
//!
//! A disappeared order plausibly represents a fill only when its remaining
//! volume is small relative to recent trading activity; anything larger is
//! more likely a cancellation. The cutoff is a fixed fraction of the
//! trailing average daily volume.

use std::collections::{BTreeSet, HashMap};
use tradeflow_core::config::ThresholdConfig;
use tradeflow_core::{DailyVolume, RegionId, TypeId, VolumeHistory};

/// Estimates per-type "small trade" cutoffs for one batch.
#[derive(Debug, Clone)]
pub struct ThresholdEstimator {
    /// Fraction of the trailing average applied as the cutoff.
    ratio: f64,
    /// Trailing moving-average window in days.
    window: usize,
}

impl ThresholdEstimator {
    /// Create an estimator from configuration.
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            ratio: config.ratio,
            window: config.window,
        }
    }

    /// Threshold for a single daily-volume series.
    ///
    /// Takes the mean of the up-to-`window` most recent days (trailing,
    /// non-centered) and scales it by the ratio. An empty series yields 0,
    /// so only orders with residual volume <= 0 would qualify as fills.
    pub fn estimate(&self, series: &[DailyVolume]) -> f64 {
        if series.is_empty() {
            return 0.0;
        }
        let tail = &series[series.len().saturating_sub(self.window)..];
        let sum: i64 = tail.iter().map(|d| d.volume).sum();
        sum as f64 / tail.len() as f64 * self.ratio
    }

    /// Per-type threshold map for one batch.
    ///
    /// History is partitioned by (type, region) but the map is keyed by
    /// type alone: the canonical series for each type is the one from the
    /// lowest region id with any data. A type with no history in any
    /// region gets threshold 0.
    pub fn threshold_map(
        &self,
        types: &BTreeSet<TypeId>,
        history: &VolumeHistory,
    ) -> HashMap<TypeId, f64> {
        let mut map = HashMap::with_capacity(types.len());
        for &type_id in types {
            let series = history
                .range((type_id, RegionId::MIN)..=(type_id, RegionId::MAX))
                .map(|(_, series)| series)
                .find(|series| !series.is_empty());
            map.insert(type_id, series.map_or(0.0, |s| self.estimate(s)));
        }
        map
    }
}

impl Default for ThresholdEstimator {
    fn default() -> Self {
        Self::new(&ThresholdConfig::default())
    }
}
