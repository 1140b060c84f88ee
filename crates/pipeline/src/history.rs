//! Historical daily-volume lookup interface.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;
use tradeflow_core::{RegionId, Result, TypeId, VolumeHistory};

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create an inclusive range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Lookback window for a compute date: the `days` days ending the day
    /// before the compute date. The compute date itself is excluded.
    pub fn lookback(compute_date: NaiveDate, days: u32) -> Self {
        Self {
            start: compute_date - Duration::days(i64::from(days)),
            end: compute_date - Duration::days(1),
        }
    }

    /// Iterate the days of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Source of historical daily trading volume.
///
/// Purely local lookup; implementations never perform network retrieval.
/// Missing data for a (type, region) yields an empty series, not an
/// error: a history gap merely drops that type's threshold to 0.
pub trait HistoryProvider {
    /// Daily-volume series for every requested (type, region) pair over
    /// the given range.
    fn daily_volumes(
        &self,
        range: DateRange,
        types: &BTreeSet<TypeId>,
        regions: &BTreeSet<RegionId>,
    ) -> Result<VolumeHistory>;
}
