//! Bulk market history provider.

use chrono::{DateTime, Datelike, NaiveDate};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use tradeflow_core::{DailyVolume, Error, RegionId, Result, TypeId, VolumeHistory};
use tradeflow_pipeline::history::{DateRange, HistoryProvider};

/// File-backed daily market history.
///
/// Each date's history lives in `market_<YYYYMMDD>.bulk`: one CSV line
/// per (type, region), fields
/// `type_id,region_id,order_count,low,high,avg,volume,date_ms`.
/// A missing day's file contributes nothing, and a requested (type,
/// region) with no rows anywhere yields an empty series. History gaps
/// are never errors; they only drop thresholds to 0 downstream.
pub struct BulkHistoryProvider {
    data_dir: PathBuf,
    tree: bool,
}

impl BulkHistoryProvider {
    /// Create a provider over a local data directory.
    pub fn new(data_dir: impl Into<PathBuf>, tree: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            tree,
        }
    }

    fn day_path(&self, day: NaiveDate) -> PathBuf {
        let dir = if self.tree {
            self.data_dir.join(format!(
                "{:04}/{:02}/{:02}",
                day.year(),
                day.month(),
                day.day()
            ))
        } else {
            self.data_dir.clone()
        };
        dir.join(format!("market_{}.bulk", day.format("%Y%m%d")))
    }
}

impl HistoryProvider for BulkHistoryProvider {
    fn daily_volumes(
        &self,
        range: DateRange,
        types: &BTreeSet<TypeId>,
        regions: &BTreeSet<RegionId>,
    ) -> Result<VolumeHistory> {
        let mut history = VolumeHistory::new();
        for day in range.days() {
            let path = self.day_path(day);
            if !path.exists() {
                debug!(%day, "no history file for day");
                continue;
            }
            read_day(&path, types, regions, &mut history)?;
        }
        Ok(history)
    }
}

fn read_day(
    path: &Path,
    types: &BTreeSet<TypeId>,
    regions: &BTreeSet<RegionId>,
    history: &mut VolumeHistory,
) -> Result<()> {
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (type_id, region_id, daily) = parse_history_line(line)?;
        if types.contains(&type_id) && regions.contains(&region_id) {
            history.entry((type_id, region_id)).or_default().push(daily);
        }
    }
    Ok(())
}

fn parse_history_line(line: &str) -> Result<(TypeId, RegionId, DailyVolume)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 8 {
        return Err(Error::data(format!(
            "history line has {} fields, expected 8: {line:?}",
            fields.len()
        )));
    }
    let type_id: TypeId = parse(fields[0], "type id")?;
    let region_id: RegionId = parse(fields[1], "region id")?;
    let volume: i64 = parse(fields[6], "volume")?;
    let date_ms: i64 = parse(fields[7], "history date")?;
    let date = DateTime::from_timestamp_millis(date_ms)
        .ok_or_else(|| Error::data(format!("history date out of range: {date_ms}")))?
        .date_naive();
    Ok((type_id, region_id, DailyVolume { date, volume }))
}

fn parse<T: std::str::FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::data(format!("bad {what}: {field:?}")))
}
