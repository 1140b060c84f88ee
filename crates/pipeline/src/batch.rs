//! Bounded-memory batch accumulation.
//!
//! The archive is far larger than memory, so item order books are
//! buffered in fixed-size batches. Each flush derives its own type and
//! region sets, queries history for exactly that scope, computes the
//! per-type thresholds, diffs every region and hands the resulting trades
//! to the sink before the next batch starts.

use crate::history::{DateRange, HistoryProvider};
use crate::sink::TradeSink;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tracing::debug;
use tradeflow_core::{
    ExtractConfig, RegionId, Result, Snapshot, TimestampMs, TypeBook, TypeId,
};
use tradeflow_inference::{DiffEngine, ThresholdEstimator};

/// Accumulates item order books and flushes them in bounded batches.
///
/// At most `batch_size` books are held at once. The volume threshold for
/// a flush is computed from history scoped to that batch's region set,
/// not globally: small batches see coarser-scoped history queries with
/// identical per-region math.
pub struct BatchAccumulator<'a, W: Write> {
    compute_date: NaiveDate,
    batch_size: usize,
    lookback_days: u32,
    estimator: ThresholdEstimator,
    history: &'a dyn HistoryProvider,
    sink: &'a mut TradeSink<W>,
    buffer: Vec<TypeBook>,
}

impl<'a, W: Write> BatchAccumulator<'a, W> {
    /// Create an accumulator for one compute date.
    pub fn new(
        compute_date: NaiveDate,
        config: &ExtractConfig,
        history: &'a dyn HistoryProvider,
        sink: &'a mut TradeSink<W>,
    ) -> Self {
        Self {
            compute_date,
            batch_size: config.batch_size,
            lookback_days: config.threshold.lookback_days,
            estimator: ThresholdEstimator::new(&config.threshold),
            history,
            sink,
            buffer: Vec::with_capacity(config.batch_size),
        }
    }

    /// Buffer one item's order book; flush when the batch fills.
    ///
    /// A book with no orders at all cannot produce trades and does not
    /// count toward the batch.
    pub fn offer(&mut self, book: TypeBook) -> Result<()> {
        if book.is_empty() {
            return Ok(());
        }
        self.buffer.push(book);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush any remaining partial batch. An empty buffer is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let books = std::mem::take(&mut self.buffer);
        let types: BTreeSet<TypeId> = books.iter().map(|b| b.type_id).collect();
        let regions: BTreeSet<RegionId> = books.iter().flat_map(|b| b.region_ids()).collect();
        debug!(
            types = types.len(),
            regions = regions.len(),
            "processing batch"
        );

        let range = DateRange::lookback(self.compute_date, self.lookback_days);
        let history = self.history.daily_volumes(range, &types, &regions)?;
        let thresholds = self.estimator.threshold_map(&types, &history);
        let engine = DiffEngine::new(&types, &thresholds);

        let mut trades = Vec::new();
        for (region_id, snapshots) in merge_by_region(books) {
            trades.extend(engine.diff_region(region_id, &snapshots));
        }
        debug!(trades = trades.len(), "batch complete");
        self.sink.write_batch(trades)
    }
}

/// Merge a batch's books into one snapshot sequence per region.
///
/// Orders from different items captured at the same instant in the same
/// region fold into a single snapshot, keyed by exact capture time.
/// Snapshots with no orders are invisible to the merge, so consecutive
/// pairs always span order-bearing states.
fn merge_by_region(books: Vec<TypeBook>) -> BTreeMap<RegionId, Vec<Snapshot>> {
    let mut grouped: BTreeMap<RegionId, BTreeMap<TimestampMs, Snapshot>> = BTreeMap::new();
    for book in books {
        for (region_id, snapshots) in book.regions {
            let merged = grouped.entry(region_id).or_default();
            for snap in snapshots {
                if snap.order_count() == 0 {
                    continue;
                }
                let slot = merged
                    .entry(snap.snapshot_time)
                    .or_insert_with(|| Snapshot::new(snap.snapshot_time));
                slot.bids.extend(snap.bids);
                slot.asks.extend(snap.asks);
            }
        }
    }
    grouped
        .into_iter()
        .map(|(region_id, by_time)| (region_id, by_time.into_values().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tradeflow_core::{DailyVolume, MarketOrder, OrderRange, VolumeHistory};

    const REGION: RegionId = 10000002;

    /// Canned history that records the scope of every query.
    struct StaticHistory {
        data: VolumeHistory,
        queries: RefCell<Vec<(DateRange, Vec<TypeId>, Vec<RegionId>)>>,
    }

    impl StaticHistory {
        fn empty() -> Self {
            Self {
                data: VolumeHistory::new(),
                queries: RefCell::new(Vec::new()),
            }
        }

        fn with_series(type_id: TypeId, region_id: RegionId, volumes: &[i64]) -> Self {
            let start = NaiveDate::from_ymd_opt(2017, 3, 4).unwrap();
            let series = volumes
                .iter()
                .enumerate()
                .map(|(i, &volume)| DailyVolume {
                    date: start + chrono::Duration::days(i as i64),
                    volume,
                })
                .collect();
            let mut data = VolumeHistory::new();
            data.insert((type_id, region_id), series);
            Self {
                data,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl HistoryProvider for StaticHistory {
        fn daily_volumes(
            &self,
            range: DateRange,
            types: &BTreeSet<TypeId>,
            regions: &BTreeSet<RegionId>,
        ) -> Result<VolumeHistory> {
            self.queries.borrow_mut().push((
                range,
                types.iter().copied().collect(),
                regions.iter().copied().collect(),
            ));
            Ok(self.data.clone())
        }
    }

    fn make_order(order_id: u64, type_id: TypeId, volume: i64) -> MarketOrder {
        MarketOrder {
            order_id,
            type_id,
            region_id: REGION,
            price: 5.0,
            volume,
            is_buy: false,
            range: OrderRange::Station,
            location_id: 60003760,
            issued: 0,
        }
    }

    fn make_book(type_id: TypeId, volumes: &[(i64, i64)]) -> TypeBook {
        // one order per snapshot: (snapshot_time, volume)
        let mut book = TypeBook::new(type_id);
        let snapshots = volumes
            .iter()
            .map(|&(time, volume)| {
                let mut snap = Snapshot::new(time);
                snap.add_order(make_order(u64::from(type_id), type_id, volume));
                snap
            })
            .collect();
        book.regions.insert(REGION, snapshots);
        book
    }

    fn compute_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, 10).unwrap()
    }

    fn small_batch_config(batch_size: usize) -> ExtractConfig {
        ExtractConfig {
            batch_size,
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn test_flush_at_batch_size() {
        let history = StaticHistory::empty();
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(2);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        acc.offer(make_book(34, &[(1000, 10), (2000, 4)])).unwrap();
        assert!(history.queries.borrow().is_empty());

        acc.offer(make_book(35, &[(1000, 8), (2000, 8)])).unwrap();
        assert_eq!(history.queries.borrow().len(), 1);

        acc.finish().unwrap();
        assert_eq!(history.queries.borrow().len(), 1);
    }

    #[test]
    fn test_finish_flushes_partial_batch() {
        let history = StaticHistory::empty();
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(200);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        acc.offer(make_book(34, &[(1000, 10), (2000, 4)])).unwrap();
        assert!(history.queries.borrow().is_empty());
        acc.finish().unwrap();
        assert_eq!(history.queries.borrow().len(), 1);
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn test_finish_on_empty_buffer_is_noop() {
        let history = StaticHistory::empty();
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(200);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        acc.finish().unwrap();
        assert!(history.queries.borrow().is_empty());
    }

    #[test]
    fn test_empty_books_do_not_count() {
        let history = StaticHistory::empty();
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(2);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        acc.offer(TypeBook::new(34)).unwrap();
        acc.offer(TypeBook::new(35)).unwrap();
        acc.offer(TypeBook::new(36)).unwrap();
        assert!(history.queries.borrow().is_empty());
    }

    #[test]
    fn test_history_scope_matches_batch() {
        let history = StaticHistory::empty();
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(200);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        let mut book = make_book(34, &[(1000, 10), (2000, 4)]);
        let mut far_snap = Snapshot::new(1000);
        let mut far_order = make_order(7, 34, 20);
        far_order.region_id = 10000043;
        far_snap.add_order(far_order);
        book.regions.insert(10000043, vec![far_snap]);

        acc.offer(book).unwrap();
        acc.offer(make_book(35, &[(1000, 8), (2000, 3)])).unwrap();
        acc.finish().unwrap();

        let queries = history.queries.borrow();
        let (range, types, regions) = &queries[0];
        assert_eq!(types, &vec![34, 35]);
        assert_eq!(regions, &vec![REGION, 10000043]);
        assert_eq!(
            range.start,
            NaiveDate::from_ymd_opt(2017, 3, 4).unwrap()
        );
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2017, 3, 9).unwrap());
    }

    #[test]
    fn test_threshold_drives_inferred_trades_end_to_end() {
        // 5-day average 100 * 0.04 = threshold 4
        let history = StaticHistory::with_series(34, REGION, &[100, 100, 100, 100, 100]);
        let mut sink = TradeSink::new(Vec::new());
        let config = small_batch_config(200);
        let mut acc = BatchAccumulator::new(compute_date(), &config, &history, &mut sink);

        // one disappearance below the threshold, one above
        let mut book = TypeBook::new(34);
        let mut first = Snapshot::new(1000);
        first.add_order(make_order(1, 34, 3));
        first.add_order(make_order(2, 34, 50));
        let mut second = Snapshot::new(2000);
        second.add_order(make_order(3, 34, 10));
        book.regions.insert(REGION, vec![first, second]);
        acc.offer(book).unwrap();
        acc.finish().unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "34");
        assert_eq!(lines[3], "1");
        assert_eq!(lines[4], "2000,False,False,1,5.00,3,60003760");
    }

    #[test]
    fn test_merge_by_region_folds_same_instant() {
        let book_a = make_book(34, &[(1000, 10), (2000, 10)]);
        let book_b = make_book(35, &[(1000, 5), (2000, 5)]);
        let merged = merge_by_region(vec![book_a, book_b]);

        let snapshots = &merged[&REGION];
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].order_count(), 2);
        assert_eq!(snapshots[1].order_count(), 2);
    }

    #[test]
    fn test_merge_by_region_skips_orderless_snapshots() {
        let mut book = TypeBook::new(34);
        let mut live = Snapshot::new(1000);
        live.add_order(make_order(1, 34, 10));
        book.regions.insert(REGION, vec![live, Snapshot::new(2000)]);

        let merged = merge_by_region(vec![book]);
        assert_eq!(merged[&REGION].len(), 1);
    }
}
