//! Snapshot differencing: turning consecutive order-book states into
//! inferred trade events.
//!
//! Two evidence classes per snapshot pair. An order present in both
//! snapshots with a changed volume is an "actual" trade against the
//! resting order. An order present only in the earlier snapshot is an
//! "inferred" trade when its remaining volume sits at or below the
//! per-type threshold; above the threshold the disappearance is treated
//! as a cancellation and produces nothing.

use std::collections::{BTreeSet, HashMap};
use tradeflow_core::{MarketOrder, OrderId, RegionId, Snapshot, TradeEvent, TypeId};

/// Diff engine for one batch, shared across that batch's regions.
pub struct DiffEngine<'a> {
    /// Types eligible for trade events in this batch.
    type_set: &'a BTreeSet<TypeId>,
    /// Per-type volume cutoffs for disappearance classification.
    thresholds: &'a HashMap<TypeId, f64>,
}

impl<'a> DiffEngine<'a> {
    /// Create a diff engine over a batch's type set and threshold map.
    pub fn new(type_set: &'a BTreeSet<TypeId>, thresholds: &'a HashMap<TypeId, f64>) -> Self {
        Self {
            type_set,
            thresholds,
        }
    }

    /// Trade events for one region's ordered snapshot sequence.
    ///
    /// Consecutive snapshot pairs are processed in time order; a sequence
    /// with fewer than two snapshots produces nothing. Events only depend
    /// on their own pair, so the output is order-independent and stable
    /// across reruns.
    pub fn diff_region(&self, region_id: RegionId, snapshots: &[Snapshot]) -> Vec<TradeEvent> {
        let mut events = Vec::new();
        for pair in snapshots.windows(2) {
            self.diff_pair(region_id, &pair[0], &pair[1], &mut events);
        }
        events
    }

    fn diff_pair(
        &self,
        region_id: RegionId,
        current: &Snapshot,
        next: &Snapshot,
        events: &mut Vec<TradeEvent>,
    ) {
        let next_by_id: HashMap<OrderId, &MarketOrder> =
            next.orders().map(|o| (o.order_id, o)).collect();

        for order in current.orders() {
            if !self.type_set.contains(&order.type_id) {
                continue;
            }
            match next_by_id.get(&order.order_id) {
                Some(later) => {
                    // A volume increase is emitted as a negative amount
                    // rather than filtered out.
                    if later.volume != order.volume {
                        events.push(TradeEvent {
                            timestamp: next.snapshot_time,
                            region_id,
                            type_id: order.type_id,
                            actual: true,
                            is_buy: order.is_buy,
                            order_id: order.order_id,
                            price: later.price,
                            volume: order.volume - later.volume,
                            location: order.trade_location(),
                        });
                    }
                }
                None => {
                    let threshold = self.thresholds.get(&order.type_id).copied().unwrap_or(0.0);
                    if order.volume as f64 <= threshold {
                        events.push(TradeEvent {
                            timestamp: next.snapshot_time,
                            region_id,
                            type_id: order.type_id,
                            actual: false,
                            is_buy: order.is_buy,
                            order_id: order.order_id,
                            price: order.price,
                            volume: order.volume,
                            location: order.trade_location(),
                        });
                    }
                }
            }
        }
    }
}
