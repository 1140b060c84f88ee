//! Order gap repair.
//!
//! Archive snapshots occasionally drop an order that is still live: the
//! order reappears in a later snapshot although it was issued earlier.
//! Left alone, the diff engine would read the gap as a disappearance
//! followed by a fresh order. Gapped orders are therefore copied back
//! into the intermediate snapshots before the book is handed downstream.

use std::collections::HashSet;
use tradeflow_core::{MarketOrder, OrderId, Snapshot, TypeBook};

/// Backfill gapped orders in every region of a book.
pub fn fill_gaps(book: &mut TypeBook) {
    for snapshots in book.regions.values_mut() {
        fill_region_gaps(snapshots);
    }
}

fn fill_region_gaps(snapshots: &mut [Snapshot]) {
    for i in 0..snapshots.len().saturating_sub(1) {
        let current_time = snapshots[i].snapshot_time;
        let current_ids: HashSet<OrderId> = snapshots[i].orders().map(|o| o.order_id).collect();
        let gapped: Vec<MarketOrder> = snapshots[i + 1]
            .orders()
            .filter(|o| !current_ids.contains(&o.order_id) && o.issued < current_time)
            .cloned()
            .collect();
        for order in gapped {
            backfill(&mut snapshots[..=i], order);
        }
    }
}

/// Copy an order into earlier snapshots, walking backwards until a
/// snapshot predates the order's issue time or already contains it.
fn backfill(snapshots: &mut [Snapshot], order: MarketOrder) {
    for snap in snapshots.iter_mut().rev() {
        if snap.snapshot_time < order.issued || snap.contains(order.order_id) {
            return;
        }
        snap.insert_order(order.clone());
    }
}
