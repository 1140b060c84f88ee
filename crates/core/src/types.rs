//! Core data types for the tradeflow system.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Tradable item type identifier.
pub type TypeId = u32;

/// Market region identifier.
pub type RegionId = u32;

/// Order identifier, unique within a region at any instant.
pub type OrderId = u64;

/// Station or structure identifier.
pub type LocationId = u64;

/// Advertised matching range of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRange {
    /// Order matches only at its own station.
    Station,
    /// Order matches anywhere in its solar system.
    SolarSystem,
    /// Order matches anywhere in its region.
    Region,
    /// Order matches within the given number of jumps.
    Jumps(u32),
}

impl OrderRange {
    /// Is this order pinned to a single station?
    #[inline]
    pub fn is_station(self) -> bool {
        matches!(self, OrderRange::Station)
    }

    /// Parse the archive's textual range representation.
    pub fn parse(s: &str) -> Option<OrderRange> {
        match s {
            "station" => Some(OrderRange::Station),
            "solarsystem" => Some(OrderRange::SolarSystem),
            "region" => Some(OrderRange::Region),
            _ => s.parse::<u32>().ok().map(OrderRange::Jumps),
        }
    }
}

/// A single resting order in an order-book snapshot.
///
/// Immutable per snapshot; the same `order_id` recurs across snapshots,
/// possibly with a different remaining `volume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Order identifier.
    pub order_id: OrderId,
    /// Item type on offer or demand.
    pub type_id: TypeId,
    /// Region the order is booked in.
    pub region_id: RegionId,
    /// Quoted price.
    pub price: f64,
    /// Remaining quantity (non-negative).
    pub volume: i64,
    /// True for a buy (bid) order.
    pub is_buy: bool,
    /// Advertised matching range.
    pub range: OrderRange,
    /// Station or structure where the order rests.
    pub location_id: LocationId,
    /// Issue time of the order.
    pub issued: TimestampMs,
}

impl MarketOrder {
    /// Execution location attributable to a fill of this order.
    ///
    /// Buy orders not pinned to a station can match anywhere in their
    /// range, so their execution location is unknowable.
    #[inline]
    pub fn trade_location(&self) -> Option<LocationId> {
        if self.is_buy && !self.range.is_station() {
            None
        } else {
            Some(self.location_id)
        }
    }
}

/// The set of live orders for one region at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Capture time of this snapshot.
    pub snapshot_time: TimestampMs,
    /// Buy orders, price descending.
    pub bids: Vec<MarketOrder>,
    /// Sell orders, price ascending.
    pub asks: Vec<MarketOrder>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new(snapshot_time: TimestampMs) -> Self {
        Self {
            snapshot_time,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Append an order on its side without re-sorting.
    ///
    /// The archive stores each side already price-ordered, so parsing
    /// appends in place.
    pub fn add_order(&mut self, order: MarketOrder) {
        if order.is_buy {
            self.bids.push(order);
        } else {
            self.asks.push(order);
        }
    }

    /// Insert an order at its price position on its side.
    pub fn insert_order(&mut self, order: MarketOrder) {
        if order.is_buy {
            // Bids ordered by price descending
            let at = self
                .bids
                .iter()
                .position(|b| OrderedFloat(b.price) < OrderedFloat(order.price))
                .unwrap_or(self.bids.len());
            self.bids.insert(at, order);
        } else {
            // Asks ordered by price ascending
            let at = self
                .asks
                .iter()
                .position(|a| OrderedFloat(a.price) > OrderedFloat(order.price))
                .unwrap_or(self.asks.len());
            self.asks.insert(at, order);
        }
    }

    /// Does this snapshot hold an order with the given id?
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders().any(|o| o.order_id == order_id)
    }

    /// Iterate over all orders, bids first.
    pub fn orders(&self) -> impl Iterator<Item = &MarketOrder> {
        self.bids.iter().chain(self.asks.iter())
    }

    /// Total number of orders.
    pub fn order_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

/// One item's order book for one date: the ordered snapshot sequence
/// for every region the item was observed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeBook {
    /// Item type this book belongs to.
    pub type_id: TypeId,
    /// Snapshot sequences keyed by region, each strictly time-ascending.
    pub regions: BTreeMap<RegionId, Vec<Snapshot>>,
}

impl TypeBook {
    /// Create an empty book.
    pub fn new(type_id: TypeId) -> Self {
        Self {
            type_id,
            regions: BTreeMap::new(),
        }
    }

    /// Regions observed in this book.
    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.keys().copied()
    }

    /// Total order count across all regions and snapshots.
    pub fn order_count(&self) -> usize {
        self.regions
            .values()
            .flat_map(|snaps| snaps.iter())
            .map(Snapshot::order_count)
            .sum()
    }

    /// A book with no orders produces no trades and is skipped by the
    /// batching layer.
    pub fn is_empty(&self) -> bool {
        self.order_count() == 0
    }
}

/// An inferred trade, created once by the diff engine and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Time of the later snapshot in the pair that evidenced the trade.
    pub timestamp: TimestampMs,
    /// Region the trade occurred in.
    pub region_id: RegionId,
    /// Item type traded.
    pub type_id: TypeId,
    /// True when derived from a volume decrease on a still-present order;
    /// false when derived from an order's disappearance.
    pub actual: bool,
    /// Side of the resting order.
    pub is_buy: bool,
    /// Resting order the trade executed against.
    pub order_id: OrderId,
    /// Trade price.
    pub price: f64,
    /// Inferred traded quantity. Negative when a persisted order's
    /// displayed volume increased.
    pub volume: i64,
    /// Execution location, if attributable.
    pub location: Option<LocationId>,
}

/// One day of historical trading volume for a (type, region) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyVolume {
    /// Market day.
    pub date: NaiveDate,
    /// Total volume traded that day.
    pub volume: i64,
}

/// Historical daily-volume series, partitioned by (type, region) and
/// date-ascending within each series.
pub type VolumeHistory = BTreeMap<(TypeId, RegionId), Vec<DailyVolume>>;
