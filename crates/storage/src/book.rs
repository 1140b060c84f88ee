//! Order book text parsing.

use std::io::BufRead;
use tradeflow_core::{
    Error, MarketOrder, OrderRange, RegionId, Result, Snapshot, TimestampMs, TypeBook, TypeId,
};

/// Parse one item's decompressed book stream.
///
/// Format: a type-id line and a snapshot-count line, then region blocks
/// until end of stream. Each region block is a region-id line followed by
/// exactly `snapshot_count` snapshots; each snapshot is a
/// `snapshot_time_ms` line, a bid-count line, an ask-count line, then the
/// bid order lines (price descending) and ask order lines (price
/// ascending).
pub fn read_book<R: BufRead>(reader: R) -> Result<TypeBook> {
    let mut lines = LineReader::new(reader);
    let type_id: TypeId = parse(&lines.expect("type id")?, "type id")?;
    let snapshot_count: usize = parse(&lines.expect("snapshot count")?, "snapshot count")?;

    let mut book = TypeBook::new(type_id);
    while let Some(region_line) = lines.next_line()? {
        if region_line.is_empty() {
            break;
        }
        let region_id: RegionId = parse(&region_line, "region id")?;
        let mut snapshots = Vec::with_capacity(snapshot_count);
        for _ in 0..snapshot_count {
            snapshots.push(read_snapshot(&mut lines, type_id, region_id)?);
        }
        book.regions.insert(region_id, snapshots);
    }
    Ok(book)
}

fn read_snapshot<R: BufRead>(
    lines: &mut LineReader<R>,
    type_id: TypeId,
    region_id: RegionId,
) -> Result<Snapshot> {
    let snapshot_time: TimestampMs = parse(&lines.expect("snapshot time")?, "snapshot time")?;
    let bid_count: usize = parse(&lines.expect("bid count")?, "bid count")?;
    let ask_count: usize = parse(&lines.expect("ask count")?, "ask count")?;

    let mut snap = Snapshot::new(snapshot_time);
    for _ in 0..bid_count + ask_count {
        let line = lines.expect("order line")?;
        snap.add_order(parse_order(&line, type_id, region_id)?);
    }
    Ok(snap)
}

/// Parse one 10-field order line:
/// `order_id,buy,issued_ms,price,volume_entered,min_volume,volume,range,location_id,duration`.
///
/// `volume_entered`, `min_volume` and `duration` are carried by the
/// archive but unused here and are dropped after validation.
fn parse_order(line: &str, type_id: TypeId, region_id: RegionId) -> Result<MarketOrder> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 10 {
        return Err(Error::data(format!(
            "order line has {} fields, expected 10: {line:?}",
            fields.len()
        )));
    }
    let _: i64 = parse(fields[4], "volume entered")?;
    let _: i64 = parse(fields[5], "min volume")?;
    let _: i64 = parse(fields[9], "duration")?;

    Ok(MarketOrder {
        order_id: parse(fields[0], "order id")?,
        type_id,
        region_id,
        price: parse(fields[3], "price")?,
        volume: parse(fields[6], "volume")?,
        is_buy: fields[1].eq_ignore_ascii_case("true"),
        range: OrderRange::parse(fields[7])
            .ok_or_else(|| Error::data(format!("bad order range: {:?}", fields[7])))?,
        location_id: parse(fields[8], "location id")?,
        issued: parse(fields[2], "issue time")?,
    })
}

fn parse<T: std::str::FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::data(format!("bad {what}: {field:?}")))
}

/// Line-at-a-time reader with trimming and end-of-stream handling.
struct LineReader<R: BufRead> {
    inner: std::io::Lines<R>,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: reader.lines(),
        }
    }

    /// Next trimmed line, or `None` at end of stream.
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.inner.next() {
            Some(line) => Ok(Some(line?.trim().to_string())),
            None => Ok(None),
        }
    }

    /// Next trimmed line, failing when the stream ends early.
    fn expect(&mut self, what: &str) -> Result<String> {
        self.next_line()?
            .ok_or_else(|| Error::data(format!("unexpected end of book, wanted {what}")))
    }
}
