//! Trade event ordering and serialization.
//!
//! Output is one text document per run. For each distinct type id in
//! ascending order: a line with the type id, a line with the count of
//! distinct regions having trades for that type; then for each region in
//! ascending order: a line with the region id, a line with the region's
//! trade count, then one comma-separated line per trade:
//! `epoch_ms,actual,is_buy,order_id,price,volume,location` with booleans
//! rendered `True`/`False`, price fixed to two decimals and an
//! unattributable location rendered as the literal `None`.

use std::io::Write;
use tradeflow_core::{Result, TradeEvent};

/// Orders and serializes accumulated trade events.
///
/// Each batch is sorted and written independently, so every flush is
/// internally ordered by (type, region, timestamp) but the output stream
/// as a whole carries no cross-batch ordering guarantee.
pub struct TradeSink<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> TradeSink<W> {
    /// Create a sink over a writer.
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Sort and write one batch's trades.
    pub fn write_batch(&mut self, mut trades: Vec<TradeEvent>) -> Result<()> {
        trades.sort_by(|a, b| {
            (a.type_id, a.region_id, a.timestamp).cmp(&(b.type_id, b.region_id, b.timestamp))
        });

        let mut start = 0;
        while start < trades.len() {
            let type_id = trades[start].type_id;
            let end = start
                + trades[start..]
                    .iter()
                    .take_while(|t| t.type_id == type_id)
                    .count();
            self.write_type_group(&trades[start..end])?;
            start = end;
        }

        self.written += trades.len();
        Ok(())
    }

    /// Write one type's trades, already sorted by (region, timestamp).
    fn write_type_group(&mut self, trades: &[TradeEvent]) -> Result<()> {
        let region_count = 1 + trades
            .windows(2)
            .filter(|w| w[0].region_id != w[1].region_id)
            .count();
        writeln!(self.out, "{}", trades[0].type_id)?;
        writeln!(self.out, "{}", region_count)?;

        let mut start = 0;
        while start < trades.len() {
            let region_id = trades[start].region_id;
            let end = start
                + trades[start..]
                    .iter()
                    .take_while(|t| t.region_id == region_id)
                    .count();
            writeln!(self.out, "{}", region_id)?;
            writeln!(self.out, "{}", end - start)?;
            for trade in &trades[start..end] {
                self.write_trade(trade)?;
            }
            start = end;
        }
        Ok(())
    }

    fn write_trade(&mut self, trade: &TradeEvent) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{:.2},{},{}",
            trade.timestamp,
            fmt_bool(trade.actual),
            fmt_bool(trade.is_buy),
            trade.order_id,
            trade.price,
            trade.volume,
            trade
                .location
                .map_or_else(|| "None".to_string(), |id| id.to_string()),
        )?;
        Ok(())
    }

    /// Total trades written across all batches.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Consume the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn fmt_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
