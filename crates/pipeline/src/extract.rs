//! End-to-end extraction driver.

use crate::archive::{ArchiveStream, SnapshotSource};
use crate::batch::BatchAccumulator;
use crate::history::HistoryProvider;
use crate::sink::TradeSink;
use chrono::NaiveDate;
use std::io::Write;
use tracing::{debug, info};
use tradeflow_core::{ExtractConfig, Result};

/// Stream one date's archive and write every inferred trade to the sink.
///
/// Processing is strictly ordered: archive order, then batch order, then
/// per-region diff order, then write order. The first unavailable or
/// malformed resource aborts the run; there are no retries and no remote
/// fallback for missing inputs.
pub fn extract_trades<W: Write>(
    date: NaiveDate,
    source: &dyn SnapshotSource,
    history: &dyn HistoryProvider,
    sink: &mut TradeSink<W>,
    config: &ExtractConfig,
) -> Result<()> {
    let stream = ArchiveStream::open(source, date)?;
    let mut accumulator = BatchAccumulator::new(date, config, history, sink);

    let mut items = 0usize;
    for book in stream {
        accumulator.offer(book?)?;
        items += 1;
        if items % 1000 == 0 {
            debug!(items, "streaming archive");
        }
    }
    accumulator.finish()?;

    sink.flush()?;
    info!(items, trades = sink.written(), %date, "extraction complete");
    Ok(())
}
