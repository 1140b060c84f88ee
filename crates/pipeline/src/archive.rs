//! Archive streaming over a pluggable snapshot source.

use chrono::NaiveDate;
use tradeflow_core::{Result, TypeBook};

/// Lazy, finite, non-restartable sequence of per-item order books.
pub type BookIter = Box<dyn Iterator<Item = Result<TypeBook>>>;

/// Source of per-item order books for one date, in archive-native order
/// (not necessarily type-id order).
///
/// Implementations own snapshot reconstruction entirely, including any
/// gap-filling; consumers only see the resulting book sequence.
pub trait SnapshotSource {
    /// Begin streaming the date's items.
    ///
    /// Fails with `Error::ArchiveUnavailable` when the per-date backing
    /// resource cannot be located.
    fn stream_items(&self, date: NaiveDate) -> Result<BookIter>;
}

/// Iterator over one date's archive.
///
/// Opening performs no history queries and no classification; it only
/// positions the underlying resource. An unavailable archive is fatal for
/// the whole run: no partial output is valid, and the caller must report
/// failure and stop rather than retry or fall back.
pub struct ArchiveStream {
    inner: BookIter,
}

impl ArchiveStream {
    /// Open the archive for a date.
    pub fn open(source: &dyn SnapshotSource, date: NaiveDate) -> Result<Self> {
        Ok(Self {
            inner: source.stream_items(date)?,
        })
    }
}

impl Iterator for ArchiveStream {
    type Item = Result<TypeBook>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
