//! Bulk archive snapshot source.

use crate::book::read_book;
use crate::gaps::fill_gaps;
use crate::index::{read_index, ByteSpan};
use chrono::{Datelike, NaiveDate};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use tracing::debug;
use tradeflow_core::{Error, Result, TypeBook, TypeId};
use tradeflow_pipeline::archive::{BookIter, SnapshotSource};

/// Snapshot interval of the archived books, in minutes. Part of the
/// archive's file naming scheme.
const INTERVAL_MINUTES: u32 = 5;

/// Archive-backed snapshot source reading per-date bulk files.
///
/// Layout per date: `interval_<YYYYMMDD>_5.bulk` holds one gzip member
/// per item and `interval_<YYYYMMDD>_5.index.gz` maps each item to its
/// byte offset. With the tree layout the files live under `YYYY/MM/DD/`
/// inside the data directory; otherwise directly inside it.
pub struct BulkSnapshotSource {
    data_dir: PathBuf,
    tree: bool,
}

impl BulkSnapshotSource {
    /// Create a source over a local data directory.
    pub fn new(data_dir: impl Into<PathBuf>, tree: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            tree,
        }
    }

    fn date_dir(&self, date: NaiveDate) -> PathBuf {
        if self.tree {
            self.data_dir.join(format!(
                "{:04}/{:02}/{:02}",
                date.year(),
                date.month(),
                date.day()
            ))
        } else {
            self.data_dir.clone()
        }
    }
}

impl SnapshotSource for BulkSnapshotSource {
    fn stream_items(&self, date: NaiveDate) -> Result<BookIter> {
        let dir = self.date_dir(date);
        let date_string = date.format("%Y%m%d");
        let bulk_path = dir.join(format!("interval_{date_string}_{INTERVAL_MINUTES}.bulk"));
        let index_path = dir.join(format!("interval_{date_string}_{INTERVAL_MINUTES}.index.gz"));
        if !bulk_path.exists() || !index_path.exists() {
            return Err(Error::archive_unavailable(format!(
                "no bulk/index files for {date} under {}",
                dir.display()
            )));
        }

        let file_len = std::fs::metadata(&bulk_path)?.len();
        let index = read_index(File::open(&index_path)?, file_len)?;

        // One read per member, in file order.
        let mut members: Vec<(TypeId, ByteSpan)> = index.into_iter().collect();
        members.sort_by_key(|&(_, span)| span.start);
        debug!(
            items = members.len(),
            path = %bulk_path.display(),
            "opened archive"
        );

        Ok(Box::new(BulkBookIter {
            bulk: File::open(&bulk_path)?,
            members: members.into_iter(),
        }))
    }
}

struct BulkBookIter {
    bulk: File,
    members: std::vec::IntoIter<(TypeId, ByteSpan)>,
}

impl BulkBookIter {
    fn read_member(&mut self, span: ByteSpan) -> Result<TypeBook> {
        self.bulk.seek(SeekFrom::Start(span.start))?;
        let mut compressed = vec![0u8; span.byte_len()];
        self.bulk.read_exact(&mut compressed)?;

        let mut book = read_book(BufReader::new(GzDecoder::new(compressed.as_slice())))?;
        fill_gaps(&mut book);
        Ok(book)
    }
}

impl Iterator for BulkBookIter {
    type Item = Result<TypeBook>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, span) = self.members.next()?;
        Some(self.read_member(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn book_text(type_id: u32, volume: i64) -> String {
        format!(
            "{type_id}\n1\n10000002\n1489579800000\n0\n1\n\
             11,false,1489500000000,5.10,100,1,{volume},station,60003760,90\n"
        )
    }

    fn write_archive(dir: &std::path::Path, date_string: &str, books: &[(u32, String)]) {
        let mut bulk = Vec::new();
        let mut index = String::new();
        for (type_id, text) in books {
            index.push_str(&format!("book_{type_id} {}\n", bulk.len()));
            bulk.extend_from_slice(&gzip(text));
        }
        std::fs::write(dir.join(format!("interval_{date_string}_5.bulk")), bulk).unwrap();
        std::fs::write(
            dir.join(format!("interval_{date_string}_5.index.gz")),
            gzip(&index),
        )
        .unwrap();
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, 15).unwrap()
    }

    #[test]
    fn test_streams_members_in_file_order() {
        let dir = TempDir::new().unwrap();
        write_archive(
            dir.path(),
            "20170315",
            &[(40, book_text(40, 30)), (34, book_text(34, 20))],
        );

        let source = BulkSnapshotSource::new(dir.path(), false);
        let books: Vec<TypeBook> = source
            .stream_items(date())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(books.len(), 2);
        assert_eq!(books[0].type_id, 40);
        assert_eq!(books[1].type_id, 34);
        assert_eq!(books[1].regions[&10000002][0].asks[0].volume, 20);
    }

    #[test]
    fn test_tree_layout() {
        let dir = TempDir::new().unwrap();
        let day_dir = dir.path().join("2017/03/15");
        std::fs::create_dir_all(&day_dir).unwrap();
        write_archive(&day_dir, "20170315", &[(34, book_text(34, 20))]);

        let source = BulkSnapshotSource::new(dir.path(), true);
        let books: Vec<TypeBook> = source
            .stream_items(date())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn test_missing_files_are_archive_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = BulkSnapshotSource::new(dir.path(), false);
        let err = match source.stream_items(date()) {
            Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::ArchiveUnavailable(_)));
    }

    #[test]
    fn test_corrupt_member_propagates() {
        let dir = TempDir::new().unwrap();
        // index points at garbage bytes
        std::fs::write(dir.path().join("interval_20170315_5.bulk"), b"not gzip").unwrap();
        std::fs::write(
            dir.path().join("interval_20170315_5.index.gz"),
            gzip("book_34 0\n"),
        )
        .unwrap();

        let source = BulkSnapshotSource::new(dir.path(), false);
        let result: Result<Vec<TypeBook>> = source.stream_items(date()).unwrap().collect();
        assert!(result.is_err());
    }
}
