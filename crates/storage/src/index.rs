//! Archive index parsing.

use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use tradeflow_core::{Error, Result, TypeId};

/// Byte range of one item's compressed book inside the bulk file,
/// inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: u64,
    pub end: u64,
}

impl ByteSpan {
    /// Number of bytes covered by the span.
    pub fn byte_len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

/// Parse a gzipped index stream.
///
/// Lines are `<label>_<type_id> <offset>` in bulk-file order. A member
/// ends one byte before the next member's offset; the final member ends
/// at the bulk file's last byte (`file_len - 1`).
pub fn read_index<R: Read>(reader: R, file_len: u64) -> Result<BTreeMap<TypeId, ByteSpan>> {
    let mut entries: Vec<(TypeId, u64)> = Vec::new();
    for line in BufReader::new(GzDecoder::new(reader)).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (label, offset) = line
            .split_once(' ')
            .ok_or_else(|| Error::data(format!("index line without offset: {line:?}")))?;
        let type_id: TypeId = label
            .rsplit_once('_')
            .and_then(|(_, id)| id.parse().ok())
            .ok_or_else(|| Error::data(format!("index label without type id: {label:?}")))?;
        let offset: u64 = offset
            .trim()
            .parse()
            .map_err(|_| Error::data(format!("bad index offset: {offset:?}")))?;
        entries.push((type_id, offset));
    }

    let mut spans = BTreeMap::new();
    for (i, &(type_id, start)) in entries.iter().enumerate() {
        let end = match entries.get(i + 1) {
            Some(&(_, next_start)) => next_start - 1,
            None => file_len.saturating_sub(1),
        };
        spans.insert(type_id, ByteSpan { start, end });
    }
    Ok(spans)
}
