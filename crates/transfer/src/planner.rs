//! Pure chunk planning.
//!
//! Maps a file size and a fixed chunk size to an ordered list of
//! index → byte-range mappings covering `[0, total_size)` exactly once.

use crate::TransferError;

/// One planned chunk: the byte range `[start, end)` at a given index.
///
/// Every chunk spans exactly the chunk size except possibly the last,
/// which spans whatever remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: u32,
    pub start: u64,
    pub end: u64,
}

impl ChunkSpec {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` for a zero-length range (never produced by [`plan`]).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Number of chunks a file of `total_size` splits into: `ceil(total / chunk)`.
///
/// Counts beyond `u32::MAX` cannot be indexed on the wire and are rejected.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> Result<u32, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    let count = total_size.div_ceil(chunk_size);
    u32::try_from(count).map_err(|_| TransferError::TooManyChunks { count })
}

/// Computes the ordered chunk plan for a file.
///
/// Deterministic and I/O-free. A zero-size file yields an empty plan;
/// the caller decides whether to complete immediately or reject.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkSpec>, TransferError> {
    let count = chunk_count(total_size, chunk_size)?;
    let mut chunks = Vec::with_capacity(count as usize);
    for index in 0..count {
        let start = u64::from(index) * chunk_size;
        // start + chunk_size can exceed u64::MAX near the end of a huge file.
        let end = start
            .checked_add(chunk_size)
            .map_or(total_size, |e| e.min(total_size));
        chunks.push(ChunkSpec { index, start, end });
    }
    Ok(chunks)
}
