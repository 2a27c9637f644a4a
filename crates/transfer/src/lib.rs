//! Chunk planning and local chunk reading for clipstream uploads.
//!
//! The planner is a pure function from (file size, chunk size) to an ordered
//! list of byte ranges; [`ChunkReader`] materializes one planned chunk at a
//! time from disk, by index, which is what makes resume re-entry trivial.

mod planner;
mod reader;

pub use planner::{ChunkSpec, chunk_count, plan};
pub use reader::{ChunkPayload, ChunkReader, checksum_bytes};

/// Default chunk size: 4 MiB.
///
/// Fixed for the lifetime of a session. Larger chunks reduce per-chunk
/// overhead (SHA-256, request round-trips); smaller chunks lose less work
/// on an interrupted transfer.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("file requires {count} chunks, more than a u32 index can address")]
    TooManyChunks { count: u64 },

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("file truncated while reading chunk {index}: expected {expected} bytes, got {got}")]
    ShortRead { index: u32, expected: u64, got: u64 },
}
