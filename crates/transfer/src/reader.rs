use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::planner::{ChunkSpec, plan};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One chunk's bytes as read from disk, with its checksum.
#[derive(Debug, Clone)]
pub struct ChunkPayload {
    pub spec: ChunkSpec,
    pub data: Vec<u8>,
    /// SHA-256 hex digest of `data`.
    pub checksum: String,
}

/// Reads a file's planned chunks by index.
///
/// The plan is fixed at open time from the file's size; chunks can be read
/// in any order, which is what resume relies on.
pub struct ChunkReader {
    file: std::fs::File,
    plan: Vec<ChunkSpec>,
    file_name: String,
    total_size: u64,
    chunk_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (4 MiB) is used.
    pub fn open(path: &Path, chunk_size: u64) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let total_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file,
            plan: plan(total_size, chunk_size)?,
            file_name,
            total_size,
            chunk_size,
        })
    }

    /// Reads the chunk at `index`, seeking to its planned offset.
    pub fn read_chunk(&mut self, index: u32) -> Result<ChunkPayload, TransferError> {
        let total = self.chunk_count();
        let spec = *self
            .plan
            .get(index as usize)
            .ok_or(TransferError::ChunkOutOfRange { index, total })?;

        self.file.seek(SeekFrom::Start(spec.start))?;
        let mut data = vec![0u8; spec.len() as usize];
        let mut filled = 0usize;
        while filled < data.len() {
            let n = self.file.read(&mut data[filled..])?;
            if n == 0 {
                // File shrank underneath us since the plan was taken.
                return Err(TransferError::ShortRead {
                    index,
                    expected: spec.len(),
                    got: filled as u64,
                });
            }
            filled += n;
        }

        let checksum = checksum_bytes(&data);
        Ok(ChunkPayload {
            spec,
            data,
            checksum,
        })
    }

    /// File name component of the opened path.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Total file size in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Chunk size the plan was taken with.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of planned chunks.
    pub fn chunk_count(&self) -> u32 {
        self.plan.len() as u32
    }

    /// The full chunk plan.
    pub fn plan(&self) -> &[ChunkSpec] {
        &self.plan
    }
}
