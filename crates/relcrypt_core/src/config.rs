//! Copy configuration.

use crate::error::{CopyError, CopyResult};
use crate::types::{BlockNumber, BLOCK_SIZE, RELSEG_SIZE};
use relcrypt_cipher::ENCRYPTION_BLOCK;

/// Number of blocks read and written per copy iteration.
pub const COPY_BUFFER_BLOCKS: usize = 8;

/// Bytes written between non-durable flushes of the destination.
///
/// macOS (at least early APFS releases) handles small flush requests
/// badly, so flushes are spaced further apart there.
#[cfg(target_os = "macos")]
pub const FLUSH_DISTANCE: u64 = 32 * 1024 * 1024;

/// Bytes written between non-durable flushes of the destination.
#[cfg(not(target_os = "macos"))]
pub const FLUSH_DISTANCE: u64 = 1024 * 1024;

/// Configuration for relation copies.
#[derive(Debug, Clone)]
pub struct CopyConfig {
    /// Size of a data block in bytes.
    pub block_size: usize,

    /// Number of blocks in a full segment file.
    pub segment_blocks: BlockNumber,

    /// Number of blocks in the copy buffer.
    pub buffer_blocks: usize,

    /// Bytes written between non-durable flushes.
    pub flush_distance: u64,

    /// Whether copied files and the destination directory are fsynced.
    ///
    /// When disabled the copy still completes but is not crash safe.
    pub enable_fsync: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            segment_blocks: RELSEG_SIZE,
            buffer_blocks: COPY_BUFFER_BLOCKS,
            flush_distance: FLUSH_DISTANCE,
            enable_fsync: true,
        }
    }
}

impl CopyConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size.
    #[must_use]
    pub const fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the number of blocks per segment.
    #[must_use]
    pub const fn segment_blocks(mut self, blocks: BlockNumber) -> Self {
        self.segment_blocks = blocks;
        self
    }

    /// Sets the number of blocks in the copy buffer.
    #[must_use]
    pub const fn buffer_blocks(mut self, blocks: usize) -> Self {
        self.buffer_blocks = blocks;
        self
    }

    /// Sets the flush distance.
    #[must_use]
    pub const fn flush_distance(mut self, bytes: u64) -> Self {
        self.flush_distance = bytes;
        self
    }

    /// Sets whether copies are fsynced.
    #[must_use]
    pub const fn enable_fsync(mut self, value: bool) -> Self {
        self.enable_fsync = value;
        self
    }

    /// Size of the copy buffer in bytes.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.block_size * self.buffer_blocks
    }

    /// Checks that the configuration can drive a copy.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::InvalidConfig`] if the block size is not a
    /// non-zero multiple of the cipher block, or if the buffer or segment
    /// is empty.
    pub fn validate(&self) -> CopyResult<()> {
        if self.block_size == 0 || self.block_size % ENCRYPTION_BLOCK != 0 {
            return Err(CopyError::invalid_config(format!(
                "block size {} is not a positive multiple of {ENCRYPTION_BLOCK}",
                self.block_size
            )));
        }
        if self.buffer_blocks == 0 {
            return Err(CopyError::invalid_config("copy buffer must hold at least one block"));
        }
        if self.segment_blocks == 0 {
            return Err(CopyError::invalid_config("segments must hold at least one block"));
        }
        Ok(())
    }
}
