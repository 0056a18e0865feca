//! Single file copy.

use super::{FileRelocation, RelationCopier};
use crate::buffer::CopyBuffer;
use crate::error::{CopyError, CopyResult, FileOp, IoContext};
use crate::reencrypt::BlockReencryptor;
use crate::sync::close_file;
use crate::types::SegmentIndex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

/// Destination of a file copy.
pub(crate) trait CopySink: Write {
    /// Starts writeback of `offset..offset + len` without waiting for it.
    fn flush_range(&mut self, offset: u64, len: u64) -> io::Result<()>;
}

impl CopySink for File {
    fn flush_range(&mut self, offset: u64, len: u64) -> io::Result<()> {
        crate::sync::flush_range(self, offset, len)
    }
}

impl RelationCopier {
    /// Copies the file at `from` to a new file at `to`.
    ///
    /// With a `relocation`, every complete block is decrypted for the
    /// source identity and fork and encrypted for the destination ones.
    /// Block numbers start at `segment` times the segment size. Without a
    /// relocation the bytes are copied verbatim. A trailing partial block is
    /// always copied verbatim.
    ///
    /// Writeback of the destination is started every `flush_distance`
    /// bytes, but the file is not fsynced; durability is the caller's job
    /// (see [`RelationCopier::copy_dir`]).
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// - [`CopyError::EncryptionInactive`] if a relocation is given but
    ///   encryption is not active
    /// - [`CopyError::BlockNumberOverflow`] if a re-encrypted block number
    ///   reaches [`crate::MAX_TWEAK_BLOCKS`]
    /// - [`CopyError::FileAccess`] if `to` already exists or any open, read,
    ///   write or close fails; a short write is reported as storage full
    /// - [`CopyError::Cancelled`] if the cancel token fires
    pub fn copy_file(
        &self,
        from: &Path,
        to: &Path,
        relocation: Option<&FileRelocation>,
        segment: SegmentIndex,
    ) -> CopyResult<u64> {
        let block_size = self.config.block_size;
        let start = segment
            .checked_mul(self.config.segment_blocks)
            .ok_or(CopyError::BlockNumberOverflow {
                block: u64::from(segment) * u64::from(self.config.segment_blocks),
            })?;

        let mut reencryptor = match relocation {
            Some(relocation) => {
                let cipher = self.cipher.as_deref().ok_or(CopyError::EncryptionInactive)?;
                BlockReencryptor::new(
                    cipher,
                    relocation.source_fork(),
                    relocation.dest_fork(),
                    block_size,
                    start,
                )
            }
            None => BlockReencryptor::passthrough(block_size, start),
        };

        let mut src = File::open(from).context(FileOp::Open, from)?;
        let mut dst = create_new(to)?;

        let copied = self.pump(&mut src, &mut dst, &mut reencryptor, from, to)?;

        close_file(dst).context(FileOp::Close, to)?;
        drop(src);

        debug!(
            from = %from.display(),
            to = %to.display(),
            bytes = copied,
            reencrypted = !reencryptor.is_passthrough(),
            "copied file"
        );
        Ok(copied)
    }

    /// Streams `src` into `dst`, re-encrypting whole blocks on the way.
    fn pump<R: Read, W: CopySink>(
        &self,
        src: &mut R,
        dst: &mut W,
        reencryptor: &mut BlockReencryptor<'_>,
        from: &Path,
        to: &Path,
    ) -> CopyResult<u64> {
        let mut buffer = CopyBuffer::new(self.config.block_size, self.config.buffer_blocks);
        let mut offset: u64 = 0;
        let mut flush_offset: u64 = 0;
        loop {
            self.cancel.check()?;

            if offset - flush_offset >= self.config.flush_distance {
                dst.flush_range(flush_offset, offset - flush_offset)
                    .context(FileOp::Flush, to)?;
                flush_offset = offset;
            }

            let nbytes = buffer.fill_from(src).context(FileOp::Read, from)?;
            if nbytes == 0 {
                break;
            }

            let nblocks = buffer.full_blocks();
            reencryptor.process(buffer.filled_mut(), nblocks)?;

            write_chunk(dst, buffer.filled()).context(FileOp::Write, to)?;
            offset += nbytes as u64;
        }

        if offset > flush_offset {
            dst.flush_range(flush_offset, offset - flush_offset)
                .context(FileOp::Flush, to)?;
        }
        Ok(offset)
    }
}

/// Writes `chunk` with a single call.
///
/// A short write leaves no errno behind; it is reported as a full disk.
fn write_chunk<W: Write>(dst: &mut W, chunk: &[u8]) -> io::Result<()> {
    let written = dst.write(chunk)?;
    if written != chunk.len() {
        return Err(io::Error::new(
            io::ErrorKind::StorageFull,
            format!("wrote only {written} of {} bytes", chunk.len()),
        ));
    }
    Ok(())
}

/// Creates `path`, failing if it already exists.
fn create_new(path: &Path) -> CopyResult<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).context(FileOp::Create, path)
}
