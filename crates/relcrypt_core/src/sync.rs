//! Durability primitives.
//!
//! A durability sync guarantees that written bytes and metadata survive a
//! crash. A flush only hands data to the operating system early so the
//! final sync has less to do.

use crate::error::{CopyResult, FileOp, IoContext};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::trace;

/// Durably syncs the contents and metadata of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or synced.
pub fn fsync_file(path: &Path) -> CopyResult<()> {
    // Write access is needed for the sync to be honoured on Windows.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .context(FileOp::Open, path)?;
    file.sync_all().context(FileOp::Sync, path)
}

/// Durably syncs the directory entry list of `path`.
///
/// Syncing a file does not guarantee that the directory's reference to it
/// is durable on every file system, so the directory is synced as well.
///
/// # Errors
///
/// Returns an error if the directory cannot be opened or synced.
#[cfg(unix)]
pub fn fsync_dir(path: &Path) -> CopyResult<()> {
    let dir = File::open(path).context(FileOp::OpenDir, path)?;
    dir.sync_all().context(FileOp::Sync, path)
}

/// Durably syncs the directory entry list of `path`.
///
/// NTFS journals metadata updates and does not support opening a directory
/// for sync, so this is a no-op off Unix.
#[cfg(not(unix))]
pub fn fsync_dir(_path: &Path) -> CopyResult<()> {
    Ok(())
}

/// Asks the kernel to start writing back `offset..offset + len` of `file`.
///
/// This is not a durability guarantee. It only spreads writeback over the
/// copy so the final fsync has less to do.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn flush_range(file: &File, offset: u64, len: u64) -> io::Result<()> {
    use nix::fcntl::{sync_file_range, SyncFileRangeFlags};
    use std::os::unix::io::AsRawFd;

    let (Ok(offset), Ok(len)) = (i64::try_from(offset), i64::try_from(len)) else {
        return Ok(());
    };
    trace!(offset, len, "starting writeback of copied data");
    sync_file_range(
        file.as_raw_fd(),
        offset,
        len,
        SyncFileRangeFlags::SYNC_FILE_RANGE_WRITE,
    )
    .map_err(io::Error::from)
}

/// Asks the kernel to start writing back `offset..offset + len` of `file`.
///
/// No writeback hint is available here; the final fsync does all the work.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) fn flush_range(_file: &File, offset: u64, len: u64) -> io::Result<()> {
    trace!(offset, len, "no writeback hint on this platform");
    Ok(())
}

/// Closes `file`, reporting errors the close itself returns.
///
/// Some file systems (NFS among them) defer write errors until close.
#[cfg(unix)]
pub(crate) fn close_file(file: File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;

    nix::unistd::close(file.into_raw_fd()).map_err(io::Error::from)
}

/// Closes `file`.
///
/// Closing a handle reports no error off Unix.
#[cfg(not(unix))]
pub(crate) fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}
