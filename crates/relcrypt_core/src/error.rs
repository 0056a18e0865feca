//! Error types for relcrypt copy operations.

use relcrypt_cipher::CipherError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for copy operations.
pub type CopyResult<T> = Result<T, CopyError>;

/// The file system step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Opening an existing file for reading.
    Open,
    /// Exclusively creating a destination file.
    Create,
    /// Creating the destination directory.
    CreateDir,
    /// Opening a directory for enumeration.
    OpenDir,
    /// Reading the next directory entry.
    ReadDir,
    /// Querying entry metadata without following links.
    Stat,
    /// Reading from a file.
    Read,
    /// Writing to a file.
    Write,
    /// Handing written data to the operating system.
    Flush,
    /// Durability sync of a file or directory.
    Sync,
    /// Closing a written file.
    Close,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Open => "open file",
            Self::Create => "create file",
            Self::CreateDir => "create directory",
            Self::OpenDir => "open directory",
            Self::ReadDir => "read directory",
            Self::Stat => "stat file",
            Self::Read => "read file",
            Self::Write => "write to file",
            Self::Flush => "flush file",
            Self::Sync => "fsync",
            Self::Close => "close file",
        };
        f.write_str(verb)
    }
}

/// Errors that can occur while copying relation files.
///
/// None of these leave the destination in a defined state. The caller must
/// discard a partially written destination and retry from a clean path.
#[derive(Debug, Error)]
pub enum CopyError {
    /// A file system operation failed.
    #[error("could not {op} \"{}\": {source}", .path.display())]
    FileAccess {
        /// The step that failed.
        op: FileOp,
        /// The path the step operated on.
        path: PathBuf,
        /// The underlying cause.
        #[source]
        source: io::Error,
    },

    /// The copy was cancelled through its [`crate::CancelToken`].
    #[error("copy cancelled")]
    Cancelled,

    /// Block encryption or decryption was rejected.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// A block number is outside the range tweaks can address.
    #[error("block number {block} is outside the addressable range")]
    BlockNumberOverflow {
        /// The offending global block number.
        block: u64,
    },

    /// Encryption is active but no storage identities were supplied.
    #[error("encryption is active but source and destination storage identities are missing")]
    MissingRelocation,

    /// Re-encryption was requested while encryption is inactive.
    #[error("re-encryption requested but data encryption is not active")]
    EncryptionInactive,

    /// The copy configuration is unusable.
    #[error("invalid copy configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted with the given arguments.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CopyError {
    /// Creates a file access error.
    pub fn file_access(op: FileOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileAccess {
            op,
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for a cooperative cancellation rather than a fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Attaches the failing operation and path to I/O results.
pub(crate) trait IoContext<T> {
    fn context(self, op: FileOp, path: &Path) -> CopyResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, op: FileOp, path: &Path) -> CopyResult<T> {
        self.map_err(|source| CopyError::file_access(op, path, source))
    }
}
