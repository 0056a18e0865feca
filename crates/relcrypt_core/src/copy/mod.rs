//! Relation file and directory copy.
//!
//! A [`RelationCopier`] copies relation files, re-encrypting every block
//! for its destination storage identity when encryption is active:
//!
//! - [`RelationCopier::copy_file`] streams one file into a newly created
//!   destination, block-aligned, with periodic flushes
//! - [`RelationCopier::copy_dir`] copies the regular files of one directory
//!   level and then makes the result durable
//!
//! Copies never overwrite, never retry, and never clean up after a
//! failure. A failed destination must be discarded by the caller.

mod dir;
mod file;

use crate::cancel::CancelToken;
use crate::config::CopyConfig;
use crate::error::CopyResult;
use crate::reencrypt::RelationFork;
use crate::types::{ForkKind, Oid, StorageIdentity};
use relcrypt_cipher::{BlockCipher, EncryptionState};
use std::sync::Arc;

/// Source and destination identities for a directory copy.
///
/// The relation OID of both identities is replaced per file with the OID
/// parsed from the file's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Identity the source files are encrypted for.
    pub source: StorageIdentity,
    /// Identity the destination files are encrypted for.
    pub dest: StorageIdentity,
}

impl Relocation {
    /// Creates a relocation.
    #[must_use]
    pub const fn new(source: StorageIdentity, dest: StorageIdentity) -> Self {
        Self { source, dest }
    }

    /// The file-level relocation for relation `oid`, fork `fork`.
    #[must_use]
    pub const fn for_file(&self, oid: Oid, fork: ForkKind) -> FileRelocation {
        FileRelocation {
            source: self.source.with_relation(oid),
            dest: self.dest.with_relation(oid),
            from_fork: fork,
            to_fork: fork,
        }
    }
}

/// Source and destination addressing for a single file copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRelocation {
    /// Identity the source file is encrypted for.
    pub source: StorageIdentity,
    /// Identity the destination file is encrypted for.
    pub dest: StorageIdentity,
    /// Fork the source blocks belong to.
    pub from_fork: ForkKind,
    /// Fork the destination blocks belong to.
    pub to_fork: ForkKind,
}

impl FileRelocation {
    /// Creates a relocation that keeps the fork.
    #[must_use]
    pub const fn new(source: StorageIdentity, dest: StorageIdentity, fork: ForkKind) -> Self {
        Self {
            source,
            dest,
            from_fork: fork,
            to_fork: fork,
        }
    }

    /// Sets a different destination fork.
    #[must_use]
    pub const fn to_fork(mut self, fork: ForkKind) -> Self {
        self.to_fork = fork;
        self
    }

    pub(crate) const fn source_fork(&self) -> RelationFork {
        RelationFork::new(self.source, self.from_fork)
    }

    pub(crate) const fn dest_fork(&self) -> RelationFork {
        RelationFork::new(self.dest, self.to_fork)
    }
}

/// Summary of a directory copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Regular files copied.
    pub files_copied: u64,
    /// Of those, files whose blocks were re-encrypted.
    pub files_reencrypted: u64,
    /// Bytes written to destination files.
    pub bytes_copied: u64,
    /// Entries that were not regular files and were skipped.
    pub entries_skipped: u64,
}

/// Copies relation files, re-encrypting them when encryption is active.
///
/// # Thread Safety
///
/// A copier holds only read-only state and can be shared across threads.
/// Concurrent copies must target distinct destinations.
///
/// # Example
///
/// ```rust,ignore
/// use relcrypt_core::{CopyConfig, RelationCopier, Relocation, StorageIdentity};
///
/// let copier = RelationCopier::new(CopyConfig::default(), &encryption)?;
/// let relocation = Relocation::new(
///     StorageIdentity::new(1663, 1, 0),
///     StorageIdentity::new(1663, 16384, 0),
/// );
/// copier.copy_dir(&template_dir, &new_db_dir, Some(&relocation))?;
/// ```
#[derive(Debug)]
pub struct RelationCopier {
    config: CopyConfig,
    cipher: Option<Arc<BlockCipher>>,
    cancel: CancelToken,
}

impl RelationCopier {
    /// Creates a copier using the encryption state resolved at startup.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CopyError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: CopyConfig, encryption: &EncryptionState) -> CopyResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cipher: encryption.cipher().cloned(),
            cancel: CancelToken::new(),
        })
    }

    /// Uses `token` for cancellation instead of a private one.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token polled by this copier.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Returns true if copies re-encrypt relation files.
    #[must_use]
    pub fn is_encrypting(&self) -> bool {
        self.cipher.is_some()
    }
}
