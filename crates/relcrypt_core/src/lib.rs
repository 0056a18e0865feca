//! # relcrypt Core
//!
//! Durable relation file and directory copy with block re-encryption.
//!
//! This crate provides:
//! - Relation filename parsing (`<oid>[_<fork>][.<segment>]`)
//! - Per-block tweak derivation from storage identity, fork and block number
//! - Single file copy that re-encrypts blocks for a new storage identity
//! - Directory copy with a durability pass over the result
//! - Cooperative cancellation of long copies
//!
//! Encryption is resolved once at startup through
//! [`relcrypt_cipher::EncryptionSetup`]; the resulting
//! [`EncryptionState`] is handed to every [`RelationCopier`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod cancel;
mod config;
mod copy;
mod error;
mod filename;
mod reencrypt;
mod sync;
mod types;

pub use buffer::CopyBuffer;
pub use cancel::CancelToken;
pub use config::{CopyConfig, COPY_BUFFER_BLOCKS, FLUSH_DISTANCE};
pub use copy::{CopyStats, FileRelocation, RelationCopier, Relocation};
pub use error::{CopyError, CopyResult, FileOp};
pub use filename::{parse_relation_filename, RelationFilename};
pub use reencrypt::{relation_tweak, BlockReencryptor, RelationFork};
pub use sync::{fsync_dir, fsync_file};
pub use types::{
    BlockNumber, ForkKind, Oid, SegmentIndex, StorageIdentity, BLOCK_SIZE, MAX_TWEAK_BLOCKS,
    OID_CHARS, RELSEG_SIZE,
};

pub use relcrypt_cipher::{BlockCipher, EncryptionSetup, EncryptionState};
