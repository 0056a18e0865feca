//! # relcrypt Cipher
//!
//! Pluggable block cipher boundary for relcrypt.
//!
//! This crate does not implement a cipher. It defines the seam a cipher
//! provider plugs into and the policy applied around every call.
//!
//! ## Design Principles
//!
//! - Providers are opaque in-place block transforms keyed by a 16-byte tweak
//! - Exactly one provider is active per [`EncryptionState`]; the first
//!   registration wins
//! - All-zero blocks bypass the provider in both directions
//! - Startup failures are reported as [`ProviderError`], never ignored
//!
//! ## Example
//!
//! ```rust
//! use relcrypt_cipher::{EncryptionSetup, StaticLoader};
//!
//! // No library configured: encryption stays off.
//! let state = EncryptionSetup::new().setup("", &StaticLoader::new()).unwrap();
//! assert!(!state.is_enabled());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod bootstrap;
mod error;
mod provider;
mod registry;
mod tweak;

pub use block::{is_all_zero, BlockCipher, ENCRYPTION_BLOCK, SAMPLE_SIZE};
pub use bootstrap::{EncryptionSetup, EncryptionState, ModuleInit, ProviderLoader, StaticLoader};
pub use error::{CipherError, CipherResult, ProviderError};
pub use provider::CipherProvider;
pub use registry::ProviderRegistry;
pub use tweak::{Tweak, TWEAK_SIZE};
