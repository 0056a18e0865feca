//! # relcrypt Testkit
//!
//! Test utilities for relcrypt.
//!
//! This crate provides:
//! - Cipher provider doubles (keystream, call recording, failing setup)
//! - Scratch directories and relation file fixtures
//! - Property-based test generators using proptest
//! - Test log capture
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relcrypt_testkit::prelude::*;
//!
//! #[test]
//! fn copies_relation() {
//!     init_test_logging();
//!     let scratch = Scratch::new();
//!     let cipher = keystream_cipher(7);
//!     // ... copy and compare
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod providers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::providers::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use providers::*;
