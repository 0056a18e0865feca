//! Error types for cipher operations and provider bootstrap.

use thiserror::Error;

/// Result type for block cipher operations.
pub type CipherResult<T> = Result<T, CipherError>;

/// Errors raised by the block cipher façade.
///
/// These indicate a caller bug (wrong buffer sizes) or a key mismatch,
/// never a provider failure: provider routines are infallible.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The block is smaller than the minimum cipher input.
    #[error("block of {size} bytes is smaller than the minimum of {minimum} bytes")]
    BlockTooSmall {
        /// Size of the rejected block.
        size: usize,
        /// Minimum accepted size.
        minimum: usize,
    },

    /// Input and output buffers differ in length.
    #[error("input is {input} bytes but output is {output} bytes")]
    LengthMismatch {
        /// Input length.
        input: usize,
        /// Output length.
        output: usize,
    },

    /// The encryption sample does not match the stored one (wrong key).
    #[error("encryption sample mismatch: the configured key does not match the data directory")]
    SampleMismatch,
}

/// Errors that prevent encryption from being initialized.
///
/// All of these are fatal at startup: the engine must not run with a
/// partially configured encryption layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider module could not be loaded.
    #[error("could not load encryption library \"{library}\": {reason}")]
    LoadFailed {
        /// Name of the library that failed to load.
        library: String,
        /// Loader supplied description.
        reason: String,
    },

    /// The module loaded but never registered a provider.
    #[error("encryption library \"{library}\" did not provide encryption hooks")]
    NoProviderRegistered {
        /// Name of the loaded library.
        library: String,
    },

    /// The provider's setup routine reported failure.
    #[error("data encryption could not be initialized by provider \"{provider}\"")]
    SetupFailed {
        /// Name of the registered provider.
        provider: String,
    },
}

impl ProviderError {
    /// Creates a load failure error.
    pub fn load_failed(library: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            library: library.into(),
            reason: reason.into(),
        }
    }
}
