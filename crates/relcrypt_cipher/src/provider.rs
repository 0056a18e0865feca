//! Cipher provider trait definition.

use crate::tweak::Tweak;

/// A pluggable block cipher implementation.
///
/// Providers are **opaque transforms**. relcrypt decides which blocks are
/// encrypted and with which tweak; the provider only turns plaintext into
/// ciphertext and back. Key setup and key storage belong to the provider.
///
/// # Invariants
///
/// - `decrypt_block(encrypt_block(b, t), t) == b` for every block `b`
///   and tweak `t`
/// - The output length always equals the input length
/// - Blocks are at least [`crate::ENCRYPTION_BLOCK`] bytes but are not
///   guaranteed to be a multiple of it
/// - Providers must be `Send + Sync`: one instance serves every copy in
///   the process
///
/// # Implementors
///
/// Providers live outside this crate. They are registered through a
/// [`crate::ProviderRegistry`] by a module named in configuration.
pub trait CipherProvider: Send + Sync {
    /// Prepares the provider for use (key setup, self checks).
    ///
    /// Called exactly once, immediately after the provider module has been
    /// loaded. Returning `false` aborts engine startup.
    fn setup(&self) -> bool;

    /// Encrypts `block` in place using `tweak`.
    fn encrypt_block(&self, block: &mut [u8], tweak: &Tweak);

    /// Decrypts `block` in place using `tweak`.
    ///
    /// The tweak must be the one used when the block was encrypted.
    fn decrypt_block(&self, block: &mut [u8], tweak: &Tweak);
}
