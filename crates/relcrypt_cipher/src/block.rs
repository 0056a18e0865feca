//! Block cipher façade over the active provider.
//!
//! ## All-zero blocks
//!
//! Blocks consisting entirely of zero bytes are never handed to the
//! provider. Encrypting or decrypting one yields zeros again. Relation
//! extension writes zero-filled blocks, and this keeps them readable
//! without a cipher round trip.
//!
//! The decrypt side assumes any all-zero ciphertext came from an all-zero
//! plaintext. A provider that legitimately produced an all-zero ciphertext
//! for non-zero input would have that block decrypted to zeros. This is a
//! known policy trade-off and is preserved deliberately.

use crate::error::{CipherError, CipherResult};
use crate::provider::CipherProvider;
use crate::tweak::Tweak;
use std::fmt;
use std::sync::Arc;

/// Minimum number of bytes the provider accepts per call.
pub const ENCRYPTION_BLOCK: usize = 16;

/// Size of the encryption sample in bytes.
pub const SAMPLE_SIZE: usize = 16;

/// Fixed plaintext encrypted to produce the sample.
const SAMPLE_PLAINTEXT: &[u8; SAMPLE_SIZE] = b"postgresqlcrypt\0";

/// Returns true if every byte of `data` is zero.
#[must_use]
pub fn is_all_zero(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0)
}

/// Encrypts and decrypts blocks through the active provider.
///
/// A `BlockCipher` only exists while encryption is active, so holding one
/// is the caller's proof that encryption calls are permitted. It is
/// normally produced by [`crate::EncryptionSetup::setup`] and shared via
/// `Arc` by every copy in the process.
pub struct BlockCipher {
    name: String,
    provider: Arc<dyn CipherProvider>,
}

impl BlockCipher {
    /// Wraps an already set up provider.
    ///
    /// This does not call [`CipherProvider::setup`]; the bootstrap does.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: Arc<dyn CipherProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Returns the name the provider registered under.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.name
    }

    /// Encrypts `block` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is smaller than [`ENCRYPTION_BLOCK`].
    pub fn encrypt_in_place(&self, block: &mut [u8], tweak: &Tweak) -> CipherResult<()> {
        check_size(block.len())?;
        if !is_all_zero(block) {
            self.provider.encrypt_block(block, tweak);
        }
        Ok(())
    }

    /// Decrypts `block` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is smaller than [`ENCRYPTION_BLOCK`].
    pub fn decrypt_in_place(&self, block: &mut [u8], tweak: &Tweak) -> CipherResult<()> {
        check_size(block.len())?;
        if !is_all_zero(block) {
            self.provider.decrypt_block(block, tweak);
        }
        Ok(())
    }

    /// Encrypts `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers differ in length or are smaller than
    /// [`ENCRYPTION_BLOCK`].
    pub fn encrypt_block(
        &self,
        input: &[u8],
        output: &mut [u8],
        tweak: &Tweak,
    ) -> CipherResult<()> {
        copy_into(input, output)?;
        self.encrypt_in_place(output, tweak)
    }

    /// Decrypts `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers differ in length or are smaller than
    /// [`ENCRYPTION_BLOCK`].
    pub fn decrypt_block(
        &self,
        input: &[u8],
        output: &mut [u8],
        tweak: &Tweak,
    ) -> CipherResult<()> {
        copy_into(input, output)?;
        self.decrypt_in_place(output, tweak)
    }

    /// Encrypts a fixed value under [`Tweak::sample`].
    ///
    /// The result is stored alongside the data directory when it is
    /// initialized and compared on startup to catch a wrong key.
    #[must_use]
    pub fn sample(&self) -> [u8; SAMPLE_SIZE] {
        let mut sample = *SAMPLE_PLAINTEXT;
        self.provider.encrypt_block(&mut sample, &Tweak::sample());
        sample
    }

    /// Checks `expected` against a freshly computed sample.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::SampleMismatch`] if the samples differ.
    pub fn verify_sample(&self, expected: &[u8]) -> CipherResult<()> {
        if self.sample().as_slice() == expected {
            Ok(())
        } else {
            Err(CipherError::SampleMismatch)
        }
    }
}

impl fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCipher")
            .field("provider", &self.name)
            .finish()
    }
}

fn check_size(size: usize) -> CipherResult<()> {
    if size < ENCRYPTION_BLOCK {
        return Err(CipherError::BlockTooSmall {
            size,
            minimum: ENCRYPTION_BLOCK,
        });
    }
    Ok(())
}

fn copy_into(input: &[u8], output: &mut [u8]) -> CipherResult<()> {
    if input.len() != output.len() {
        return Err(CipherError::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    output.copy_from_slice(input);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// XORs every byte with the first tweak byte plus one and counts calls.
    #[derive(Default)]
    struct CountingXor {
        calls: AtomicUsize,
    }

    impl CipherProvider for CountingXor {
        fn setup(&self) -> bool {
            true
        }

        fn encrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let k = tweak.as_bytes()[0].wrapping_add(1);
            block.iter_mut().for_each(|b| *b ^= k);
        }

        fn decrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
            self.encrypt_block(block, tweak);
        }
    }

    fn cipher() -> (BlockCipher, Arc<CountingXor>) {
        let provider = Arc::new(CountingXor::default());
        (BlockCipher::new("xor", provider.clone()), provider)
    }

    #[test]
    fn roundtrip_non_zero_block() {
        let (cipher, _) = cipher();
        let tweak = Tweak::from_bytes([7; 16]);
        let plain = vec![0x5a; 64];

        let mut encrypted = vec![0u8; 64];
        cipher.encrypt_block(&plain, &mut encrypted, &tweak).unwrap();
        assert_ne!(encrypted, plain);

        let mut decrypted = vec![0u8; 64];
        cipher.decrypt_block(&encrypted, &mut decrypted, &tweak).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn zero_block_bypasses_provider() {
        let (cipher, provider) = cipher();
        let tweak = Tweak::sample();

        let mut block = vec![0u8; 8192];
        cipher.encrypt_in_place(&mut block, &tweak).unwrap();
        assert!(is_all_zero(&block));
        cipher.decrypt_in_place(&mut block, &tweak).unwrap();
        assert!(is_all_zero(&block));

        let mut output = vec![0xff; 32];
        cipher.encrypt_block(&[0u8; 32], &mut output, &tweak).unwrap();
        assert_eq!(output, vec![0u8; 32]);

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn single_non_zero_byte_uses_provider() {
        let (cipher, provider) = cipher();
        let mut block = vec![0u8; 32];
        block[31] = 1;

        cipher.encrypt_in_place(&mut block, &Tweak::sample()).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn too_small_block_rejected() {
        let (cipher, _) = cipher();
        let mut block = [1u8; ENCRYPTION_BLOCK - 1];
        let result = cipher.encrypt_in_place(&mut block, &Tweak::sample());
        assert_eq!(
            result,
            Err(CipherError::BlockTooSmall {
                size: ENCRYPTION_BLOCK - 1,
                minimum: ENCRYPTION_BLOCK
            })
        );
    }

    #[test]
    fn length_mismatch_rejected() {
        let (cipher, _) = cipher();
        let mut output = [0u8; 32];
        let result = cipher.decrypt_block(&[1u8; 16], &mut output, &Tweak::sample());
        assert!(matches!(result, Err(CipherError::LengthMismatch { .. })));
    }

    #[test]
    fn sample_is_stable_and_verifies() {
        let (cipher, _) = cipher();
        let sample = cipher.sample();
        assert_eq!(sample, cipher.sample());
        assert_ne!(&sample, SAMPLE_PLAINTEXT);
        assert!(cipher.verify_sample(&sample).is_ok());

        let mut wrong = sample;
        wrong[0] ^= 1;
        assert_eq!(cipher.verify_sample(&wrong), Err(CipherError::SampleMismatch));
    }

    #[test]
    fn sample_encrypts_fixed_plaintext() {
        let (cipher, provider) = cipher();
        let mut expected = *b"postgresqlcrypt\0";
        provider.encrypt_block(&mut expected, &Tweak::sample());
        assert_eq!(cipher.sample(), expected);
    }
}
