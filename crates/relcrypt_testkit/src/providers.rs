//! Cipher provider test doubles.
//!
//! None of these are real ciphers. They are deterministic, tweak-sensitive
//! transforms that let tests observe what the copy layer does with blocks.

use parking_lot::Mutex;
use rand::RngCore;
use relcrypt_cipher::{BlockCipher, CipherProvider, ProviderRegistry, StaticLoader, Tweak};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the keystream provider's key in bytes.
pub const KEY_SIZE: usize = 32;

/// XORs each block with a SHA-256 keystream derived from key and tweak.
///
/// Encryption and decryption are the same operation. Different keys or
/// tweaks produce unrelated output, which is all the copy tests need.
/// The key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeystreamProvider {
    key: [u8; KEY_SIZE],
}

impl KeystreamProvider {
    /// Creates a provider with the given key.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Creates a provider whose key is `seed` repeated.
    #[must_use]
    pub fn from_seed(seed: u8) -> Self {
        Self::new([seed; KEY_SIZE])
    }

    /// Creates a provider with a random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(key)
    }

    fn apply(&self, block: &mut [u8], tweak: &Tweak) {
        for (counter, chunk) in block.chunks_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(self.key);
            hasher.update(tweak.as_bytes());
            hasher.update((counter as u64).to_le_bytes());
            let pad = hasher.finalize();
            chunk.iter_mut().zip(pad.iter()).for_each(|(b, k)| *b ^= k);
        }
    }
}

impl CipherProvider for KeystreamProvider {
    fn setup(&self) -> bool {
        true
    }

    fn encrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
        self.apply(block, tweak);
    }

    fn decrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
        self.apply(block, tweak);
    }
}

impl std::fmt::Debug for KeystreamProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystreamProvider")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Wraps another provider and records every call.
pub struct RecordingProvider {
    inner: Arc<dyn CipherProvider>,
    setups: AtomicUsize,
    encrypted: Mutex<Vec<Tweak>>,
    decrypted: Mutex<Vec<Tweak>>,
}

impl RecordingProvider {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn CipherProvider>) -> Self {
        Self {
            inner,
            setups: AtomicUsize::new(0),
            encrypted: Mutex::new(Vec::new()),
            decrypted: Mutex::new(Vec::new()),
        }
    }

    /// Wraps a [`KeystreamProvider`] seeded with `seed`.
    #[must_use]
    pub fn keystream(seed: u8) -> Self {
        Self::new(Arc::new(KeystreamProvider::from_seed(seed)))
    }

    /// Number of times `setup` was called.
    #[must_use]
    pub fn setup_calls(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    /// Number of blocks handed to `encrypt_block`.
    #[must_use]
    pub fn encrypt_calls(&self) -> usize {
        self.encrypted.lock().len()
    }

    /// Number of blocks handed to `decrypt_block`.
    #[must_use]
    pub fn decrypt_calls(&self) -> usize {
        self.decrypted.lock().len()
    }

    /// Tweaks passed to `encrypt_block`, in call order.
    #[must_use]
    pub fn encrypt_tweaks(&self) -> Vec<Tweak> {
        self.encrypted.lock().clone()
    }

    /// Tweaks passed to `decrypt_block`, in call order.
    #[must_use]
    pub fn decrypt_tweaks(&self) -> Vec<Tweak> {
        self.decrypted.lock().clone()
    }

    /// Returns true if no tweak was used for more than one encryption.
    #[must_use]
    pub fn encrypt_tweaks_unique(&self) -> bool {
        let tweaks = self.encrypted.lock();
        let unique: HashSet<_> = tweaks.iter().collect();
        unique.len() == tweaks.len()
    }

    /// Forgets all recorded calls.
    pub fn reset(&self) {
        self.encrypted.lock().clear();
        self.decrypted.lock().clear();
    }
}

impl CipherProvider for RecordingProvider {
    fn setup(&self) -> bool {
        self.setups.fetch_add(1, Ordering::SeqCst);
        self.inner.setup()
    }

    fn encrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
        self.encrypted.lock().push(*tweak);
        self.inner.encrypt_block(block, tweak);
    }

    fn decrypt_block(&self, block: &mut [u8], tweak: &Tweak) {
        self.decrypted.lock().push(*tweak);
        self.inner.decrypt_block(block, tweak);
    }
}

/// A provider whose setup always fails.
#[derive(Debug, Default)]
pub struct FailingSetupProvider;

impl CipherProvider for FailingSetupProvider {
    fn setup(&self) -> bool {
        false
    }

    fn encrypt_block(&self, _block: &mut [u8], _tweak: &Tweak) {}

    fn decrypt_block(&self, _block: &mut [u8], _tweak: &Tweak) {}
}

/// Returns a [`BlockCipher`] over a keystream provider seeded with `seed`.
#[must_use]
pub fn keystream_cipher(seed: u8) -> BlockCipher {
    BlockCipher::new(format!("keystream-{seed}"), Arc::new(KeystreamProvider::from_seed(seed)))
}

/// Returns a [`StaticLoader`] whose module `name` registers `provider`.
#[must_use]
pub fn loader_for(name: &str, provider: Arc<dyn CipherProvider>) -> StaticLoader {
    let module = name.to_string();
    StaticLoader::new().with_module(name, move |registry: &ProviderRegistry| {
        registry.register(&module, Arc::clone(&provider));
    })
}
