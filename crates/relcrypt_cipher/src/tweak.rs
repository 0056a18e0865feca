//! Per-block cipher tweaks.

use std::fmt;

/// Size of a tweak in bytes.
pub const TWEAK_SIZE: usize = 16;

/// A 16-byte per-block input to the cipher.
///
/// Tweaks make the ciphertext of a block depend on where the block lives,
/// so equal plaintext blocks at different positions encrypt differently
/// under a shared key. Two distinct blocks must never share a tweak.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tweak([u8; TWEAK_SIZE]);

impl Tweak {
    /// Creates a tweak from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TWEAK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the tweak bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TWEAK_SIZE] {
        &self.0
    }

    /// The fixed tweak `0, 1, ..., 15` used for the encryption sample.
    #[must_use]
    pub fn sample() -> Self {
        let mut bytes = [0u8; TWEAK_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = i as u8;
        }
        Self(bytes)
    }
}

impl fmt::Debug for Tweak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tweak(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
