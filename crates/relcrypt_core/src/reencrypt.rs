//! Block re-encryption across a change of storage identity.
//!
//! Every block is encrypted under a tweak derived from where it lives:
//! the relation's storage identity, its fork and its block number. Moving a
//! relation to a new identity therefore requires each block to be
//! decrypted under the old tweak and encrypted under the new one. The block
//! number is preserved; only the identity part of the tweak changes.
//!
//! ## Tweak layout
//!
//! ```text
//! | tablespace (4) | database (4) | relation (4) | fork << 30 | block (4) |
//! ```
//!
//! All fields are little-endian. Block numbers at or above
//! [`MAX_TWEAK_BLOCKS`] would overlap the fork bits and are rejected.

use crate::error::{CopyError, CopyResult};
use crate::types::{BlockNumber, ForkKind, StorageIdentity, MAX_TWEAK_BLOCKS};
use relcrypt_cipher::{BlockCipher, Tweak, TWEAK_SIZE};

/// Derives the tweak for one block.
///
/// # Errors
///
/// Returns [`CopyError::BlockNumberOverflow`] if `block` is not below
/// [`MAX_TWEAK_BLOCKS`].
pub fn relation_tweak(
    identity: &StorageIdentity,
    fork: ForkKind,
    block: BlockNumber,
) -> CopyResult<Tweak> {
    if block >= MAX_TWEAK_BLOCKS {
        return Err(CopyError::BlockNumberOverflow {
            block: u64::from(block),
        });
    }

    let mut bytes = [0u8; TWEAK_SIZE];
    bytes[0..4].copy_from_slice(&identity.tablespace.to_le_bytes());
    bytes[4..8].copy_from_slice(&identity.database.to_le_bytes());
    bytes[8..12].copy_from_slice(&identity.relation.to_le_bytes());
    bytes[12..16].copy_from_slice(&((fork.number() << 30) | block).to_le_bytes());
    Ok(Tweak::from_bytes(bytes))
}

/// One side of a re-encryption: where the blocks are encrypted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationFork {
    /// Storage identity of the relation.
    pub identity: StorageIdentity,
    /// Fork the blocks belong to.
    pub fork: ForkKind,
}

impl RelationFork {
    /// Creates a relation fork.
    #[must_use]
    pub const fn new(identity: StorageIdentity, fork: ForkKind) -> Self {
        Self { identity, fork }
    }
}

#[derive(Debug)]
struct Transform<'a> {
    cipher: &'a BlockCipher,
    source: RelationFork,
    dest: RelationFork,
}

/// Re-encrypts consecutive runs of blocks, tracking the block number.
///
/// A passthrough reencryptor leaves data untouched but still advances the
/// block counter, so block addressing stays consistent either way.
#[derive(Debug)]
pub struct BlockReencryptor<'a> {
    transform: Option<Transform<'a>>,
    block_size: usize,
    next_block: BlockNumber,
}

impl<'a> BlockReencryptor<'a> {
    /// Creates a reencryptor moving blocks from `source` to `dest`.
    #[must_use]
    pub fn new(
        cipher: &'a BlockCipher,
        source: RelationFork,
        dest: RelationFork,
        block_size: usize,
        start: BlockNumber,
    ) -> Self {
        Self {
            transform: Some(Transform {
                cipher,
                source,
                dest,
            }),
            block_size,
            next_block: start,
        }
    }

    /// Creates a reencryptor that copies blocks verbatim.
    #[must_use]
    pub fn passthrough(block_size: usize, start: BlockNumber) -> Self {
        Self {
            transform: None,
            block_size,
            next_block: start,
        }
    }

    /// Returns true if blocks pass through unchanged.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.transform.is_none()
    }

    /// Block number the next processed block will get.
    #[must_use]
    pub fn next_block(&self) -> BlockNumber {
        self.next_block
    }

    /// Processes the first `nblocks` blocks of `buf` in place.
    ///
    /// Bytes after the last complete block are left untouched. Returns the
    /// block number following the last processed block.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` holds fewer than `nblocks` blocks, if the
    /// block counter leaves the addressable range, or if the cipher rejects
    /// a block.
    pub fn process(&mut self, buf: &mut [u8], nblocks: usize) -> CopyResult<BlockNumber> {
        if buf.len() / self.block_size < nblocks {
            return Err(CopyError::invalid_operation(format!(
                "buffer of {} bytes does not hold {nblocks} blocks of {} bytes",
                buf.len(),
                self.block_size
            )));
        }

        let Some(transform) = &self.transform else {
            self.next_block = advance(self.next_block, nblocks)?;
            return Ok(self.next_block);
        };

        for block in buf.chunks_exact_mut(self.block_size).take(nblocks) {
            let source = transform.source;
            let dest = transform.dest;
            let from = relation_tweak(&source.identity, source.fork, self.next_block)?;
            transform.cipher.decrypt_in_place(block, &from)?;
            let to = relation_tweak(&dest.identity, dest.fork, self.next_block)?;
            transform.cipher.encrypt_in_place(block, &to)?;
            self.next_block = advance(self.next_block, 1)?;
        }
        Ok(self.next_block)
    }
}

fn advance(block: BlockNumber, count: usize) -> CopyResult<BlockNumber> {
    u32::try_from(count)
        .ok()
        .and_then(|count| block.checked_add(count))
        .ok_or(CopyError::BlockNumberOverflow {
            block: u64::from(block) + count as u64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relcrypt_cipher::CipherProvider;
    use relcrypt_testkit::{keystream_cipher, patterned_block, RecordingProvider};
    use std::collections::HashSet;
    use std::sync::Arc;

    const BLOCK: usize = 64;

    fn identity(relation: u32) -> StorageIdentity {
        StorageIdentity::new(1663, 5, relation)
    }

    fn encrypt_blocks(cipher: &BlockCipher, at: RelationFork, start: BlockNumber, data: &mut [u8]) {
        for (i, block) in data.chunks_exact_mut(BLOCK).enumerate() {
            let tweak = relation_tweak(&at.identity, at.fork, start + i as u32).unwrap();
            cipher.encrypt_in_place(block, &tweak).unwrap();
        }
    }

    #[test]
    fn tweak_layout() {
        let tweak = relation_tweak(
            &StorageIdentity::new(1, 2, 3),
            ForkKind::VisibilityMap,
            5,
        )
        .unwrap();
        let bytes = tweak.as_bytes();
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &((2u32 << 30) | 5).to_le_bytes());
    }

    #[test]
    fn tweaks_are_unique() {
        let mut seen = HashSet::new();
        for relation in [1, 2] {
            for fork in ForkKind::ALL {
                for block in [0, 1, MAX_TWEAK_BLOCKS - 1] {
                    let tweak = relation_tweak(&identity(relation), fork, block).unwrap();
                    assert!(seen.insert(tweak), "{relation} {fork} {block}");
                }
            }
        }
    }

    #[test]
    fn tweak_rejects_out_of_range_block() {
        let result = relation_tweak(&identity(1), ForkKind::Main, MAX_TWEAK_BLOCKS);
        assert!(matches!(result, Err(CopyError::BlockNumberOverflow { .. })));
    }

    #[test]
    fn reencrypts_under_new_identity() {
        let cipher = keystream_cipher(11);
        let source = RelationFork::new(identity(100), ForkKind::Main);
        let dest = RelationFork::new(identity(200), ForkKind::Main);

        let plain: Vec<u8> = (0..3).flat_map(|i| patterned_block(BLOCK, i)).collect();
        let mut data = plain.clone();
        encrypt_blocks(&cipher, source, 10, &mut data);

        let mut expected = plain.clone();
        encrypt_blocks(&cipher, dest, 10, &mut expected);

        let mut reencryptor = BlockReencryptor::new(&cipher, source, dest, BLOCK, 10);
        assert_eq!(reencryptor.process(&mut data, 3).unwrap(), 13);
        assert_eq!(data, expected);
    }

    #[test]
    fn fork_change_is_honoured() {
        let cipher = keystream_cipher(2);
        let source = RelationFork::new(identity(7), ForkKind::Init);
        let dest = RelationFork::new(identity(7), ForkKind::Main);

        let plain = patterned_block(BLOCK, 9);
        let mut data = plain.clone();
        encrypt_blocks(&cipher, source, 0, &mut data);
        let mut expected = plain;
        encrypt_blocks(&cipher, dest, 0, &mut expected);

        BlockReencryptor::new(&cipher, source, dest, BLOCK, 0)
            .process(&mut data, 1)
            .unwrap();
        assert_eq!(data, expected);
    }

    #[test]
    fn partial_tail_untouched() {
        let cipher = keystream_cipher(4);
        let source = RelationFork::new(identity(1), ForkKind::Main);
        let dest = RelationFork::new(identity(2), ForkKind::Main);

        let mut data = patterned_block(BLOCK + 10, 1);
        let tail = data[BLOCK..].to_vec();
        BlockReencryptor::new(&cipher, source, dest, BLOCK, 0)
            .process(&mut data, 1)
            .unwrap();
        assert_eq!(&data[BLOCK..], tail.as_slice());
    }

    #[test]
    fn zero_blocks_skip_provider() {
        let provider = Arc::new(RecordingProvider::keystream(5));
        let cipher = BlockCipher::new("rec", provider.clone() as Arc<dyn CipherProvider>);
        let source = RelationFork::new(identity(1), ForkKind::Main);
        let dest = RelationFork::new(identity(2), ForkKind::Main);

        let mut data = vec![0u8; BLOCK * 4];
        BlockReencryptor::new(&cipher, source, dest, BLOCK, 0)
            .process(&mut data, 4)
            .unwrap();
        assert!(data.iter().all(|&b| b == 0));
        assert_eq!(provider.encrypt_calls(), 0);
        assert_eq!(provider.decrypt_calls(), 0);
    }

    #[test]
    fn destination_tweaks_unique_per_block() {
        let provider = Arc::new(RecordingProvider::keystream(8));
        let cipher = BlockCipher::new("rec", provider.clone() as Arc<dyn CipherProvider>);
        let source = RelationFork::new(identity(1), ForkKind::FreeSpaceMap);
        let dest = RelationFork::new(identity(2), ForkKind::FreeSpaceMap);

        let mut data: Vec<u8> = (0..6).flat_map(|i| patterned_block(BLOCK, i)).collect();
        let mut reencryptor = BlockReencryptor::new(&cipher, source, dest, BLOCK, 0);
        reencryptor.process(&mut data[..BLOCK * 3], 3).unwrap();
        reencryptor.process(&mut data[BLOCK * 3..], 3).unwrap();

        assert_eq!(provider.encrypt_calls(), 6);
        assert!(provider.encrypt_tweaks_unique());
        assert_eq!(reencryptor.next_block(), 6);
    }

    #[test]
    fn passthrough_advances_counter() {
        let original = patterned_block(BLOCK * 2, 3);
        let mut data = original.clone();
        let mut reencryptor = BlockReencryptor::passthrough(BLOCK, 131_072);
        assert!(reencryptor.is_passthrough());
        assert_eq!(reencryptor.process(&mut data, 2).unwrap(), 131_074);
        assert_eq!(data, original);
    }

    #[test]
    fn rejects_short_buffer() {
        let mut data = vec![1u8; BLOCK];
        let result = BlockReencryptor::passthrough(BLOCK, 0).process(&mut data, 2);
        assert!(matches!(result, Err(CopyError::InvalidOperation { .. })));
    }

    #[test]
    fn counter_overflow_detected() {
        let mut data = vec![1u8; BLOCK];
        let result = BlockReencryptor::passthrough(BLOCK, u32::MAX).process(&mut data, 1);
        assert!(matches!(result, Err(CopyError::BlockNumberOverflow { .. })));
    }
}
