//! Directory copy.

use super::{CopyStats, FileRelocation, RelationCopier, Relocation};
use crate::error::{CopyError, CopyResult, FileOp, IoContext};
use crate::filename::parse_relation_filename;
use crate::sync::{fsync_dir, fsync_file};
use crate::types::SegmentIndex;
use std::fs::{self, DirBuilder, DirEntry};
use std::path::Path;
use tracing::{debug, info};

impl RelationCopier {
    /// Copies every regular file directly inside `from` into a new
    /// directory `to`.
    ///
    /// Subdirectories, symlinks and other special entries are skipped.
    /// When encryption is active, files whose names parse as relation
    /// files are re-encrypted from `relocation.source` to
    /// `relocation.dest`, with the relation OID taken from the filename.
    /// All other files are copied verbatim.
    ///
    /// Unless fsync is disabled in the configuration, every copied file and
    /// then `to` itself are synced before this returns. A copy that returns
    /// `Ok` with fsync enabled survives a crash.
    ///
    /// # Errors
    ///
    /// - [`CopyError::MissingRelocation`] if encryption is active and no
    ///   relocation is given; nothing is created in that case
    /// - [`CopyError::BlockNumberOverflow`] if a re-encrypted relation
    ///   file holds a block numbered [`crate::MAX_TWEAK_BLOCKS`] or above;
    ///   with the default segment size that is any segment from 8192 on
    /// - [`CopyError::FileAccess`] if `to` already exists or any file
    ///   system step fails
    /// - [`CopyError::Cancelled`] if the cancel token fires
    ///
    /// On error the destination may be partially populated.
    pub fn copy_dir(
        &self,
        from: &Path,
        to: &Path,
        relocation: Option<&Relocation>,
    ) -> CopyResult<CopyStats> {
        let relocation = match (&self.cipher, relocation) {
            (Some(_), None) => return Err(CopyError::MissingRelocation),
            (Some(_), Some(relocation)) => Some(relocation),
            (None, _) => None,
        };

        create_dir(to)?;

        let mut stats = CopyStats::default();
        for entry in fs::read_dir(from).context(FileOp::OpenDir, from)? {
            self.cancel.check()?;

            let entry = entry.context(FileOp::ReadDir, from)?;
            let source = entry.path();
            let file_type = fs::symlink_metadata(&source)
                .context(FileOp::Stat, &source)?
                .file_type();
            if !file_type.is_file() {
                debug!(path = %source.display(), "skipping non-regular entry");
                stats.entries_skipped += 1;
                continue;
            }

            let dest = to.join(entry.file_name());
            let (file_relocation, segment) = match relocation {
                Some(relocation) => classify(&entry, relocation),
                None => (None, 0),
            };

            let bytes = self.copy_file(&source, &dest, file_relocation.as_ref(), segment)?;
            stats.files_copied += 1;
            stats.bytes_copied += bytes;
            if file_relocation.is_some() {
                stats.files_reencrypted += 1;
            }
        }

        if self.config.enable_fsync {
            self.sync_copied(to)?;
        }

        info!(
            from = %from.display(),
            to = %to.display(),
            files = stats.files_copied,
            reencrypted = stats.files_reencrypted,
            skipped = stats.entries_skipped,
            bytes = stats.bytes_copied,
            "copied directory"
        );
        Ok(stats)
    }

    /// Syncs every regular file in `dir`, then `dir` itself.
    ///
    /// The directory is enumerated again rather than tracking what was
    /// copied, so this also covers files that were copied before a crash.
    fn sync_copied(&self, dir: &Path) -> CopyResult<()> {
        for entry in fs::read_dir(dir).context(FileOp::OpenDir, dir)? {
            self.cancel.check()?;

            let path = entry.context(FileOp::ReadDir, dir)?.path();
            let file_type = fs::symlink_metadata(&path)
                .context(FileOp::Stat, &path)?
                .file_type();
            if file_type.is_file() {
                fsync_file(&path)?;
            }
        }
        fsync_dir(dir)
    }
}

/// Decides how one regular file is copied.
///
/// Only names that parse as relation files with an OID fitting in 32 bits
/// are re-encrypted.
fn classify(
    entry: &DirEntry,
    relocation: &Relocation,
) -> (Option<FileRelocation>, SegmentIndex) {
    let name = entry.file_name();
    let Some(name) = name.to_str() else {
        return (None, 0);
    };
    let Some(parsed) = parse_relation_filename(name) else {
        return (None, 0);
    };
    match parsed.oid(name) {
        Some(oid) => (Some(relocation.for_file(oid, parsed.fork)), parsed.segment),
        None => {
            debug!(name, "relation OID out of range, copying verbatim");
            (None, 0)
        }
    }
}

fn create_dir(path: &Path) -> CopyResult<()> {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).context(FileOp::CreateDir, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CopyConfig;
    use crate::reencrypt::relation_tweak;
    use crate::types::{ForkKind, StorageIdentity, MAX_TWEAK_BLOCKS, RELSEG_SIZE};
    use relcrypt_cipher::{BlockCipher, CipherProvider, EncryptionState};
    use relcrypt_testkit::{
        keystream_cipher, relation_contents, snapshot_files, write_file, RecordingProvider, Scratch,
    };
    use std::sync::Arc;

    const BLOCK: usize = 32;

    fn config() -> CopyConfig {
        CopyConfig::new().block_size(BLOCK).buffer_blocks(2).segment_blocks(8)
    }

    fn encrypt_for(
        cipher: &BlockCipher,
        identity: StorageIdentity,
        fork: ForkKind,
        data: &mut [u8],
    ) {
        for (i, block) in data.chunks_exact_mut(BLOCK).enumerate() {
            let tweak = relation_tweak(&identity, fork, i as u32).unwrap();
            cipher.encrypt_in_place(block, &tweak).unwrap();
        }
    }

    #[test]
    fn plain_copy_of_regular_files() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        write_file(&from, "1259", &relation_contents(BLOCK, 3, 1, &[]));
        write_file(&from, "PG_VERSION", b"17\n");
        scratch.mkdir("src/nested");

        let copier = RelationCopier::new(config(), &EncryptionState::disabled()).unwrap();
        let to = scratch.join("dst");
        let stats = copier.copy_dir(&from, &to, None).unwrap();

        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.files_reencrypted, 0);
        assert_eq!(stats.entries_skipped, 1);
        assert_eq!(stats.bytes_copied, (BLOCK * 3 + 3) as u64);
        assert_eq!(snapshot_files(&from).unwrap(), snapshot_files(&to).unwrap());
        assert!(!to.join("nested").exists());
    }

    #[test]
    fn existing_destination_rejected() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        write_file(&from, "1", b"x");
        let to = scratch.mkdir("dst");

        let copier = RelationCopier::new(config(), &EncryptionState::disabled()).unwrap();
        let result = copier.copy_dir(&from, &to, None);
        assert!(matches!(
            result,
            Err(CopyError::FileAccess { op: FileOp::CreateDir, .. })
        ));
        assert!(!to.join("1").exists());
    }

    #[test]
    fn missing_relocation_creates_nothing() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        let to = scratch.join("dst");

        let copier =
            RelationCopier::new(config(), &EncryptionState::enabled(keystream_cipher(1))).unwrap();
        assert!(matches!(
            copier.copy_dir(&from, &to, None),
            Err(CopyError::MissingRelocation)
        ));
        assert!(!to.exists());
    }

    #[test]
    fn reencrypts_relation_files_only() {
        let scratch = Scratch::new();
        let cipher = keystream_cipher(7);
        let source = StorageIdentity::new(1663, 1, 0);
        let dest = StorageIdentity::new(1663, 16384, 0);

        let plain = relation_contents(BLOCK, 4, 3, &[1]);
        let mut main = plain.clone();
        encrypt_for(&cipher, source.with_relation(2619), ForkKind::Main, &mut main);
        let mut fsm = plain.clone();
        encrypt_for(&cipher, source.with_relation(2619), ForkKind::FreeSpaceMap, &mut fsm);

        let from = scratch.mkdir("src");
        write_file(&from, "2619", &main);
        write_file(&from, "2619_fsm", &fsm);
        write_file(&from, "pg_filenode.map", &plain);
        write_file(&from, "99999999999", &plain);

        let copier = RelationCopier::new(config(), &EncryptionState::enabled(cipher)).unwrap();
        let to = scratch.join("dst");
        let stats = copier
            .copy_dir(&from, &to, Some(&Relocation::new(source, dest)))
            .unwrap();
        assert_eq!(stats.files_copied, 4);
        assert_eq!(stats.files_reencrypted, 2);

        let check = keystream_cipher(7);
        let mut expected_main = plain.clone();
        encrypt_for(&check, dest.with_relation(2619), ForkKind::Main, &mut expected_main);
        let mut expected_fsm = plain.clone();
        encrypt_for(&check, dest.with_relation(2619), ForkKind::FreeSpaceMap, &mut expected_fsm);

        assert_eq!(fs::read(to.join("2619")).unwrap(), expected_main);
        assert_eq!(fs::read(to.join("2619_fsm")).unwrap(), expected_fsm);
        assert_eq!(fs::read(to.join("pg_filenode.map")).unwrap(), plain);
        assert_eq!(fs::read(to.join("99999999999")).unwrap(), plain);
    }

    #[test]
    fn segments_use_global_block_numbers() {
        let scratch = Scratch::new();
        let provider = Arc::new(RecordingProvider::keystream(2));
        let cipher = BlockCipher::new("rec", provider.clone() as Arc<dyn CipherProvider>);
        let source = StorageIdentity::new(1, 1, 0);
        let dest = StorageIdentity::new(1, 2, 0);

        let from = scratch.mkdir("src");
        write_file(&from, "500", &relation_contents(BLOCK, 8, 1, &[]));
        write_file(&from, "500.1", &relation_contents(BLOCK, 2, 2, &[]));

        let copier = RelationCopier::new(config(), &EncryptionState::enabled(cipher)).unwrap();
        copier
            .copy_dir(&from, &scratch.join("dst"), Some(&Relocation::new(source, dest)))
            .unwrap();

        let tweaks = provider.encrypt_tweaks();
        assert_eq!(tweaks.len(), 10);
        assert!(provider.encrypt_tweaks_unique());
        for block in 0..10 {
            let tweak = relation_tweak(&dest.with_relation(500), ForkKind::Main, block).unwrap();
            assert!(tweaks.contains(&tweak), "block {block}");
        }
    }

    #[test]
    fn segment_beyond_tweak_range_rejected() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        write_file(&from, "16384.8192", &relation_contents(BLOCK, 1, 1, &[]));
        let config = config().segment_blocks(RELSEG_SIZE);
        let relocation =
            Relocation::new(StorageIdentity::new(1, 1, 0), StorageIdentity::new(1, 2, 0));

        let copier =
            RelationCopier::new(config.clone(), &EncryptionState::enabled(keystream_cipher(1)))
                .unwrap();
        let result = copier.copy_dir(&from, &scratch.join("dst"), Some(&relocation));
        assert!(matches!(
            result,
            Err(CopyError::BlockNumberOverflow { block }) if block == u64::from(MAX_TWEAK_BLOCKS)
        ));

        // Verbatim copies are not limited by the tweak range.
        let plain = RelationCopier::new(config, &EncryptionState::disabled()).unwrap();
        let stats = plain.copy_dir(&from, &scratch.join("plain"), None).unwrap();
        assert_eq!(stats.files_copied, 1);
    }

    #[test]
    fn fsync_can_be_disabled() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        write_file(&from, "1", b"data");

        let copier = RelationCopier::new(
            config().enable_fsync(false),
            &EncryptionState::disabled(),
        )
        .unwrap();
        let to = scratch.join("dst");
        copier.copy_dir(&from, &to, None).unwrap();
        assert_eq!(fs::read(to.join("1")).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let scratch = Scratch::new();
        let from = scratch.mkdir("src");
        let target = write_file(scratch.path(), "outside", b"x");
        std::os::unix::fs::symlink(&target, from.join("16384")).unwrap();

        let copier = RelationCopier::new(config(), &EncryptionState::disabled()).unwrap();
        let to = scratch.join("dst");
        let stats = copier.copy_dir(&from, &to, None).unwrap();
        assert_eq!(stats.files_copied, 0);
        assert_eq!(stats.entries_skipped, 1);
        assert!(!to.join("16384").exists());
    }
}
