//! On-disk fixtures for copy tests.
//!
//! Provides a scratch directory with helpers to lay out relation files and
//! to inspect what a copy produced.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory removed when dropped.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Creates a new scratch directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the root path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns `name` joined onto the root.
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a subdirectory and returns its path.
    pub fn mkdir(&self, name: &str) -> PathBuf {
        let path = self.join(name);
        fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `contents` to `dir/name`, replacing any existing file.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture file");
    path
}

/// Returns a deterministic, never all-zero block of `block_size` bytes.
pub fn patterned_block(block_size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..block_size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as u8) | 1
        })
        .collect()
}

/// Builds `nblocks` blocks of content.
///
/// Blocks whose index is listed in `zero_blocks` are all zeros, the rest
/// are patterned from `seed`.
pub fn relation_contents(
    block_size: usize,
    nblocks: usize,
    seed: u64,
    zero_blocks: &[usize],
) -> Vec<u8> {
    let mut contents = Vec::with_capacity(block_size * nblocks);
    for i in 0..nblocks {
        if zero_blocks.contains(&i) {
            contents.extend(std::iter::repeat(0u8).take(block_size));
        } else {
            contents.extend(patterned_block(block_size, seed.wrapping_add(i as u64)));
        }
    }
    contents
}

/// Reads every regular file directly inside `dir`, keyed by name.
pub fn snapshot_files(dir: &Path) -> io::Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            files.insert(name, fs::read(entry.path())?);
        }
    }
    Ok(files)
}

/// Lists every entry name directly inside `dir`, sorted.
pub fn entry_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
