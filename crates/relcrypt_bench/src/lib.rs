//! Benchmark utilities.

use rand::Rng;
use std::fs;
use std::io;
use std::path::Path;

/// Generate random block data of the specified size.
///
/// Random data is all-zero with negligible probability, so every block
/// reaches the provider.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Populate `dir` with `files` relation files of `blocks` blocks each.
///
/// Every fourth file is given a non-relation name so the verbatim copy path
/// is exercised too.
pub fn populate_relation_dir(
    dir: &Path,
    files: usize,
    block_size: usize,
    blocks: usize,
) -> io::Result<()> {
    for i in 0..files {
        let name = if i % 4 == 3 {
            format!("pg_internal.{i}")
        } else {
            format!("{}", 16384 + i)
        };
        fs::write(dir.join(name), random_data(block_size * blocks))?;
    }
    Ok(())
}
