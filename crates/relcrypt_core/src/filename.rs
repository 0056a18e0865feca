//! Relation filename grammar.
//!
//! Relation files are named `<oid>[_<fork>][.<segment>]`:
//!
//! ```text
//! 16384        main fork, segment 0
//! 16384_fsm    free space map, segment 0
//! 16384.3      main fork, segment 3
//! 16384_vm.1   visibility map, segment 1
//! ```
//!
//! The main fork is never spelled out, so `16384_main` does not match.
//! Anything that does not match is copied as an opaque file.

use crate::types::{ForkKind, Oid, SegmentIndex, OID_CHARS};

/// A successfully parsed relation filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationFilename {
    /// Number of leading OID digits, at most [`OID_CHARS`].
    pub oid_chars: usize,
    /// Fork named by the suffix, [`ForkKind::Main`] if there is none.
    pub fork: ForkKind,
    /// Segment number, 0 if there is none.
    pub segment: SegmentIndex,
}

impl RelationFilename {
    /// Reads the OID digits from `name`, the filename this was parsed from.
    ///
    /// Returns `None` if the digits do not fit in an [`Oid`].
    #[must_use]
    pub fn oid(&self, name: &str) -> Option<Oid> {
        name.get(..self.oid_chars)?.parse().ok()
    }
}

/// Parses a putative relation filename.
///
/// Returns `None` unless the whole name matches the grammar. A segment
/// number that does not fit in a [`SegmentIndex`] is a mismatch.
#[must_use]
pub fn parse_relation_filename(name: &str) -> Option<RelationFilename> {
    let oid_chars = leading_digits(name);
    if oid_chars == 0 || oid_chars > OID_CHARS {
        return None;
    }
    let mut rest = &name[oid_chars..];

    let mut fork = ForkKind::Main;
    if let Some(after) = rest.strip_prefix('_') {
        let found = fork_prefix(after)?;
        fork = found;
        rest = &after[found.name().len()..];
    }

    let mut segment = 0;
    if let Some(after) = rest.strip_prefix('.') {
        let digits = leading_digits(after);
        if digits == 0 {
            return None;
        }
        segment = after[..digits].parse().ok()?;
        rest = &after[digits..];
    }

    rest.is_empty().then_some(RelationFilename {
        oid_chars,
        fork,
        segment,
    })
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Matches a non-main fork name at the start of `s`.
fn fork_prefix(s: &str) -> Option<ForkKind> {
    ForkKind::ALL
        .into_iter()
        .skip(1)
        .find(|fork| s.starts_with(fork.name()))
}
