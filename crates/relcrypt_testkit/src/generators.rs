//! Property-based test generators using proptest.

use proptest::prelude::*;
use relcrypt_cipher::{Tweak, TWEAK_SIZE};

/// Fork suffixes accepted in relation filenames.
pub const FORK_SUFFIXES: [&str; 3] = ["fsm", "vm", "init"];

/// A generated well-formed relation filename and its components.
#[derive(Debug, Clone)]
pub struct GeneratedName {
    /// The full filename.
    pub name: String,
    /// Number of OID digits.
    pub oid_chars: usize,
    /// Fork suffix, if any.
    pub fork: Option<&'static str>,
    /// Segment number, if a suffix was generated.
    pub segment: Option<u32>,
}

/// Strategy for well-formed relation filenames with at most `max_oid_chars` digits.
pub fn relation_filename_strategy(max_oid_chars: usize) -> impl Strategy<Value = GeneratedName> {
    (
        prop::string::string_regex(&format!("[0-9]{{1,{max_oid_chars}}}")).expect("Invalid regex"),
        prop::option::of(prop::sample::select(FORK_SUFFIXES.to_vec())),
        prop::option::of(any::<u32>()),
    )
        .prop_map(|(oid, fork, segment)| {
            let mut name = oid.clone();
            if let Some(fork) = fork {
                name.push('_');
                name.push_str(fork);
            }
            if let Some(segment) = segment {
                name.push('.');
                name.push_str(&segment.to_string());
            }
            GeneratedName {
                name,
                oid_chars: oid.len(),
                fork,
                segment,
            }
        })
}

/// Strategy for arbitrary short strings biased toward filename-like text.
pub fn arbitrary_filename_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        prop::string::string_regex("[0-9_.a-z]{0,24}").expect("Invalid regex"),
    ]
}

/// Strategy for blocks of `size` bytes with at least one non-zero byte.
pub fn non_zero_block_strategy(size: usize) -> impl Strategy<Value = Vec<u8>> {
    (prop::collection::vec(any::<u8>(), size), 0..size, 1u8..=255).prop_map(
        |(mut block, index, value)| {
            block[index] = value;
            block
        },
    )
}

/// Strategy for arbitrary tweaks.
pub fn tweak_strategy() -> impl Strategy<Value = Tweak> {
    prop::array::uniform16(any::<u8>()).prop_map(|bytes: [u8; TWEAK_SIZE]| Tweak::from_bytes(bytes))
}
