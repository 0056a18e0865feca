//! Relation storage addressing.

use std::fmt;

/// Object identifier of a tablespace, database or relation.
pub type Oid = u32;

/// Block number within one fork of a relation, counted across segments.
pub type BlockNumber = u32;

/// Index of a segment file within one fork of a relation.
pub type SegmentIndex = u32;

/// Size of a relation data block in bytes.
pub const BLOCK_SIZE: usize = 8192;

/// Number of blocks in a full segment file (1 GiB of 8 KiB blocks).
pub const RELSEG_SIZE: BlockNumber = 131_072;

/// Maximum number of decimal digits in the OID part of a filename.
pub const OID_CHARS: usize = 10;

/// Block numbers must stay below this for tweaks to remain unique.
///
/// The tweak packs the fork into the top two bits of a 32-bit word and the
/// block number into the remaining thirty.
pub const MAX_TWEAK_BLOCKS: BlockNumber = 1 << 30;

/// Names the on-disk storage of one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageIdentity {
    /// Tablespace OID.
    pub tablespace: Oid,
    /// Database OID.
    pub database: Oid,
    /// Relation file OID.
    pub relation: Oid,
}

impl StorageIdentity {
    /// Creates a storage identity.
    #[must_use]
    pub const fn new(tablespace: Oid, database: Oid, relation: Oid) -> Self {
        Self {
            tablespace,
            database,
            relation,
        }
    }

    /// Returns a copy with the relation OID replaced.
    #[must_use]
    pub const fn with_relation(self, relation: Oid) -> Self {
        Self { relation, ..self }
    }
}

impl fmt::Display for StorageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tablespace, self.database, self.relation)
    }
}

/// The sub-file category of a relation's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ForkKind {
    /// Main data.
    #[default]
    Main,
    /// Free space map.
    FreeSpaceMap,
    /// Visibility map.
    VisibilityMap,
    /// Initialization fork of unlogged relations.
    Init,
}

impl ForkKind {
    /// Every fork, in fork number order.
    pub const ALL: [ForkKind; 4] = [
        ForkKind::Main,
        ForkKind::FreeSpaceMap,
        ForkKind::VisibilityMap,
        ForkKind::Init,
    ];

    /// Returns the fork number.
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Main => 0,
            Self::FreeSpaceMap => 1,
            Self::VisibilityMap => 2,
            Self::Init => 3,
        }
    }

    /// Returns the on-disk fork name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::FreeSpaceMap => "fsm",
            Self::VisibilityMap => "vm",
            Self::Init => "init",
        }
    }

    /// Looks a fork up by its on-disk name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fork| fork.name() == name)
    }
}

impl fmt::Display for ForkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
