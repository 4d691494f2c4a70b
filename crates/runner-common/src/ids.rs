//! ID types for catalog entries, placements and scene nodes.

use serde::{Deserialize, Serialize};

/// Identifier of a segment definition in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u32);

impl SegmentId {
    /// Creates a segment ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

/// Sequence number of an accepted placement within one level.
///
/// Assigned by the placement engine in acceptance order, starting at 0
/// for the spawn platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId(u64);

impl PlacementId {
    /// Creates a placement ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the first placement of a level.
    #[must_use]
    pub const fn is_first(self) -> bool {
        self.0 == 0
    }
}

/// Handle to a node owned by the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid node.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) node ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}
