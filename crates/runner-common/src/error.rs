//! Error types for AutoRunner.

use thiserror::Error;

/// Top-level error type for AutoRunner operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Catalog/configuration errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Track generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Segment catalog errors. All of these are fatal at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Catalog has no segments
    #[error("segment catalog is empty")]
    Empty,

    /// Two segments share an ID
    #[error("duplicate segment ID: {0}")]
    DuplicateId(u32),

    /// A required socket is missing
    #[error("segment '{segment}' is missing socket {socket}")]
    MissingSocket {
        /// Segment name
        segment: String,
        /// Socket role
        socket: String,
    },

    /// A required rail is missing
    #[error("segment '{segment}' is missing rail {rail}")]
    MissingRail {
        /// Segment name
        segment: String,
        /// Rail key, e.g. `CenterOutL`
        rail: String,
    },

    /// Declared exit count disagrees with the sockets present
    #[error("segment '{segment}' declares {declared} exits but has {found} exit sockets")]
    ExitCountMismatch {
        /// Segment name
        segment: String,
        /// Exit count from the definition
        declared: u32,
        /// Exit sockets actually present
        found: u32,
    },

    /// Any other malformed data
    #[error("invalid segment data: {0}")]
    InvalidData(String),
}

/// Track generation errors raised by the placement engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Nothing can be placed
    #[error("cannot generate track: {0}")]
    Catalog(#[from] CatalogError),

    /// Clearance probe kept failing for one slot
    #[error("placement #{slot} exhausted its retry budget after {attempts} attempts")]
    PlacementExhausted {
        /// Placement sequence number that could not be filled
        slot: u64,
        /// Attempts made
        attempts: u32,
    },

    /// Tried to extend past a fork whose branch has not been chosen
    #[error("track tail is an unresolved fork")]
    UnresolvedFork,
}

/// Result type alias for AutoRunner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
