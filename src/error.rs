//! Error types for the tree engine.

use thiserror::Error;

/// Errors that can occur during tree navigation, merkleization and proofs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Index does not fit in a generalized index of the given depth
    #[error("index {index} is out of range for a gindex of depth {depth}")]
    MalformedIndex { index: u64, depth: u32 },

    /// Gindex 0 does not address any tree position
    #[error("invalid generalized index {0}")]
    InvalidGindex(u64),

    /// A leaf was found where the path still needs a pair to descend into.
    #[error("cannot navigate to gindex {gindex}: hit a leaf with {depth} levels of path left")]
    NavigationFailure { gindex: u64, depth: u32 },

    /// A chunk was expected but the node is a pair
    #[error("expected a leaf at gindex {gindex}, found a pair")]
    NotALeaf { gindex: u64 },

    /// Count or length exceeds the declared limit
    #[error("length {length} exceeds limit {limit}")]
    CapacityViolation { length: u64, limit: u64 },

    /// Subtree fill was given nothing to fill with
    #[error("no nodes to fill subtree with")]
    EmptyContents,

    /// Element index past the current length
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: u64, length: u64 },

    /// Invalid bitlist encoding
    #[error("invalid bitlist: {0}")]
    InvalidBitlist(String),

    /// Invalid bitvector encoding
    #[error("invalid bitvector: {0}")]
    InvalidBitvector(String),

    /// Bitfields compared byte by byte must be non-empty and equally long
    #[error("cannot compare bitfields of {left} and {right} bytes")]
    BitfieldMismatch { left: usize, right: usize },

    /// Invalid proof
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
