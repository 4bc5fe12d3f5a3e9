//! Error types for the edit crate.

use faden_core::{AttributeId, CoreError, NodeId, SegmentId};
use thiserror::Error;

/// Errors that can occur while applying or reverting an edit.
#[derive(Debug, Error)]
pub enum EditError {
    /// The document rejected the mutation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A command referenced a segment the story does not contain.
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// A command referenced a node the segment does not contain.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A command referenced an attribute the story does not declare.
    #[error("attribute not found: {0}")]
    AttributeNotFound(AttributeId),

    /// A revert ran without the state its apply should have stashed.
    #[error("command has no stashed state to revert from")]
    MissingRevertState,
}

/// Convenience alias for edit results.
pub type EditResult<T> = Result<T, EditError>;
