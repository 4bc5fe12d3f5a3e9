use crate::ids::{EdgeId, NodeId, SegmentId};

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating a story document.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A node with the same id already exists in the segment.
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// The requested node id does not exist in the segment.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The requested edge id does not exist in the segment.
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// The requested segment id does not exist in the story.
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// An edge references a node that is not present in the segment.
    #[error("edge {edge} references missing node {node}")]
    DanglingEdge {
        /// The offending edge.
        edge: EdgeId,
        /// The missing endpoint.
        node: NodeId,
    },
}
