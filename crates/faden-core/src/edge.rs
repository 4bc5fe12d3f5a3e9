//! Guarded, directed edges between nodes.

use serde::{Deserialize, Serialize};

use crate::condition::Guard;
use crate::ids::{EdgeId, NodeId};

/// A directed transition between two nodes of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique id within the segment.
    pub id: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Selects a specific output of the source node: a dialogue choice id,
    /// a branch case id, or a node-event id. `None` is the plain output.
    pub source_handle: Option<String>,
    /// Guard evaluated before the edge is taken.
    pub guard: Option<Guard>,
}

impl Edge {
    /// Create an unguarded edge on the plain output.
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            source_handle: None,
            guard: None,
        }
    }

    /// Attach the edge to a named output of the source node.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Guard the edge.
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}
