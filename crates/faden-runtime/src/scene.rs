//! Node hierarchy and selection bookkeeping for editor-facing consumers.
//!
//! The graph mirrors a segment's nodes: a parent map and an ordered
//! children map are rebuilt from each node's `parent_id` on load. Removal
//! detaches but never cascade-deletes children, and no cycle detection is
//! performed here (the engine's navigation passes carry their own guard).

use std::collections::HashMap;

use faden_core::{NodeId, SegmentAsset};

/// Node hierarchy plus an independent selection set.
#[derive(Debug, Default)]
pub struct SceneGraph {
    parents: HashMap<NodeId, Option<NodeId>>,
    children: HashMap<NodeId, Vec<NodeId>>,
    selection: Vec<NodeId>,
}

impl SceneGraph {
    /// Create an empty scene graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the hierarchy from a segment, discarding prior state.
    pub fn rebuild(&mut self, segment: &SegmentAsset) {
        self.clear();
        for node in segment.nodes() {
            self.add_node(node.id, node.parent_id);
        }
    }

    /// Discard all nodes and the selection.
    pub fn clear(&mut self) {
        self.parents.clear();
        self.children.clear();
        self.selection.clear();
    }

    /// Add a node under an optional parent.
    pub fn add_node(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.parents.insert(id, parent);
        if let Some(parent_id) = parent {
            self.children.entry(parent_id).or_default().push(id);
        }
    }

    /// Remove a node. Its children are detached (reparented to nothing),
    /// not removed.
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(Some(parent)) = self.parents.remove(&id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|n| *n != id);
            }
        }
        for child in self.children.remove(&id).unwrap_or_default() {
            self.parents.insert(child, None);
        }
        self.selection.retain(|n| *n != id);
    }

    /// Move a node under a new parent (or to the top level).
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if !self.parents.contains_key(&id) {
            return;
        }
        if let Some(Some(old_parent)) = self.parents.get(&id).copied() {
            if let Some(siblings) = self.children.get_mut(&old_parent) {
                siblings.retain(|n| *n != id);
            }
        }
        self.parents.insert(id, parent);
        if let Some(parent_id) = parent {
            self.children.entry(parent_id).or_default().push(id);
        }
    }

    /// The parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied().flatten()
    }

    /// The ordered children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the graph contains a node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.parents.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select exactly one node, replacing the current selection.
    pub fn select(&mut self, id: NodeId) {
        self.selection.clear();
        self.selection.push(id);
    }

    /// Add a node to the selection, keeping the existing one.
    pub fn select_additive(&mut self, id: NodeId) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    /// Remove a node from the selection.
    pub fn deselect(&mut self, id: NodeId) {
        self.selection.retain(|n| *n != id);
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// The current selection, in selection order.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Whether a node is selected.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }
}
