//! The built-in editor commands.
//!
//! Each command stashes what its `apply` destroyed or replaced, so
//! `revert` restores the document exactly. Constructors take the target
//! ids; lookups happen at apply time against the live document.

use chrono::Utc;
use faden_core::{
    AttributeDefinition, AttributeId, Edge, EdgeId, NarrativeNode, NodeId, SegmentAsset,
    SegmentId, StoryAsset, StoryMeta,
};

use crate::command::Command;
use crate::error::{EditError, EditResult};

fn segment_mut(story: &mut StoryAsset, id: SegmentId) -> EditResult<&mut SegmentAsset> {
    story.segment_mut(id).ok_or(EditError::SegmentNotFound(id))
}

/// Insert a node into a segment.
#[derive(Debug)]
pub struct AddNode {
    segment: SegmentId,
    node: NarrativeNode,
}

impl AddNode {
    /// Add `node` to `segment`.
    pub fn new(segment: SegmentId, node: NarrativeNode) -> Self {
        Self { segment, node }
    }

    /// The id the node will have once applied.
    pub fn node_id(&self) -> NodeId {
        self.node.id
    }
}

impl Command for AddNode {
    fn label(&self) -> &str {
        "Add node"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        segment_mut(story, self.segment)?.insert_node(self.node.clone())?;
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        segment_mut(story, self.segment)?.remove_node(self.node.id)?;
        Ok(())
    }
}

/// Remove a node and every edge touching it.
#[derive(Debug)]
pub struct RemoveNode {
    segment: SegmentId,
    node: NodeId,
    was_root: bool,
    removed: Option<(NarrativeNode, Vec<(usize, Edge)>)>,
}

impl RemoveNode {
    /// Remove `node` from `segment`.
    pub fn new(segment: SegmentId, node: NodeId) -> Self {
        Self {
            segment,
            node,
            was_root: false,
            removed: None,
        }
    }
}

impl Command for RemoveNode {
    fn label(&self) -> &str {
        "Remove node"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let segment = segment_mut(story, self.segment)?;
        self.was_root = segment.root == Some(self.node);
        self.removed = Some(segment.remove_node(self.node)?);
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let (node, edges) = self.removed.take().ok_or(EditError::MissingRevertState)?;
        let segment = segment_mut(story, self.segment)?;
        if self.was_root {
            segment.insert_root(node)?;
        } else {
            segment.insert_node(node)?;
        }
        // Indices come out ascending, so inserting in order reconstructs
        // the original edge positions.
        for (index, edge) in edges {
            segment.insert_edge_at(index, edge);
        }
        Ok(())
    }
}

/// Replace a node's content, keeping its id and edges.
#[derive(Debug)]
pub struct UpdateNode {
    segment: SegmentId,
    node: NodeId,
    replacement: NarrativeNode,
    previous: Option<NarrativeNode>,
}

impl UpdateNode {
    /// Replace `node` with `replacement`. The replacement takes over the
    /// existing node's id.
    pub fn new(segment: SegmentId, node: NodeId, mut replacement: NarrativeNode) -> Self {
        replacement.id = node;
        Self {
            segment,
            node,
            replacement,
            previous: None,
        }
    }
}

impl Command for UpdateNode {
    fn label(&self) -> &str {
        "Edit node"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let segment = segment_mut(story, self.segment)?;
        let slot = segment
            .node_mut(self.node)
            .ok_or(EditError::NodeNotFound(self.node))?;
        self.previous = Some(std::mem::replace(slot, self.replacement.clone()));
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let previous = self.previous.take().ok_or(EditError::MissingRevertState)?;
        let segment = segment_mut(story, self.segment)?;
        let slot = segment
            .node_mut(self.node)
            .ok_or(EditError::NodeNotFound(self.node))?;
        *slot = previous;
        Ok(())
    }
}

/// Connect two nodes.
#[derive(Debug)]
pub struct AddEdge {
    segment: SegmentId,
    edge: Edge,
}

impl AddEdge {
    /// Add `edge` to `segment`. Both endpoints must already exist.
    pub fn new(segment: SegmentId, edge: Edge) -> Self {
        Self { segment, edge }
    }

    /// The id the edge will have once applied.
    pub fn edge_id(&self) -> EdgeId {
        self.edge.id
    }
}

impl Command for AddEdge {
    fn label(&self) -> &str {
        "Add edge"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let segment = segment_mut(story, self.segment)?;
        for endpoint in [self.edge.source, self.edge.target] {
            if !segment.contains_node(endpoint) {
                return Err(EditError::NodeNotFound(endpoint));
            }
        }
        segment.add_edge(self.edge.clone());
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        segment_mut(story, self.segment)?.remove_edge(self.edge.id)?;
        Ok(())
    }
}

/// Disconnect two nodes. Undo restores the edge at its old position, since
/// edge order decides which edge `advance` follows first.
#[derive(Debug)]
pub struct RemoveEdge {
    segment: SegmentId,
    edge: EdgeId,
    removed: Option<(usize, Edge)>,
}

impl RemoveEdge {
    /// Remove `edge` from `segment`.
    pub fn new(segment: SegmentId, edge: EdgeId) -> Self {
        Self {
            segment,
            edge,
            removed: None,
        }
    }
}

impl Command for RemoveEdge {
    fn label(&self) -> &str {
        "Remove edge"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        self.removed = Some(segment_mut(story, self.segment)?.remove_edge(self.edge)?);
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let (index, edge) = self.removed.take().ok_or(EditError::MissingRevertState)?;
        segment_mut(story, self.segment)?.insert_edge_at(index, edge);
        Ok(())
    }
}

/// Rename a segment.
#[derive(Debug)]
pub struct RenameSegment {
    segment: SegmentId,
    name: String,
    previous: Option<String>,
}

impl RenameSegment {
    /// Rename `segment` to `name`.
    pub fn new(segment: SegmentId, name: impl Into<String>) -> Self {
        Self {
            segment,
            name: name.into(),
            previous: None,
        }
    }
}

impl Command for RenameSegment {
    fn label(&self) -> &str {
        "Rename segment"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let segment = segment_mut(story, self.segment)?;
        self.previous = Some(std::mem::replace(&mut segment.name, self.name.clone()));
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let previous = self.previous.take().ok_or(EditError::MissingRevertState)?;
        segment_mut(story, self.segment)?.name = previous;
        Ok(())
    }
}

/// Replace the story metadata, stamping `updated_at`.
#[derive(Debug)]
pub struct UpdateStoryMeta {
    meta: StoryMeta,
    previous: Option<StoryMeta>,
}

impl UpdateStoryMeta {
    /// Replace the story's metadata with `meta`.
    pub fn new(meta: StoryMeta) -> Self {
        Self {
            meta,
            previous: None,
        }
    }
}

impl Command for UpdateStoryMeta {
    fn label(&self) -> &str {
        "Edit story details"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        self.previous = Some(std::mem::replace(&mut story.meta, self.meta.clone()));
        story.meta.updated_at = Utc::now();
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        story.meta = self.previous.take().ok_or(EditError::MissingRevertState)?;
        Ok(())
    }
}

/// Declare a new attribute.
#[derive(Debug)]
pub struct AddAttribute {
    definition: AttributeDefinition,
}

impl AddAttribute {
    /// Declare `definition` on the story.
    pub fn new(definition: AttributeDefinition) -> Self {
        Self { definition }
    }
}

impl Command for AddAttribute {
    fn label(&self) -> &str {
        "Add attribute"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        story.attributes.push(self.definition.clone());
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let id = self.definition.id;
        let pos = story
            .attributes
            .iter()
            .position(|a| a.id == id)
            .ok_or(EditError::AttributeNotFound(id))?;
        story.attributes.remove(pos);
        Ok(())
    }
}

/// Remove an attribute declaration. Undo restores it at its old position.
#[derive(Debug)]
pub struct RemoveAttribute {
    attribute: AttributeId,
    removed: Option<(usize, AttributeDefinition)>,
}

impl RemoveAttribute {
    /// Remove the declaration of `attribute`.
    pub fn new(attribute: AttributeId) -> Self {
        Self {
            attribute,
            removed: None,
        }
    }
}

impl Command for RemoveAttribute {
    fn label(&self) -> &str {
        "Remove attribute"
    }

    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let pos = story
            .attributes
            .iter()
            .position(|a| a.id == self.attribute)
            .ok_or(EditError::AttributeNotFound(self.attribute))?;
        self.removed = Some((pos, story.attributes.remove(pos)));
        Ok(())
    }

    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()> {
        let (pos, definition) = self.removed.take().ok_or(EditError::MissingRevertState)?;
        let pos = pos.min(story.attributes.len());
        story.attributes.insert(pos, definition);
        Ok(())
    }
}
