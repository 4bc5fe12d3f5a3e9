//! The story document: metadata, segments, and RPG definitions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::{CoreError, CoreResult};
use crate::ids::{
    AttributeId, CharacterId, ClueId, EdgeId, ItemId, NodeId, SegmentId, ShopId, StoryId,
};
use crate::node::NarrativeNode;
use crate::value::Value;

/// Metadata about the story itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMeta {
    /// Story title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Author names.
    pub authors: Vec<String>,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// When the document was last touched.
    pub updated_at: DateTime<Utc>,
}

impl StoryMeta {
    /// Create metadata with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            description: String::new(),
            authors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// A number, optionally range-clamped.
    Number,
    /// A boolean flag.
    Boolean,
    /// Free text.
    Text,
}

/// A typed, optionally range-clamped state variable declared by the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Unique id.
    pub id: AttributeId,
    /// Key used by legacy expressions and flag checks.
    pub key: String,
    /// Declared type.
    pub kind: AttributeKind,
    /// Initial value.
    pub default: Value,
    /// Lower bound for numeric attributes.
    pub min: Option<f64>,
    /// Upper bound for numeric attributes.
    pub max: Option<f64>,
}

impl AttributeDefinition {
    /// Declare a numeric attribute.
    pub fn number(key: impl Into<String>, default: f64) -> Self {
        Self {
            id: AttributeId::new(),
            key: key.into(),
            kind: AttributeKind::Number,
            default: Value::Number(default),
            min: None,
            max: None,
        }
    }

    /// Declare a boolean attribute.
    pub fn boolean(key: impl Into<String>, default: bool) -> Self {
        Self {
            id: AttributeId::new(),
            key: key.into(),
            kind: AttributeKind::Boolean,
            default: Value::Bool(default),
            min: None,
            max: None,
        }
    }

    /// Declare a text attribute.
    pub fn text(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            id: AttributeId::new(),
            key: key.into(),
            kind: AttributeKind::Text,
            default: Value::String(default.into()),
            min: None,
            max: None,
        }
    }

    /// Set the numeric range (builder style).
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Coerce a value to this attribute's declared type, clamping numerics
    /// into `[min, max]`. An unparseable numeric input coerces to 0.
    pub fn coerce(&self, value: Value) -> Value {
        match self.kind {
            AttributeKind::Number => {
                let mut n = value.as_number().unwrap_or(0.0);
                if let Some(min) = self.min {
                    n = n.max(min);
                }
                if let Some(max) = self.max {
                    n = n.min(max);
                }
                Value::Number(n)
            }
            AttributeKind::Boolean => Value::Bool(value.is_truthy()),
            AttributeKind::Text => Value::String(value.to_string()),
        }
    }
}

/// An inventory item declared by the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Whether more than one can be held at once.
    pub stackable: bool,
}

impl Item {
    /// Declare an item.
    pub fn new(name: impl Into<String>, stackable: bool) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            stackable,
        }
    }
}

/// A revealable fact with per-character ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clue {
    /// Unique id.
    pub id: ClueId,
    /// Display name.
    pub name: String,
    /// Whether the clue starts revealed.
    pub revealed: bool,
    /// Characters who start owning it. Ownership implies revealed.
    pub owners: Vec<CharacterId>,
}

impl Clue {
    /// Declare a hidden, unowned clue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClueId::new(),
            name: name.into(),
            revealed: false,
            owners: Vec::new(),
        }
    }
}

/// A shop the presentation layer can open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    /// Unique id.
    pub id: ShopId,
    /// Display name.
    pub name: String,
}

/// A character appearing in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAsset {
    /// Unique id.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
}

impl CharacterAsset {
    /// Declare a character.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
        }
    }
}

/// A chapter-sized subgraph: nodes, edges, and one root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAsset {
    /// Unique id.
    pub id: SegmentId,
    /// Display name.
    pub name: String,
    /// Entry node. When absent, the first inserted node is the entry.
    pub root: Option<NodeId>,
    nodes: HashMap<NodeId, NarrativeNode>,
    node_order: Vec<NodeId>,
    edges: Vec<Edge>,
}

impl SegmentAsset {
    /// Create an empty segment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SegmentId::new(),
            name: name.into(),
            root: None,
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Insert a node. Node ids are unique per segment.
    pub fn insert_node(&mut self, node: NarrativeNode) -> CoreResult<NodeId> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(CoreError::DuplicateNode(id));
        }
        self.node_order.push(id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Insert a node and make it the segment root.
    pub fn insert_root(&mut self, node: NarrativeNode) -> CoreResult<NodeId> {
        let id = self.insert_node(node)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Remove a node along with every edge touching it. Returns the node
    /// and the removed edges with their original positions, so the caller
    /// can undo the removal without disturbing edge order.
    pub fn remove_node(&mut self, id: NodeId) -> CoreResult<(NarrativeNode, Vec<(usize, Edge)>)> {
        let node = self.nodes.remove(&id).ok_or(CoreError::NodeNotFound(id))?;
        self.node_order.retain(|n| *n != id);
        if self.root == Some(id) {
            self.root = None;
        }
        let mut removed = Vec::new();
        let mut index = 0;
        self.edges.retain(|e| {
            let touches = e.source == id || e.target == id;
            if touches {
                removed.push((index, e.clone()));
            }
            index += 1;
            !touches
        });
        Ok((node, removed))
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&NarrativeNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NarrativeNode> {
        self.nodes.get_mut(&id)
    }

    /// Whether the segment contains a node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NarrativeNode> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// The number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The entry node: the declared root, falling back to the first
    /// inserted node.
    pub fn entry_node(&self) -> Option<NodeId> {
        self.root
            .filter(|id| self.nodes.contains_key(id))
            .or_else(|| self.node_order.first().copied())
    }

    /// Add an edge. Endpoints need not exist yet; `validate` checks them.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = edge.id;
        self.edges.push(edge);
        id
    }

    /// Remove an edge by id, returning its position and the edge so the
    /// caller can undo the removal in place.
    pub fn remove_edge(&mut self, id: EdgeId) -> CoreResult<(usize, Edge)> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or(CoreError::EdgeNotFound(id))?;
        Ok((pos, self.edges.remove(pos)))
    }

    /// Insert an edge at a position. Edge order is significant: `advance`
    /// follows the first passing edge.
    pub fn insert_edge_at(&mut self, index: usize, edge: Edge) {
        let index = index.min(self.edges.len());
        self.edges.insert(index, edge);
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All edges leaving a node, in insertion order.
    pub fn edges_from(&self, source: NodeId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == source).collect()
    }

    /// Check that every edge's endpoints exist in the segment.
    pub fn validate(&self) -> CoreResult<()> {
        for edge in &self.edges {
            for endpoint in [edge.source, edge.target] {
                if !self.nodes.contains_key(&endpoint) {
                    return Err(CoreError::DanglingEdge {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
        }
        Ok(())
    }
}

/// An immutable story snapshot: metadata, ordered segments, and the RPG
/// definitions the runtime seeds its state from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryAsset {
    /// Unique id.
    pub id: StoryId,
    /// Story metadata.
    pub meta: StoryMeta,
    /// The segment a fresh engine starts in.
    pub active_segment: Option<SegmentId>,
    /// Ordered segments.
    pub segments: Vec<SegmentAsset>,
    /// Characters.
    pub characters: Vec<CharacterAsset>,
    /// Attribute definitions.
    pub attributes: Vec<AttributeDefinition>,
    /// Item definitions.
    pub items: Vec<Item>,
    /// Clue definitions.
    pub clues: Vec<Clue>,
    /// Shop definitions.
    pub shops: Vec<Shop>,
}

impl StoryAsset {
    /// Create an empty story.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: StoryId::new(),
            meta: StoryMeta::new(title),
            active_segment: None,
            segments: Vec::new(),
            characters: Vec::new(),
            attributes: Vec::new(),
            items: Vec::new(),
            clues: Vec::new(),
            shops: Vec::new(),
        }
    }

    /// Add a segment (builder style). The first segment becomes active.
    pub fn with_segment(mut self, segment: SegmentAsset) -> Self {
        if self.active_segment.is_none() {
            self.active_segment = Some(segment.id);
        }
        self.segments.push(segment);
        self
    }

    /// Add an attribute definition (builder style).
    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add an item definition (builder style).
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Add a clue definition (builder style).
    pub fn with_clue(mut self, clue: Clue) -> Self {
        self.clues.push(clue);
        self
    }

    /// Add a character (builder style).
    pub fn with_character(mut self, character: CharacterAsset) -> Self {
        self.characters.push(character);
        self
    }

    /// Get a segment by id.
    pub fn segment(&self, id: SegmentId) -> Option<&SegmentAsset> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Get a mutable segment by id.
    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut SegmentAsset> {
        self.segments.iter_mut().find(|s| s.id == id)
    }

    /// Look up an attribute definition by id.
    pub fn attribute(&self, id: AttributeId) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// Look up an attribute definition by key.
    pub fn attribute_by_key(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.key == key)
    }

    /// Look up an item definition.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Look up a clue definition.
    pub fn clue(&self, id: ClueId) -> Option<&Clue> {
        self.clues.iter().find(|c| c.id == id)
    }
}
