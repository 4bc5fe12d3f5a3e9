//! Story document model for Fadenspiel.
//!
//! This crate defines the data the runtime interprets: a [`StoryAsset`]
//! holding ordered [`SegmentAsset`] graphs of typed [`NarrativeNode`]s joined
//! by guarded [`Edge`]s, plus the attribute/item/clue definitions the
//! variable store is seeded from. It is independent of the engine — you can
//! construct a story programmatically (every type carries builder-style
//! constructors) or deserialize one from JSON.

/// Action definitions and custom-handler params.
pub mod action;
/// Condition trees, operands, and guards.
pub mod condition;
/// Guarded edges between nodes.
pub mod edge;
/// Error types used throughout the crate.
pub mod error;
/// Uuid-backed typed identifiers.
pub mod ids;
/// Narrative node types and their events.
pub mod node;
/// The story document and its RPG definitions.
pub mod story;
/// Dynamic values and comparison semantics.
pub mod value;

pub use action::{ActionBody, ActionDef, AttributeOp, Params};
pub use condition::{ConditionKind, ConditionNode, Guard, Operand};
pub use edge::Edge;
pub use error::{CoreError, CoreResult};
pub use ids::{
    AttributeId, CharacterId, ClueId, EdgeId, ItemId, NodeId, SegmentId, ShopId, StoryId,
};
pub use node::{
    BranchCase, DialogueChoice, EventTrigger, Hotspot, NarrativeNode, NodeBody, NodeEvent,
    NodeKind, VoteOption,
};
pub use story::{
    AttributeDefinition, AttributeKind, CharacterAsset, Clue, Item, SegmentAsset, Shop,
    StoryAsset, StoryMeta,
};
pub use value::{CompareOp, Value};
