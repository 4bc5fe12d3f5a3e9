//! Narrative nodes: the typed units a segment graph is built from.

use serde::{Deserialize, Serialize};

use crate::action::ActionDef;
use crate::condition::{ConditionNode, Guard};
use crate::ids::{CharacterId, NodeId, SegmentId};

/// The kind of a narrative node, used for dispatch and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Segment entry point. Auto-advances, never user-visible.
    Start,
    /// A scene with a background and clickable hotspots.
    Location,
    /// A line of dialogue with optional player choices.
    Dialogue,
    /// A control node that routes by evaluating conditions in order.
    Branch,
    /// A control node that executes an action list.
    Action,
    /// A transition to another segment.
    Jump,
    /// A timed vote between options.
    Vote,
}

/// What fires a node event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTrigger {
    /// The node became current.
    OnEnter,
    /// The node stopped being current.
    OnExit,
    /// The player clicked a hotspot or other sub-target.
    OnClick,
    /// A host-defined trigger.
    Custom(String),
}

/// A standardized event-condition-action trigger carried by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    /// Handle id that outgoing edges reference via `source_handle`.
    pub id: String,
    /// What fires this event.
    pub trigger: EventTrigger,
    /// Restricts the event to one sub-target (e.g. a hotspot id).
    pub target: Option<String>,
    /// Guard evaluated before the event's edges are followed.
    pub guard: Option<Guard>,
    /// Diagnostic label, never interpreted.
    pub label: String,
}

impl NodeEvent {
    /// Create an event with a fresh handle id and no target or guard.
    pub fn new(trigger: EventTrigger, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            trigger,
            target: None,
            guard: None,
            label: label.into(),
        }
    }

    /// Restrict the event to a sub-target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Guard the event.
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// A clickable region over a location's background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Id referenced by `on_click` event targets.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Left edge, normalized to `[0, 1]`.
    pub x: f32,
    /// Top edge, normalized to `[0, 1]`.
    pub y: f32,
    /// Width, normalized.
    pub width: f32,
    /// Height, normalized.
    pub height: f32,
}

/// One selectable dialogue choice. Its id doubles as the handle id that the
/// outgoing edge for this choice carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueChoice {
    /// Handle id.
    pub id: String,
    /// Text shown to the player.
    pub text: String,
}

impl DialogueChoice {
    /// Create a choice.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One entry in a branch node's ordered condition list. Its id doubles as
/// the handle id on the outgoing edge it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCase {
    /// Handle id.
    pub id: String,
    /// The condition that selects this case.
    pub condition: ConditionNode,
}

impl BranchCase {
    /// Create a case.
    pub fn new(id: impl Into<String>, condition: ConditionNode) -> Self {
        Self {
            id: id.into(),
            condition,
        }
    }
}

/// One option in a vote node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOption {
    /// Handle id.
    pub id: String,
    /// Text shown to voters.
    pub text: String,
}

/// Type-specific node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeBody {
    /// Segment entry point.
    Start,
    /// A scene.
    Location {
        /// Background asset reference.
        background: String,
        /// Clickable regions.
        hotspots: Vec<Hotspot>,
    },
    /// A line of dialogue.
    Dialogue {
        /// Speaking character, if any.
        speaker: Option<CharacterId>,
        /// The spoken text.
        text: String,
        /// Player choices. Empty means the dialogue advances unchosen.
        choices: Vec<DialogueChoice>,
    },
    /// A condition router.
    Branch {
        /// Ordered cases; the first whose condition passes wins. An edge
        /// matching no case is the implicit else.
        cases: Vec<BranchCase>,
    },
    /// An action list executed on entry.
    Action {
        /// Actions, run in order.
        actions: Vec<ActionDef>,
    },
    /// A transition to another segment.
    Jump {
        /// The target segment.
        segment: SegmentId,
    },
    /// A timed vote.
    Vote {
        /// The options voted between.
        options: Vec<VoteOption>,
        /// Voting window.
        duration_ms: u64,
    },
}

impl NodeBody {
    /// The kind discriminant for this body.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Start => NodeKind::Start,
            NodeBody::Location { .. } => NodeKind::Location,
            NodeBody::Dialogue { .. } => NodeKind::Dialogue,
            NodeBody::Branch { .. } => NodeKind::Branch,
            NodeBody::Action { .. } => NodeKind::Action,
            NodeBody::Jump { .. } => NodeKind::Jump,
            NodeBody::Vote { .. } => NodeKind::Vote,
        }
    }
}

/// A typed narrative node within a segment graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeNode {
    /// Unique id within the segment.
    pub id: NodeId,
    /// Editor-facing title.
    pub title: String,
    /// Parent node on the editor canvas, if nested.
    pub parent_id: Option<NodeId>,
    /// Standardized event-condition-action triggers.
    pub events: Vec<NodeEvent>,
    /// Type-specific payload.
    pub body: NodeBody,
}

impl NarrativeNode {
    /// Create a node with a fresh id and no events.
    pub fn new(title: impl Into<String>, body: NodeBody) -> Self {
        Self {
            id: NodeId::new(),
            title: title.into(),
            parent_id: None,
            events: Vec::new(),
            body,
        }
    }

    /// A start node.
    pub fn start() -> Self {
        Self::new("Start", NodeBody::Start)
    }

    /// A location node with no hotspots.
    pub fn location(title: impl Into<String>, background: impl Into<String>) -> Self {
        Self::new(
            title,
            NodeBody::Location {
                background: background.into(),
                hotspots: Vec::new(),
            },
        )
    }

    /// A dialogue node with no choices.
    pub fn dialogue(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            title,
            NodeBody::Dialogue {
                speaker: None,
                text: text.into(),
                choices: Vec::new(),
            },
        )
    }

    /// A branch node.
    pub fn branch(title: impl Into<String>, cases: Vec<BranchCase>) -> Self {
        Self::new(title, NodeBody::Branch { cases })
    }

    /// An action node.
    pub fn action(title: impl Into<String>, actions: Vec<ActionDef>) -> Self {
        Self::new(title, NodeBody::Action { actions })
    }

    /// A jump node.
    pub fn jump(title: impl Into<String>, segment: SegmentId) -> Self {
        Self::new(title, NodeBody::Jump { segment })
    }

    /// The kind discriminant for this node.
    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    /// Attach an event (builder style).
    pub fn with_event(mut self, event: NodeEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Attach a dialogue choice. No-op on non-dialogue nodes.
    pub fn with_choice(mut self, choice: DialogueChoice) -> Self {
        if let NodeBody::Dialogue { choices, .. } = &mut self.body {
            choices.push(choice);
        }
        self
    }

    /// Set the canvas parent (builder style).
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// All events matching a trigger and, when given, a sub-target.
    pub fn events_for(&self, trigger: &EventTrigger, target: Option<&str>) -> Vec<&NodeEvent> {
        self.events
            .iter()
            .filter(|e| &e.trigger == trigger)
            .filter(|e| match target {
                Some(t) => e.target.as_deref() == Some(t),
                None => true,
            })
            .collect()
    }
}
