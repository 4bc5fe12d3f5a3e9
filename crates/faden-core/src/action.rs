//! Action definitions attached to nodes and node events.
//!
//! Every built-in action is a variant of [`ActionBody`]; editor plugins hook
//! in through [`ActionBody::Custom`], whose handler is resolved from the
//! runtime's action registry by its `kind` string.

use serde::{Deserialize, Serialize};

use crate::ids::{AttributeId, CharacterId, ClueId, ItemId, NodeId, ShopId};
use crate::value::Value;

/// Parameters for custom action and condition handlers: a JSON object with
/// typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(pub serde_json::Map<String, serde_json::Value>);

impl Params {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a raw parameter value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Get a string parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Get a numeric parameter.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    /// Get a boolean parameter.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }
}

/// How [`ActionBody::ModifyAttribute`] combines the current value with its
/// operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOp {
    /// Add the operand to the current value (missing value counts as 0).
    Add,
    /// Subtract the operand from the current value.
    Sub,
    /// Replace the current value with the operand.
    Set,
}

/// One executable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionBody {
    /// Set an attribute to a value (coerced and clamped by its definition).
    SetAttribute {
        /// The attribute to write.
        attribute: AttributeId,
        /// The new value.
        value: Value,
    },
    /// Combine the current attribute value with an operand.
    ModifyAttribute {
        /// The attribute to modify.
        attribute: AttributeId,
        /// The combining operator.
        op: AttributeOp,
        /// The numeric operand.
        value: f64,
    },
    /// Add items to the inventory. Non-stackable items cap at one.
    AddItem {
        /// The item to add.
        item: ItemId,
        /// How many to add.
        count: u32,
    },
    /// Remove items from the inventory, flooring at zero.
    RemoveItem {
        /// The item to remove.
        item: ItemId,
        /// How many to remove.
        count: u32,
    },
    /// Reveal a clue and optionally grant ownership to a character.
    AddClue {
        /// The clue to reveal.
        clue: ClueId,
        /// The character who obtains it, if any.
        character: Option<CharacterId>,
    },
    /// Remove a character's ownership of a clue. Never un-reveals.
    RemoveClue {
        /// The clue to remove ownership of.
        clue: ClueId,
        /// The character losing it, if any.
        character: Option<CharacterId>,
    },
    /// Transfer a clue from one character to another.
    ShareClue {
        /// The clue being shared.
        clue: ClueId,
        /// The character who must already own it.
        from: CharacterId,
        /// The character receiving it.
        to: CharacterId,
    },
    /// Ask the presentation layer to open a shop. Pure event, no state.
    OpenShop {
        /// The shop to open.
        shop: ShopId,
    },
    /// Ask the presentation layer to open a crafting screen.
    OpenCrafting {
        /// Optional crafting-station identifier.
        station: Option<String>,
    },
    /// Show a transient message to the player.
    Toast {
        /// The message text.
        message: String,
        /// How long to show it, if the UI honors durations.
        duration_ms: Option<u64>,
    },
    /// Play a sound effect.
    PlaySfx {
        /// The sound to play.
        sound: String,
        /// Playback volume in `[0, 1]`.
        volume: f32,
    },
    /// Shake the screen.
    Shake {
        /// Shake intensity.
        intensity: f32,
        /// Shake duration.
        duration_ms: u64,
    },
    /// Suspend the group for a duration. Pure delay.
    Wait {
        /// How long to wait.
        duration_ms: u64,
    },
    /// Request a jump to a node. Routed through the engine mailbox rather
    /// than a direct call, so the executor never depends on the engine.
    JumpTo {
        /// The node to jump to.
        target: NodeId,
    },
    /// Request an `advance()` through the engine mailbox.
    Advance,
    /// A plugin-defined action resolved from the action registry.
    Custom {
        /// Registry key of the handler.
        kind: String,
        /// Handler parameters.
        params: Params,
    },
}

/// An action entry in a node's action list: a body plus execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    /// What to execute.
    pub body: ActionBody,
    /// Delay awaited before the action runs.
    pub delay_ms: Option<u64>,
    /// Fire-and-forget: the executor does not await this action before
    /// moving on to the next one.
    pub detached: bool,
    /// Swallow (and log) a failure instead of propagating it.
    pub ignore_error: bool,
}

impl ActionDef {
    /// Create an action with default policy (sequential, errors propagate).
    pub fn new(body: ActionBody) -> Self {
        Self {
            body,
            delay_ms: None,
            detached: false,
            ignore_error: false,
        }
    }

    /// Await a delay before running.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Run fire-and-forget.
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    /// Log failures instead of propagating them.
    pub fn ignoring_errors(mut self) -> Self {
        self.ignore_error = true;
        self
    }
}
