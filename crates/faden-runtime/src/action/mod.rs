//! The pluggable action-execution pipeline.
//!
//! Built-in actions are variants of [`faden_core::ActionBody`] and run
//! directly against the store and bus; plugin actions dispatch through the
//! [`ActionRegistry`]. The executor sequences action groups with the
//! delay/detach/ignore-error policy each entry declares.

mod executor;

pub use executor::{ActionExecutor, Generation};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use faden_core::{NodeId, Params, SegmentId};

use crate::bus::EventBus;
use crate::engine::EngineMailbox;
use crate::error::RuntimeResult;
use crate::store::SharedStore;

/// Where an action group is running, for diagnostics and handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionScope {
    /// The segment the group belongs to.
    pub segment: SegmentId,
    /// The node whose action list is running.
    pub node: NodeId,
}

/// Everything a running action can reach. Cloneable so detached actions
/// can carry it into a spawned task.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// The RPG state store.
    pub store: SharedStore,
    /// The event bus for presentation-facing effects.
    pub bus: Arc<EventBus>,
    /// Mailbox for engine re-entry requests (`Advance`, `JumpTo`). Actions
    /// never call the engine directly.
    pub requests: EngineMailbox,
    /// Where the group is running.
    pub scope: ActionScope,
    /// Story-generation snapshot; stale work checks it before touching
    /// state.
    pub generation: Generation,
}

/// A plugin-defined action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Check params before execution. Returning `false` skips the action
    /// with a warning instead of failing the group.
    fn validate(&self, _params: &Params) -> bool {
        true
    }

    /// Run the action.
    async fn execute(&self, params: &Params, ctx: &ActionContext) -> RuntimeResult<()>;
}

/// Registry of custom action handlers, keyed by their stable kind string,
/// built once and injected into the engine.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a custom kind, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Look up a handler.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(kind)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
