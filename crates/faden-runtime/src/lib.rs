//! Fadenspiel runtime: interprets story documents from `faden-core`.
//!
//! The crate is organized around a few cooperating pieces:
//!
//! - [`EventBus`] — synchronous pub/sub between the engine, the variable
//!   store, and the host's presentation layer.
//! - [`VariableStore`] — attribute, inventory, and clue state, publishing
//!   change events on the bus.
//! - [`ActionExecutor`] and [`ActionRegistry`] — run node action lists,
//!   with per-entry delay, detach, and error policies.
//! - [`ConditionEngine`] and [`ConditionRegistry`] — evaluate guards
//!   against the store, including legacy string expressions.
//! - [`SceneGraph`] — node hierarchy and selection for the active segment.
//! - [`NarrativeEngine`] — the state machine that ties it all together.
//!
//! Engines are wired with [`EngineBuilder`]; there are no process-wide
//! singletons, so tests and multiplayer sessions can run engines side by
//! side.

pub mod action;
pub mod bus;
pub mod condition;
pub mod engine;
pub mod error;
pub mod scene;
pub mod store;

pub use action::{
    ActionContext, ActionExecutor, ActionHandler, ActionRegistry, ActionScope, Generation,
};
pub use bus::{Event, EventBus, Subscriber, SubscriberId, Topic};
pub use condition::{ConditionEngine, ConditionHandler, ConditionRegistry, ValueHook};
pub use engine::{EngineBuilder, EngineMailbox, EngineRequest, NarrativeEngine};
pub use error::{RuntimeError, RuntimeResult};
pub use scene::SceneGraph;
pub use store::{SharedStore, VariableStore};
