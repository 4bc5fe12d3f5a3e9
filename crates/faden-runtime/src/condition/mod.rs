//! Guard evaluation: one evaluator for structured condition trees and
//! legacy string expressions.
//!
//! Logic kinds are evaluated structurally; leaf kinds resolve against the
//! variable store; `Custom` kinds dispatch through the [`ConditionRegistry`]
//! with the unknown-kind fallback (`warn` + `false`).

mod legacy;

pub use legacy::parse_legacy;

use std::collections::HashMap;
use std::sync::Arc;

use faden_core::{ConditionKind, ConditionNode, Guard, Operand, Params, Value};
use tracing::warn;

use crate::error::RuntimeResult;
use crate::store::VariableStore;

/// Attribute-key sigil recognized in string literal operands.
const KEY_SIGIL: char = '$';

/// A plugin-defined condition.
pub trait ConditionHandler: Send + Sync {
    /// Evaluate the condition. A returned `Err` is logged and treated as
    /// `false`; guards never abort narrative flow.
    fn evaluate(&self, params: &Params, store: &VariableStore) -> RuntimeResult<bool>;
}

/// Registry of custom condition handlers, keyed by their stable kind
/// string, built once and injected into the engine.
#[derive(Default)]
pub struct ConditionRegistry {
    handlers: HashMap<String, Arc<dyn ConditionHandler>>,
}

impl ConditionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a custom kind, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn ConditionHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Look up a handler.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ConditionHandler>> {
        self.handlers.get(kind)
    }
}

impl std::fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Hook offered an unresolved literal operand before it falls back to
/// itself. Lets hosts resolve app-specific value references.
pub type ValueHook = Arc<dyn Fn(&Value, &VariableStore) -> Option<Value> + Send + Sync>;

/// Evaluates guards against the variable store.
pub struct ConditionEngine {
    registry: ConditionRegistry,
    value_hook: Option<ValueHook>,
}

impl ConditionEngine {
    /// Create an engine over a registry, with an optional operand hook.
    pub fn new(registry: ConditionRegistry, value_hook: Option<ValueHook>) -> Self {
        Self {
            registry,
            value_hook,
        }
    }

    /// Evaluate a guard of either variant.
    pub fn evaluate_guard(&self, guard: &Guard, store: &VariableStore) -> bool {
        match guard {
            Guard::Tree(node) => self.evaluate(node, store),
            Guard::Legacy(expr) => self.evaluate(&parse_legacy(expr), store),
        }
    }

    /// Evaluate a condition tree. The node's `negate` flips the result
    /// after evaluation.
    pub fn evaluate(&self, node: &ConditionNode, store: &VariableStore) -> bool {
        let result = match &node.kind {
            ConditionKind::AllOf { children } => {
                children.iter().all(|c| self.evaluate(c, store))
            }
            ConditionKind::AnyOf { children } => {
                children.iter().any(|c| self.evaluate(c, store))
            }
            ConditionKind::Not { child } => !self.evaluate(child, store),
            ConditionKind::Compare { left, op, right } => {
                let left = self.resolve(left, store);
                let right = self.resolve(right, store);
                op.apply(&left, &right)
            }
            ConditionKind::HasItem { item } => store.item_count(*item) > 0,
            ConditionKind::HasClue { clue, character } => store.has_clue(*clue, *character),
            ConditionKind::CheckFlag { key, expected } => store.flag(key) == *expected,
            ConditionKind::Custom { kind, params } => match self.registry.get(kind) {
                Some(handler) => handler.evaluate(params, store).unwrap_or_else(|error| {
                    warn!(kind, %error, "condition handler failed");
                    false
                }),
                None => {
                    warn!(kind, "unknown condition kind");
                    false
                }
            },
        };
        result != node.negate
    }

    /// Resolve an operand to a value. A string literal prefixed with `$`
    /// reads the named attribute; other literals are offered to the value
    /// hook before passing through unchanged.
    fn resolve(&self, operand: &Operand, store: &VariableStore) -> Value {
        match operand {
            Operand::Literal { value } => {
                if let Value::String(s) = value {
                    if let Some(key) = s.strip_prefix(KEY_SIGIL) {
                        return store.value_by_key(key);
                    }
                }
                if let Some(hook) = &self.value_hook {
                    if let Some(resolved) = hook(value, store) {
                        return resolved;
                    }
                }
                value.clone()
            }
            Operand::Attribute { id } => store.attribute_value(*id),
            Operand::AttributeKey { key } => store.value_by_key(key),
            Operand::ItemCount { item } => Value::Number(f64::from(store.item_count(*item))),
            Operand::Flag { key } => Value::Bool(store.flag(key)),
        }
    }
}

impl std::fmt::Debug for ConditionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEngine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
