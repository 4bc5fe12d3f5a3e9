//! The variable store: the single source of truth for runtime RPG state.
//!
//! Three namespaces — attribute values, inventory counts, and clue state —
//! are reseeded from the story's definitions on every load and discarded on
//! reset; they have no persistence of their own. Every mutation that
//! actually changes state is reported on the event bus.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use faden_core::{
    AttributeDefinition, AttributeId, AttributeOp, CharacterId, Clue, ClueId, Item, ItemId,
    StoryAsset, Value,
};
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::condition::{ConditionEngine, ConditionRegistry, parse_legacy};

/// Runtime state of one clue.
#[derive(Debug, Clone, Default)]
struct ClueState {
    revealed: bool,
    owners: HashSet<CharacterId>,
}

/// Holds attribute, inventory, and clue runtime state.
#[derive(Debug)]
pub struct VariableStore {
    bus: Arc<EventBus>,
    attributes: HashMap<AttributeId, AttributeDefinition>,
    key_index: HashMap<String, AttributeId>,
    items: HashMap<ItemId, Item>,
    clue_defs: HashMap<ClueId, Clue>,
    values: HashMap<AttributeId, Value>,
    inventory: HashMap<ItemId, u32>,
    clues: HashMap<ClueId, ClueState>,
}

impl VariableStore {
    /// Create an empty store publishing on the given bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            attributes: HashMap::new(),
            key_index: HashMap::new(),
            items: HashMap::new(),
            clue_defs: HashMap::new(),
            values: HashMap::new(),
            inventory: HashMap::new(),
            clues: HashMap::new(),
        }
    }

    /// Reset all three namespaces from a story's definitions, discarding
    /// any prior values.
    pub fn init(&mut self, story: &StoryAsset) {
        self.attributes.clear();
        self.key_index.clear();
        self.items.clear();
        self.clue_defs.clear();
        self.values.clear();
        self.inventory.clear();
        self.clues.clear();

        for def in &story.attributes {
            self.key_index.insert(def.key.clone(), def.id);
            self.attributes.insert(def.id, def.clone());
        }
        for item in &story.items {
            self.items.insert(item.id, item.clone());
        }
        for clue in &story.clues {
            let owners: HashSet<CharacterId> = clue.owners.iter().copied().collect();
            self.clues.insert(
                clue.id,
                ClueState {
                    // Ownership implies revealed
                    revealed: clue.revealed || !owners.is_empty(),
                    owners,
                },
            );
            self.clue_defs.insert(clue.id, clue.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Set an attribute, coercing to its declared type and clamping numeric
    /// values into `[min, max]`. Emits `AttributeChanged` only when the
    /// final value differs from the prior one.
    pub fn set_attribute(&mut self, id: AttributeId, value: Value) {
        let Some(def) = self.attributes.get(&id) else {
            warn!(%id, "set_attribute: unknown attribute");
            return;
        };
        let coerced = def.coerce(value);
        let old = self
            .values
            .get(&id)
            .cloned()
            .unwrap_or_else(|| def.default.clone());
        if coerced == old {
            return;
        }
        let key = def.key.clone();
        self.values.insert(id, coerced.clone());
        self.bus.emit(Event::AttributeChanged {
            id,
            key,
            value: coerced,
            old_value: old,
        });
    }

    /// Combine the current numeric value (missing counts as 0) with an
    /// operand, then set the result.
    pub fn modify_attribute(&mut self, id: AttributeId, op: AttributeOp, value: f64) {
        let current = self.attribute_value(id).as_number().unwrap_or(0.0);
        let next = match op {
            AttributeOp::Add => current + value,
            AttributeOp::Sub => current - value,
            AttributeOp::Set => value,
        };
        self.set_attribute(id, Value::Number(next));
    }

    /// The current value of an attribute: the stored value, the declared
    /// default, or `Null` if undeclared.
    pub fn attribute_value(&self, id: AttributeId) -> Value {
        if let Some(value) = self.values.get(&id) {
            return value.clone();
        }
        self.attributes
            .get(&id)
            .map(|def| def.default.clone())
            .unwrap_or(Value::Null)
    }

    /// The current value of an attribute looked up by key.
    pub fn value_by_key(&self, key: &str) -> Value {
        self.key_index
            .get(key)
            .map(|id| self.attribute_value(*id))
            .unwrap_or(Value::Null)
    }

    /// Resolve an attribute id from its key.
    pub fn attribute_id(&self, key: &str) -> Option<AttributeId> {
        self.key_index.get(key).copied()
    }

    /// The truthiness of an attribute read as a boolean flag.
    pub fn flag(&self, key: &str) -> bool {
        self.value_by_key(key).is_truthy()
    }

    /// Evaluate a legacy `"identifier operator value"` expression against
    /// the store. The expression desugars into the same condition tree
    /// structured guards use, so coercion and loose equality are shared.
    /// Desugared trees contain no custom kinds, so no registry is needed.
    pub fn evaluate_condition(&self, expr: &str) -> bool {
        let node = parse_legacy(expr);
        ConditionEngine::new(ConditionRegistry::new(), None).evaluate(&node, self)
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    /// Add items to the inventory. Non-stackable items cap at one: an item
    /// already held is a logged no-op, and any larger count stores one.
    pub fn add_item(&mut self, id: ItemId, count: u32) {
        let Some(item) = self.items.get(&id) else {
            warn!(%id, "add_item: unknown item");
            return;
        };
        if count == 0 {
            return;
        }
        let current = self.inventory.get(&id).copied().unwrap_or(0);
        if !item.stackable && current >= 1 {
            debug!(item = %item.name, "add_item: non-stackable item already held");
            return;
        }
        let total = if item.stackable { current + count } else { 1 };
        self.inventory.insert(id, total);
        self.bus.emit(Event::ItemAdded {
            item_id: id,
            count: total - current,
            total,
        });
    }

    /// Remove items from the inventory, flooring at zero. A count of zero
    /// removes the key entirely.
    pub fn remove_item(&mut self, id: ItemId, count: u32) {
        let current = self.inventory.get(&id).copied().unwrap_or(0);
        if current == 0 {
            debug!(%id, "remove_item: nothing to remove");
            return;
        }
        let removed = count.min(current);
        let total = current - removed;
        if total == 0 {
            self.inventory.remove(&id);
        } else {
            self.inventory.insert(id, total);
        }
        self.bus.emit(Event::ItemRemoved {
            item_id: id,
            count: removed,
            total,
        });
    }

    /// The current count of an item. Absence means zero.
    pub fn item_count(&self, id: ItemId) -> u32 {
        self.inventory.get(&id).copied().unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Clues
    // -----------------------------------------------------------------------

    /// Reveal a clue and, when a character is given, grant ownership.
    /// `ClueRevealed` fires only on the hidden-to-revealed transition;
    /// `ClueObtained` only on a character's first acquisition.
    pub fn add_clue(&mut self, id: ClueId, character: Option<CharacterId>) {
        let Some(state) = self.clues.get_mut(&id) else {
            warn!(%id, "add_clue: unknown clue");
            return;
        };
        let mut events = Vec::new();
        if !state.revealed {
            state.revealed = true;
            events.push(Event::ClueRevealed { clue_id: id });
        }
        if let Some(character_id) = character {
            if state.owners.insert(character_id) {
                events.push(Event::ClueObtained {
                    clue_id: id,
                    character_id,
                });
            }
        }
        for event in events {
            self.bus.emit(event);
        }
    }

    /// Remove a character's ownership of a clue. Never un-reveals.
    pub fn remove_clue(&mut self, id: ClueId, character: Option<CharacterId>) {
        let Some(state) = self.clues.get_mut(&id) else {
            warn!(%id, "remove_clue: unknown clue");
            return;
        };
        let Some(character_id) = character else {
            return;
        };
        if state.owners.remove(&character_id) {
            self.bus.emit(Event::ClueLost {
                clue_id: id,
                character_id,
            });
        }
    }

    /// Transfer a clue between characters. Succeeds only if `from` owns the
    /// clue and `to` does not; on success `to` obtains it and `ClueShared`
    /// fires.
    pub fn share_clue(&mut self, id: ClueId, from: CharacterId, to: CharacterId) {
        let Some(state) = self.clues.get(&id) else {
            warn!(%id, "share_clue: unknown clue");
            return;
        };
        if !state.owners.contains(&from) || state.owners.contains(&to) {
            debug!(%id, "share_clue: preconditions not met");
            return;
        }
        self.add_clue(id, Some(to));
        self.bus.emit(Event::ClueShared {
            clue_id: id,
            from,
            to,
        });
    }

    /// Whether a clue is revealed and, when a character is given, owned by
    /// that character.
    pub fn has_clue(&self, id: ClueId, character: Option<CharacterId>) -> bool {
        let Some(state) = self.clues.get(&id) else {
            return false;
        };
        if !state.revealed {
            return false;
        }
        match character {
            Some(character_id) => state.owners.contains(&character_id),
            None => true,
        }
    }
}

/// A cloneable handle to the store, shared between the engine, the action
/// executor, and detached tasks.
#[derive(Debug, Clone)]
pub struct SharedStore(Arc<Mutex<VariableStore>>);

impl SharedStore {
    /// Wrap a store for sharing.
    pub fn new(store: VariableStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    /// Lock the store. A poisoned lock still holds consistent state.
    ///
    /// Store mutations emit their change events while the caller's guard is
    /// still held, so subscribers must not call `lock` themselves. They do
    /// not need to: every change event carries the data it describes,
    /// including the prior value where one exists.
    pub fn lock(&self) -> MutexGuard<'_, VariableStore> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
