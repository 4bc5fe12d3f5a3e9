//! Synchronous, topic-keyed publish/subscribe bus.
//!
//! Every runtime component reports state changes through the bus. `emit`
//! iterates a snapshot of the current subscribers for the event's topic;
//! one failing subscriber is logged and does not stop the others, and
//! within one topic subscribers run in registration order.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use faden_core::{
    CharacterId, ClueId, ItemId, NarrativeNode, NodeId, NodeKind, SegmentId, ShopId, StoryId,
    Value,
};
use tracing::warn;

use crate::error::RuntimeResult;

/// Topic keys events are subscribed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A story was loaded.
    StoryLoaded,
    /// A segment was started.
    SegmentStarted,
    /// A node became current.
    NodeEntered,
    /// A node stopped being current.
    NodeExited,
    /// The flow reached a dead end.
    StoryEnded,
    /// An attribute value changed.
    AttributeChanged,
    /// Items were added to the inventory.
    ItemAdded,
    /// Items were removed from the inventory.
    ItemRemoved,
    /// A clue became revealed.
    ClueRevealed,
    /// A character obtained a clue.
    ClueObtained,
    /// A character lost a clue.
    ClueLost,
    /// A clue was shared between characters.
    ClueShared,
    /// Show a transient message.
    Toast,
    /// Open a shop screen.
    OpenShop,
    /// Open a crafting screen.
    OpenCrafting,
    /// Shake the screen.
    Shake,
    /// Play a sound effect.
    PlaySfx,
}

/// An event published on the bus.
#[derive(Debug, Clone)]
pub enum Event {
    /// A story was loaded and the variable store reseeded.
    StoryLoaded {
        /// The story's id.
        story_id: StoryId,
        /// The story's title.
        title: String,
    },
    /// A segment was started and its scene graph rebuilt.
    SegmentStarted {
        /// The segment's id.
        segment_id: SegmentId,
        /// The segment's name.
        name: String,
    },
    /// A node became current.
    NodeEntered {
        /// The node's id.
        node_id: NodeId,
        /// The node's kind.
        kind: NodeKind,
        /// A snapshot of the node.
        node: NarrativeNode,
    },
    /// A node stopped being current.
    NodeExited {
        /// The node's id.
        node_id: NodeId,
    },
    /// No viable outgoing edge remained.
    StoryEnded {
        /// The segment the flow ended in.
        segment_id: SegmentId,
    },
    /// An attribute changed to a new value.
    AttributeChanged {
        /// The attribute's id.
        id: faden_core::AttributeId,
        /// The attribute's key.
        key: String,
        /// The new value.
        value: Value,
        /// The previous value.
        old_value: Value,
    },
    /// Items were added to the inventory.
    ItemAdded {
        /// The item's id.
        item_id: ItemId,
        /// How many were added.
        count: u32,
        /// The resulting total.
        total: u32,
    },
    /// Items were removed from the inventory.
    ItemRemoved {
        /// The item's id.
        item_id: ItemId,
        /// How many were removed.
        count: u32,
        /// The resulting total.
        total: u32,
    },
    /// A clue transitioned to revealed.
    ClueRevealed {
        /// The clue's id.
        clue_id: ClueId,
    },
    /// A character obtained a clue for the first time.
    ClueObtained {
        /// The clue's id.
        clue_id: ClueId,
        /// The obtaining character.
        character_id: CharacterId,
    },
    /// A character lost ownership of a clue.
    ClueLost {
        /// The clue's id.
        clue_id: ClueId,
        /// The losing character.
        character_id: CharacterId,
    },
    /// A clue was shared from one character to another.
    ClueShared {
        /// The clue's id.
        clue_id: ClueId,
        /// The sharing character.
        from: CharacterId,
        /// The receiving character.
        to: CharacterId,
    },
    /// Show a transient message to the player.
    Toast {
        /// The message text.
        message: String,
        /// Display duration, if the UI honors it.
        duration_ms: Option<u64>,
    },
    /// Open a shop screen.
    OpenShop {
        /// The shop to open.
        shop_id: ShopId,
    },
    /// Open a crafting screen.
    OpenCrafting {
        /// Optional crafting-station identifier.
        station: Option<String>,
    },
    /// Shake the screen.
    Shake {
        /// Shake intensity.
        intensity: f32,
        /// Shake duration.
        duration_ms: u64,
    },
    /// Play a sound effect.
    PlaySfx {
        /// The sound to play.
        sound_id: String,
        /// Playback volume in `[0, 1]`.
        volume: f32,
    },
}

impl Event {
    /// The topic this event is published under.
    pub fn topic(&self) -> Topic {
        match self {
            Event::StoryLoaded { .. } => Topic::StoryLoaded,
            Event::SegmentStarted { .. } => Topic::SegmentStarted,
            Event::NodeEntered { .. } => Topic::NodeEntered,
            Event::NodeExited { .. } => Topic::NodeExited,
            Event::StoryEnded { .. } => Topic::StoryEnded,
            Event::AttributeChanged { .. } => Topic::AttributeChanged,
            Event::ItemAdded { .. } => Topic::ItemAdded,
            Event::ItemRemoved { .. } => Topic::ItemRemoved,
            Event::ClueRevealed { .. } => Topic::ClueRevealed,
            Event::ClueObtained { .. } => Topic::ClueObtained,
            Event::ClueLost { .. } => Topic::ClueLost,
            Event::ClueShared { .. } => Topic::ClueShared,
            Event::Toast { .. } => Topic::Toast,
            Event::OpenShop { .. } => Topic::OpenShop,
            Event::OpenCrafting { .. } => Topic::OpenCrafting,
            Event::Shake { .. } => Topic::Shake,
            Event::PlaySfx { .. } => Topic::PlaySfx,
        }
    }
}

/// A subscriber callback. A returned `Err` is logged by the bus and does
/// not affect other subscribers or the emitter.
///
/// Callbacks run synchronously on the emitting thread, which may hold the
/// shared store's lock. Subscribers must not lock the store; change events
/// carry the relevant state instead.
pub type Subscriber = Arc<dyn Fn(&Event) -> RuntimeResult<()> + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

/// The synchronous publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<Topic, Vec<(SubscriberId, Subscriber)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic. Subscribers are invoked in registration order.
    pub fn on<F>(&self, topic: Topic, callback: F) -> SubscriberId
    where
        F: Fn(&Event) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Unsubscribe. Returns whether a subscriber was removed.
    pub fn off(&self, topic: Topic, id: SubscriberId) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        list.len() != before
    }

    /// Publish an event to the subscribers of its topic. Each subscriber
    /// runs in its own failure boundary: a failure is logged and the rest
    /// still run.
    pub fn emit(&self, event: Event) {
        let topic = event.topic();
        let snapshot: Vec<Subscriber> = self
            .lock()
            .get(&topic)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default();

        for subscriber in snapshot {
            if let Err(error) = subscriber(&event) {
                warn!(?topic, %error, "event subscriber failed");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, Vec<(SubscriberId, Subscriber)>>> {
        // A poisoned lock still holds a consistent subscriber table.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}
