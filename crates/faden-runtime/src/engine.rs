//! The narrative engine: interprets a segment graph to drive story flow.
//!
//! The engine is a small state machine — *unloaded* until a story is
//! loaded, then *segment-active* once a segment has been started and a
//! current node is set. Control nodes (START, BRANCH, ACTION) are
//! fast-forwarded immediately on entry; content nodes (LOCATION, DIALOGUE,
//! VOTE, JUMP) stay current and wait for `advance` or `trigger_event`.
//!
//! Actions never call back into the engine directly. The `Advance` and
//! `JumpTo` built-ins push requests onto the [`EngineMailbox`]; each public
//! entry point drains the mailbox after its own transition settles, so
//! engine calls are serialized even when actions re-enter.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use faden_core::{
    Edge, EventTrigger, Guard, NarrativeNode, NodeBody, NodeId, NodeKind, SegmentId, StoryAsset,
};
use tracing::{debug, warn};

use crate::action::{ActionContext, ActionExecutor, ActionRegistry, ActionScope, Generation};
use crate::bus::{Event, EventBus};
use crate::condition::{ConditionEngine, ConditionRegistry, ValueHook};
use crate::error::{RuntimeError, RuntimeResult};
use crate::scene::SceneGraph;
use crate::store::{SharedStore, VariableStore};

/// A request for the engine, queued by an action instead of a direct call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRequest {
    /// Advance from the current node with no choice.
    Advance,
    /// Jump directly to a node, bypassing edge guards.
    JumpTo(NodeId),
}

/// Single-consumer queue of engine re-entry requests.
#[derive(Debug, Clone, Default)]
pub struct EngineMailbox(Arc<Mutex<VecDeque<EngineRequest>>>);

impl EngineMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request.
    pub fn push(&self, request: EngineRequest) {
        self.lock().push_back(request);
    }

    /// Take the oldest queued request.
    pub fn pop(&self) -> Option<EngineRequest> {
        self.lock().pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<EngineRequest>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Result of looking for an outgoing edge to follow.
enum EdgePick {
    /// Transition to this node.
    To(NodeId),
    /// Stay on the current node (missing or unmatched choice).
    Stay,
    /// No viable edge: the flow has reached a dead end.
    DeadEnd,
}

/// Builds a fully wired engine: bus, store, registries, executor, and
/// condition engine, with no hidden globals.
#[derive(Default)]
pub struct EngineBuilder {
    actions: ActionRegistry,
    conditions: ConditionRegistry,
    value_hook: Option<ValueHook>,
}

impl EngineBuilder {
    /// Start with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom action handler.
    pub fn register_action(
        mut self,
        kind: impl Into<String>,
        handler: Arc<dyn crate::action::ActionHandler>,
    ) -> Self {
        self.actions.register(kind, handler);
        self
    }

    /// Register a custom condition handler.
    pub fn register_condition(
        mut self,
        kind: impl Into<String>,
        handler: Arc<dyn crate::condition::ConditionHandler>,
    ) -> Self {
        self.conditions.register(kind, handler);
        self
    }

    /// Install an operand-resolution hook for condition evaluation.
    pub fn with_value_hook(mut self, hook: ValueHook) -> Self {
        self.value_hook = Some(hook);
        self
    }

    /// Wire everything together.
    pub fn build(self) -> NarrativeEngine {
        let bus = Arc::new(EventBus::new());
        let store = SharedStore::new(VariableStore::new(Arc::clone(&bus)));
        NarrativeEngine {
            executor: ActionExecutor::new(Arc::new(self.actions)),
            conditions: ConditionEngine::new(self.conditions, self.value_hook),
            scene: SceneGraph::new(),
            mailbox: EngineMailbox::new(),
            generation: Arc::new(AtomicU64::new(0)),
            story: None,
            current_segment: None,
            current_node: None,
            last_location: None,
            store,
            bus,
        }
    }
}

/// Interprets a loaded story.
#[derive(Debug)]
pub struct NarrativeEngine {
    bus: Arc<EventBus>,
    store: SharedStore,
    executor: ActionExecutor,
    conditions: ConditionEngine,
    scene: SceneGraph,
    mailbox: EngineMailbox,
    generation: Arc<AtomicU64>,
    story: Option<Arc<StoryAsset>>,
    current_segment: Option<SegmentId>,
    current_node: Option<NodeId>,
    last_location: Option<NodeId>,
}

impl NarrativeEngine {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The event bus this engine publishes on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The shared variable store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The scene graph of the active segment.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mutable access to the scene graph, for editor-facing selection.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// The loaded story, if any.
    pub fn story(&self) -> Option<&StoryAsset> {
        self.story.as_deref()
    }

    /// The active segment id, if any.
    pub fn current_segment_id(&self) -> Option<SegmentId> {
        self.current_segment
    }

    /// The current node id, if any.
    pub fn current_node_id(&self) -> Option<NodeId> {
        self.current_node
    }

    /// The current node. Pure lookup, never mutates.
    pub fn current_node(&self) -> Option<&NarrativeNode> {
        let story = self.story.as_deref()?;
        let segment = story.segment(self.current_segment?)?;
        segment.node(self.current_node?)
    }

    /// Load a story: bump the generation (stranding any in-flight delayed
    /// or detached work), reseed the variable store, and reset all
    /// navigation state.
    pub fn load_story(&mut self, story: StoryAsset) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.lock().init(&story);
        self.scene.clear();
        self.current_segment = None;
        self.current_node = None;
        self.last_location = None;
        self.bus.emit(Event::StoryLoaded {
            story_id: story.id,
            title: story.meta.title.clone(),
        });
        self.story = Some(Arc::new(story));
    }

    /// Start a segment: rebuild the scene graph and enter the segment's
    /// entry node. Unknown stories or segments are logged no-ops.
    pub async fn start_segment(&mut self, id: SegmentId) -> RuntimeResult<Option<NodeId>> {
        let Some(story) = self.story.clone() else {
            warn!("start_segment: no story loaded");
            return Ok(None);
        };
        let Some(segment) = story.segment(id) else {
            warn!(%id, "start_segment: unknown segment");
            return Ok(None);
        };

        self.current_node = None;
        self.last_location = None;
        self.current_segment = Some(id);
        self.scene.rebuild(segment);
        self.bus.emit(Event::SegmentStarted {
            segment_id: id,
            name: segment.name.clone(),
        });

        let Some(entry) = segment.entry_node() else {
            warn!(%id, "start_segment: segment has no nodes");
            return Ok(None);
        };
        let settled = self.enter_node(entry).await?;
        self.drain_mailbox().await?;
        Ok(settled)
    }

    /// Advance from the current node, following the first outgoing edge
    /// whose guard passes. On a dialogue with choices, `choice` selects the
    /// edge by handle id and is required. A dead end emits `StoryEnded` and
    /// returns `None`.
    pub async fn advance(&mut self, choice: Option<&str>) -> RuntimeResult<Option<NodeId>> {
        let settled = self.advance_inner(choice).await?;
        self.drain_mailbox().await?;
        Ok(settled)
    }

    /// Fire the current node's events matching a trigger and optional
    /// sub-target (e.g. a hotspot id), executing their action chains and
    /// performing at most one navigation jump per event.
    pub async fn trigger_event(
        &mut self,
        trigger: &EventTrigger,
        target: Option<&str>,
    ) -> RuntimeResult<()> {
        let Some(current) = self.current_node else {
            return Ok(());
        };
        if let Some(nav) = self.fire_events(current, trigger, target).await? {
            let mut visited = HashSet::new();
            self.enter_chain(nav, &mut visited).await?;
        }
        self.drain_mailbox().await?;
        Ok(())
    }

    /// Jump directly to a node in the current segment, bypassing edge
    /// guards. An unknown node is a logged no-op.
    pub async fn jump_to_node(&mut self, id: NodeId) -> RuntimeResult<Option<NodeId>> {
        let in_segment = self
            .context()
            .and_then(|(story, seg)| story.segment(seg).map(|s| s.contains_node(id)))
            .unwrap_or(false);
        if !in_segment {
            warn!(%id, "jump_to_node: node not in current segment");
            return Ok(None);
        }
        let settled = self.enter_node(id).await?;
        self.drain_mailbox().await?;
        Ok(settled)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn context(&self) -> Option<(Arc<StoryAsset>, SegmentId)> {
        Some((self.story.clone()?, self.current_segment?))
    }

    fn action_context(&self, segment: SegmentId, node: NodeId) -> ActionContext {
        ActionContext {
            store: self.store.clone(),
            bus: Arc::clone(&self.bus),
            requests: self.mailbox.clone(),
            scope: ActionScope { segment, node },
            generation: Generation::snapshot(&self.generation),
        }
    }

    fn eval_guard(&self, guard: &Guard) -> bool {
        let store = self.store.lock();
        self.conditions.evaluate_guard(guard, &store)
    }

    fn edge_passes(&self, edge: &Edge) -> bool {
        match &edge.guard {
            Some(guard) => self.eval_guard(guard),
            None => true,
        }
    }

    async fn advance_inner(&mut self, choice: Option<&str>) -> RuntimeResult<Option<NodeId>> {
        let Some(current) = self.current_node else {
            return Ok(None);
        };
        match self.pick_edge(current, choice) {
            EdgePick::To(target) => self.enter_node(target).await,
            EdgePick::Stay => Ok(Some(current)),
            EdgePick::DeadEnd => {
                if let Some(segment_id) = self.current_segment {
                    self.bus.emit(Event::StoryEnded { segment_id });
                }
                Ok(None)
            }
        }
    }

    /// Select an outgoing edge of `source` per the advance rules.
    fn pick_edge(&self, source: NodeId, choice: Option<&str>) -> EdgePick {
        let Some((story, seg_id)) = self.context() else {
            return EdgePick::DeadEnd;
        };
        let Some(segment) = story.segment(seg_id) else {
            return EdgePick::DeadEnd;
        };
        let Some(node) = segment.node(source) else {
            return EdgePick::DeadEnd;
        };
        let edges = segment.edges_from(source);

        if let NodeBody::Dialogue { choices, .. } = &node.body {
            if !choices.is_empty() {
                let Some(choice) = choice else {
                    warn!(node = %source, "advance on a dialogue with choices requires a choice id");
                    return EdgePick::Stay;
                };
                return match edges
                    .iter()
                    .find(|e| e.source_handle.as_deref() == Some(choice))
                {
                    Some(edge) => EdgePick::To(edge.target),
                    None => {
                        debug!(choice, "no edge matches the chosen handle");
                        EdgePick::Stay
                    }
                };
            }
        }

        let cases = match &node.body {
            NodeBody::Branch { cases } => Some(cases),
            _ => None,
        };
        for edge in edges {
            let passes = if let Some(guard) = &edge.guard {
                self.eval_guard(guard)
            } else if let (Some(cases), Some(handle)) = (cases, edge.source_handle.as_deref()) {
                match cases.iter().find(|c| c.id == handle) {
                    Some(case) => {
                        let store = self.store.lock();
                        self.conditions.evaluate(&case.condition, &store)
                    }
                    // A handle with no matching case is the implicit else
                    None => true,
                }
            } else {
                true
            };
            if passes {
                return EdgePick::To(edge.target);
            }
        }
        EdgePick::DeadEnd
    }

    async fn enter_node(&mut self, id: NodeId) -> RuntimeResult<Option<NodeId>> {
        let mut visited = HashSet::new();
        self.enter_chain(id, &mut visited).await
    }

    /// Make a node current, then apply node-kind auto-behavior, looping
    /// until the flow settles on a content node. The visited set spans the
    /// whole pass so control-node cycles are detected instead of looping.
    async fn enter_chain(
        &mut self,
        start: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> RuntimeResult<Option<NodeId>> {
        let mut target = start;
        loop {
            if !visited.insert(target) {
                return Err(RuntimeError::NavigationCycle { node: target });
            }
            let Some((story, seg_id)) = self.context() else {
                return Ok(None);
            };
            let node = match story.segment(seg_id).and_then(|s| s.node(target)) {
                Some(node) => node.clone(),
                None => {
                    warn!(%target, "enter: node not found in segment");
                    return Ok(None);
                }
            };

            if let Some(old) = self.current_node.take() {
                // Exit events run their action chains but never navigate;
                // the pointer is mid-transition.
                self.fire_events(old, &EventTrigger::OnExit, None).await?;
                self.bus.emit(Event::NodeExited { node_id: old });
            }

            self.current_node = Some(target);
            if node.kind() == NodeKind::Location {
                self.last_location = Some(target);
            }
            self.scene.select(target);
            self.bus.emit(Event::NodeEntered {
                node_id: target,
                kind: node.kind(),
                node: node.clone(),
            });

            // An on-enter event that navigates wins over auto-advance
            if let Some(nav) = self.fire_events(target, &EventTrigger::OnEnter, None).await? {
                target = nav;
                continue;
            }

            match node.kind() {
                NodeKind::Start | NodeKind::Branch => match self.pick_edge(target, None) {
                    EdgePick::To(next) => {
                        target = next;
                        continue;
                    }
                    _ => {
                        // Control nodes are never a resting place; clear the
                        // pointer so a later advance cannot end the story twice
                        self.current_node = None;
                        self.bus.emit(Event::StoryEnded { segment_id: seg_id });
                        return Ok(None);
                    }
                },
                NodeKind::Action => {
                    let actions = match &node.body {
                        NodeBody::Action { actions } => actions.clone(),
                        _ => Vec::new(),
                    };
                    let ctx = self.action_context(seg_id, target);
                    self.executor.execute_group(&actions, &ctx).await?;

                    let next = story.segment(seg_id).and_then(|s| {
                        s.edges_from(target)
                            .into_iter()
                            .find(|e| e.guard.is_none())
                            .map(|e| e.target)
                    });
                    match next {
                        Some(next) => {
                            target = next;
                            continue;
                        }
                        None => {
                            // Silently fall back to the last visited
                            // location so hotspot triggers stay reachable
                            self.current_node = self.last_location;
                            return Ok(self.current_node);
                        }
                    }
                }
                _ => return Ok(Some(target)),
            }
        }
    }

    /// Fire the events of `node_id` matching `trigger`/`target`. Action-
    /// targeted edges of each passing event all run in order; among its
    /// navigation-targeted edges, at most the first passing one jumps.
    /// Returns the navigation target the caller should enter, if any.
    async fn fire_events(
        &mut self,
        node_id: NodeId,
        trigger: &EventTrigger,
        target: Option<&str>,
    ) -> RuntimeResult<Option<NodeId>> {
        let Some((story, seg_id)) = self.context() else {
            return Ok(None);
        };
        let Some(segment) = story.segment(seg_id) else {
            return Ok(None);
        };
        let Some(node) = segment.node(node_id) else {
            return Ok(None);
        };
        let events: Vec<_> = node
            .events_for(trigger, target)
            .into_iter()
            .cloned()
            .collect();
        // Exit events never navigate (see enter_chain)
        let suppress_nav = *trigger == EventTrigger::OnExit;

        let mut nav = None;
        for event in events {
            if let Some(guard) = &event.guard {
                if !self.eval_guard(guard) {
                    continue;
                }
            }
            let edges: Vec<Edge> = segment
                .edges_from(node_id)
                .into_iter()
                .filter(|e| e.source_handle.as_deref() == Some(event.id.as_str()))
                .cloned()
                .collect();
            if edges.is_empty() {
                warn!(label = %event.label, "event fired but has no outgoing edges");
                self.bus.emit(Event::Toast {
                    message: format!("Nothing happens. ({})", event.label),
                    duration_ms: None,
                });
                continue;
            }

            let mut action_nav = None;
            for edge in &edges {
                let Some(target_node) = segment.node(edge.target) else {
                    warn!(edge = %edge.id, "event edge targets a missing node");
                    continue;
                };
                if target_node.kind() != NodeKind::Action {
                    continue;
                }
                if !self.edge_passes(edge) {
                    continue;
                }
                let mut pass_visited = HashSet::new();
                if let Some(content) = self.resolve_to_content(edge.target, &mut pass_visited).await? {
                    action_nav = Some(content);
                }
            }

            let mut jump_nav = None;
            for edge in &edges {
                let Some(target_node) = segment.node(edge.target) else {
                    continue;
                };
                if target_node.kind() == NodeKind::Action {
                    continue;
                }
                if self.edge_passes(edge) {
                    jump_nav = Some(edge.target);
                    break;
                }
            }

            if let Some(n) = jump_nav.or(action_nav) {
                nav = Some(n);
            }
        }
        Ok(if suppress_nav { None } else { nav })
    }

    /// Fast-forward through ACTION (execute, then follow edges) and BRANCH
    /// (evaluate, follow the first match) nodes until a content node is
    /// reached. The visited set fails the pass on a cycle instead of
    /// looping.
    async fn resolve_to_content(
        &mut self,
        start: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> RuntimeResult<Option<NodeId>> {
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return Err(RuntimeError::NavigationCycle { node: current });
            }
            let Some((story, seg_id)) = self.context() else {
                return Ok(None);
            };
            let Some(node) = story.segment(seg_id).and_then(|s| s.node(current)) else {
                return Ok(None);
            };
            match node.kind() {
                NodeKind::Action => {
                    let actions = match &node.body {
                        NodeBody::Action { actions } => actions.clone(),
                        _ => Vec::new(),
                    };
                    let ctx = self.action_context(seg_id, current);
                    self.executor.execute_group(&actions, &ctx).await?;
                    match self.pick_edge(current, None) {
                        EdgePick::To(next) => current = next,
                        _ => return Ok(None),
                    }
                }
                NodeKind::Branch => match self.pick_edge(current, None) {
                    EdgePick::To(next) => current = next,
                    _ => return Ok(None),
                },
                _ => return Ok(Some(current)),
            }
        }
    }

    /// Apply queued engine requests one at a time until the mailbox is
    /// empty, serializing re-entrant engine calls from actions.
    async fn drain_mailbox(&mut self) -> RuntimeResult<()> {
        while let Some(request) = self.mailbox.pop() {
            match request {
                EngineRequest::Advance => {
                    self.advance_inner(None).await?;
                }
                EngineRequest::JumpTo(target) => {
                    let in_segment = self
                        .context()
                        .and_then(|(story, seg)| {
                            story.segment(seg).map(|s| s.contains_node(target))
                        })
                        .unwrap_or(false);
                    if in_segment {
                        self.enter_node(target).await?;
                    } else {
                        warn!(%target, "queued jump targets a node outside the segment");
                    }
                }
            }
        }
        Ok(())
    }
}
