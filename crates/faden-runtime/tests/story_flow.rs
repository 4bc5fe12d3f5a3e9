//! End-to-end story flow scenarios through a fully wired engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use faden_core::{
    ActionBody, ActionDef, AttributeDefinition, DialogueChoice, Edge, EventTrigger, Guard,
    Hotspot, Item, NarrativeNode, NodeEvent, NodeId, SegmentAsset, SegmentId, StoryAsset,
};
use faden_runtime::{Event, NarrativeEngine, Topic};

fn engine_with(story: StoryAsset) -> (NarrativeEngine, SegmentId) {
    let segment_id = story.active_segment.expect("story has a segment");
    let mut engine = NarrativeEngine::builder().build();
    engine.load_story(story);
    (engine, segment_id)
}

fn count_topic(engine: &NarrativeEngine, topic: Topic) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    engine.bus().on(topic, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    count
}

/// START -> LOCATION -> DIALOGUE(c1, c2) -> {A, B}
fn dialogue_story() -> (StoryAsset, NodeId, NodeId, NodeId, NodeId) {
    let mut segment = SegmentAsset::new("Prologue");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let tavern = segment
        .insert_node(NarrativeNode::location("Tavern", "tavern.png"))
        .unwrap();
    let greeting = segment
        .insert_node(
            NarrativeNode::dialogue("Greeting", "What'll it be?")
                .with_choice(DialogueChoice::new("c1", "An ale."))
                .with_choice(DialogueChoice::new("c2", "Just directions.")),
        )
        .unwrap();
    let bar = segment
        .insert_node(NarrativeNode::location("Bar", "bar.png"))
        .unwrap();
    let road = segment
        .insert_node(NarrativeNode::location("Road", "road.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, tavern));
    segment.add_edge(Edge::new(tavern, greeting));
    segment.add_edge(Edge::new(greeting, bar).with_handle("c1"));
    segment.add_edge(Edge::new(greeting, road).with_handle("c2"));

    let story = StoryAsset::new("Dialogue flow").with_segment(segment);
    (story, tavern, greeting, bar, road)
}

#[tokio::test]
async fn choice_routes_to_the_matching_edge() {
    let (story, tavern, greeting, bar, road) = dialogue_story();
    let (mut engine, segment_id) = engine_with(story);

    // The start node auto-advances through to the first location
    let settled = engine.start_segment(segment_id).await.unwrap();
    assert_eq!(settled, Some(tavern));

    let settled = engine.advance(None).await.unwrap();
    assert_eq!(settled, Some(greeting));

    let settled = engine.advance(Some("c1")).await.unwrap();
    assert_eq!(settled, Some(bar));

    // Back at the dialogue, the other choice takes the other edge
    engine.jump_to_node(greeting).await.unwrap();
    let settled = engine.advance(Some("c2")).await.unwrap();
    assert_eq!(settled, Some(road));
    assert_eq!(engine.current_node_id(), Some(road));
}

#[tokio::test]
async fn dialogue_with_choices_stays_put_without_one() {
    let (story, _tavern, greeting, _bar, _road) = dialogue_story();
    let (mut engine, segment_id) = engine_with(story);
    engine.start_segment(segment_id).await.unwrap();
    engine.advance(None).await.unwrap();
    assert_eq!(engine.current_node_id(), Some(greeting));

    // No choice, and an unknown choice, both leave the node current
    assert_eq!(engine.advance(None).await.unwrap(), Some(greeting));
    assert_eq!(engine.advance(Some("c9")).await.unwrap(), Some(greeting));
    assert_eq!(engine.current_node_id(), Some(greeting));
}

#[tokio::test]
async fn legacy_guard_routes_the_branch() {
    // hp starts at 30; the guarded edge requires 50
    let mut segment = SegmentAsset::new("Crossroads");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let fork = segment
        .insert_node(NarrativeNode::branch("Fit enough?", vec![]))
        .unwrap();
    let climb = segment
        .insert_node(NarrativeNode::location("Cliff path", "cliff.png"))
        .unwrap();
    let detour = segment
        .insert_node(NarrativeNode::location("Long road", "road.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, fork));
    segment.add_edge(Edge::new(fork, climb).with_guard(Guard::Legacy("hp >= 50".into())));
    segment.add_edge(Edge::new(fork, detour));

    let story = StoryAsset::new("Branching")
        .with_segment(segment)
        .with_attribute(AttributeDefinition::number("hp", 30.0).with_range(0.0, 100.0));
    let (mut engine, segment_id) = engine_with(story);

    let settled = engine.start_segment(segment_id).await.unwrap();
    assert_eq!(settled, Some(detour));
}

#[tokio::test]
async fn branch_cases_route_by_condition_with_implicit_else() {
    use faden_core::{BranchCase, CompareOp, ConditionNode, Operand};

    let fit = ConditionNode::compare(Operand::key("hp"), CompareOp::Ge, Operand::literal(50.0));
    let mut segment = SegmentAsset::new("Crossroads");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let fork = segment
        .insert_node(NarrativeNode::branch(
            "Fit enough?",
            vec![BranchCase::new("fit", fit)],
        ))
        .unwrap();
    let climb = segment
        .insert_node(NarrativeNode::location("Cliff path", "cliff.png"))
        .unwrap();
    let detour = segment
        .insert_node(NarrativeNode::location("Long road", "road.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, fork));
    segment.add_edge(Edge::new(fork, climb).with_handle("fit"));
    segment.add_edge(Edge::new(fork, detour).with_handle("else"));

    let story = StoryAsset::new("Branching")
        .with_segment(segment)
        .with_attribute(AttributeDefinition::number("hp", 30.0).with_range(0.0, 100.0));
    let (mut engine, segment_id) = engine_with(story);

    // hp is 30: the "fit" case fails, the unmatched handle is the else
    let settled = engine.start_segment(segment_id).await.unwrap();
    assert_eq!(settled, Some(detour));
}

#[tokio::test]
async fn guarded_edge_taken_when_the_condition_holds() {
    let mut segment = SegmentAsset::new("Crossroads");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let fork = segment
        .insert_node(NarrativeNode::branch("Fit enough?", vec![]))
        .unwrap();
    let climb = segment
        .insert_node(NarrativeNode::location("Cliff path", "cliff.png"))
        .unwrap();
    let detour = segment
        .insert_node(NarrativeNode::location("Long road", "road.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, fork));
    segment.add_edge(Edge::new(fork, climb).with_guard(Guard::Legacy("hp >= 50".into())));
    segment.add_edge(Edge::new(fork, detour));

    let story = StoryAsset::new("Branching")
        .with_segment(segment)
        .with_attribute(AttributeDefinition::number("hp", 80.0).with_range(0.0, 100.0));
    let (mut engine, segment_id) = engine_with(story);

    let settled = engine.start_segment(segment_id).await.unwrap();
    assert_eq!(settled, Some(climb));
}

#[tokio::test]
async fn non_stackable_item_is_added_once() {
    let lantern = Item::new("Lantern", false);
    let lantern_id = lantern.id;

    let mut segment = SegmentAsset::new("Cellar");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let grab = segment
        .insert_node(NarrativeNode::action(
            "Grab the lantern twice",
            vec![
                ActionDef::new(ActionBody::AddItem {
                    item: lantern_id,
                    count: 1,
                }),
                ActionDef::new(ActionBody::AddItem {
                    item: lantern_id,
                    count: 1,
                }),
            ],
        ))
        .unwrap();
    let cellar = segment
        .insert_node(NarrativeNode::location("Cellar", "cellar.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, grab));
    segment.add_edge(Edge::new(grab, cellar));

    let story = StoryAsset::new("Inventory")
        .with_segment(segment)
        .with_item(lantern);
    let (mut engine, segment_id) = engine_with(story);
    let added = count_topic(&engine, Topic::ItemAdded);

    engine.start_segment(segment_id).await.unwrap();
    assert_eq!(added.load(Ordering::SeqCst), 1);
    assert_eq!(engine.store().lock().item_count(lantern_id), 1);
}

#[tokio::test]
async fn dead_end_emits_story_ended_exactly_once() {
    let mut segment = SegmentAsset::new("Epilogue");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let end = segment
        .insert_node(NarrativeNode::location("The end", "end.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, end));

    let story = StoryAsset::new("Ending").with_segment(segment);
    let (mut engine, segment_id) = engine_with(story);
    let ended = count_topic(&engine, Topic::StoryEnded);

    engine.start_segment(segment_id).await.unwrap();
    let settled = engine.advance(None).await.unwrap();
    assert!(settled.is_none());
    assert_eq!(ended.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hotspot_click_runs_actions_then_navigates() {
    let door_event = NodeEvent::new(EventTrigger::OnClick, "door").with_target("door");
    let handle = door_event.id.clone();

    let mut segment = SegmentAsset::new("Tavern");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let mut tavern = NarrativeNode::location("Tavern", "tavern.png").with_event(door_event);
    if let faden_core::NodeBody::Location { hotspots, .. } = &mut tavern.body {
        hotspots.push(Hotspot {
            id: "door".into(),
            label: "Cellar door".into(),
            x: 0.1,
            y: 0.6,
            width: 0.2,
            height: 0.3,
        });
    }
    let tavern = segment.insert_node(tavern).unwrap();
    let creak = segment
        .insert_node(NarrativeNode::action(
            "Creak",
            vec![ActionDef::new(ActionBody::PlaySfx {
                sound: "creak.ogg".into(),
                volume: 0.8,
            })],
        ))
        .unwrap();
    let cellar = segment
        .insert_node(NarrativeNode::location("Cellar", "cellar.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, tavern));
    segment.add_edge(Edge::new(tavern, creak).with_handle(handle.clone()));
    segment.add_edge(Edge::new(tavern, cellar).with_handle(handle));

    let story = StoryAsset::new("Hotspots").with_segment(segment);
    let (mut engine, segment_id) = engine_with(story);
    let sfx = count_topic(&engine, Topic::PlaySfx);

    engine.start_segment(segment_id).await.unwrap();
    assert_eq!(engine.current_node_id(), Some(tavern));

    engine
        .trigger_event(&EventTrigger::OnClick, Some("door"))
        .await
        .unwrap();
    assert_eq!(sfx.load(Ordering::SeqCst), 1);
    assert_eq!(engine.current_node_id(), Some(cellar));

    // A click on an unknown hotspot changes nothing
    engine
        .trigger_event(&EventTrigger::OnClick, Some("window"))
        .await
        .unwrap();
    assert_eq!(engine.current_node_id(), Some(cellar));
}

#[tokio::test]
async fn guarded_event_does_not_fire_when_its_condition_fails() {
    let mut event = NodeEvent::new(EventTrigger::OnClick, "secret")
        .with_target("shelf")
        .with_guard(Guard::Legacy("found_key".into()));
    event.label = "secret door".into();
    let handle = event.id.clone();

    let mut segment = SegmentAsset::new("Study");
    let study = segment
        .insert_root(NarrativeNode::location("Study", "study.png").with_event(event))
        .unwrap();
    let vault = segment
        .insert_node(NarrativeNode::location("Vault", "vault.png"))
        .unwrap();
    segment.add_edge(Edge::new(study, vault).with_handle(handle));

    let story = StoryAsset::new("Secrets")
        .with_segment(segment)
        .with_attribute(AttributeDefinition::boolean("found_key", false));
    let (mut engine, segment_id) = engine_with(story);
    engine.start_segment(segment_id).await.unwrap();

    engine
        .trigger_event(&EventTrigger::OnClick, Some("shelf"))
        .await
        .unwrap();
    assert_eq!(engine.current_node_id(), Some(study));
}

#[tokio::test]
async fn jump_action_is_applied_through_the_mailbox() {
    let mut segment = SegmentAsset::new("Warp");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let field = segment
        .insert_node(NarrativeNode::location("Field", "field.png"))
        .unwrap();
    let shrine = segment
        .insert_node(NarrativeNode::location("Shrine", "shrine.png"))
        .unwrap();
    let warp = segment
        .insert_node(NarrativeNode::action(
            "Warp",
            vec![ActionDef::new(ActionBody::JumpTo { target: shrine })],
        ))
        .unwrap();
    segment.add_edge(Edge::new(start, field));
    segment.add_edge(Edge::new(field, warp));

    let story = StoryAsset::new("Warping").with_segment(segment);
    let (mut engine, segment_id) = engine_with(story);

    engine.start_segment(segment_id).await.unwrap();
    assert_eq!(engine.current_node_id(), Some(field));

    // The warp node queues the jump; the engine applies it after the
    // advance settles
    let settled = engine.advance(None).await.unwrap();
    assert_eq!(settled, Some(field));
    assert_eq!(engine.current_node_id(), Some(shrine));
}

#[tokio::test]
async fn on_enter_events_fire_with_each_entry() {
    let mut event = NodeEvent::new(EventTrigger::OnEnter, "ambience");
    event.label = "ambience".into();
    let handle = event.id.clone();

    let mut segment = SegmentAsset::new("Tavern");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let tavern = segment
        .insert_node(NarrativeNode::location("Tavern", "tavern.png").with_event(event))
        .unwrap();
    let hum = segment
        .insert_node(NarrativeNode::action(
            "Hum",
            vec![ActionDef::new(ActionBody::PlaySfx {
                sound: "hum.ogg".into(),
                volume: 0.3,
            })],
        ))
        .unwrap();
    segment.add_edge(Edge::new(start, tavern));
    segment.add_edge(Edge::new(tavern, hum).with_handle(handle));

    let story = StoryAsset::new("Ambience").with_segment(segment);
    let (mut engine, segment_id) = engine_with(story);
    let sfx = count_topic(&engine, Topic::PlaySfx);

    let settled = engine.start_segment(segment_id).await.unwrap();
    assert_eq!(settled, Some(tavern));
    assert_eq!(sfx.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn attribute_change_is_observable_after_an_action_node() {
    let hp = AttributeDefinition::number("hp", 100.0).with_range(0.0, 100.0);
    let hp_id = hp.id;

    let mut segment = SegmentAsset::new("Trap");
    let start = segment.insert_root(NarrativeNode::start()).unwrap();
    let spikes = segment
        .insert_node(NarrativeNode::action(
            "Spikes",
            vec![ActionDef::new(ActionBody::ModifyAttribute {
                attribute: hp_id,
                op: faden_core::AttributeOp::Sub,
                value: 40.0,
            })],
        ))
        .unwrap();
    let corridor = segment
        .insert_node(NarrativeNode::location("Corridor", "corridor.png"))
        .unwrap();
    segment.add_edge(Edge::new(start, spikes));
    segment.add_edge(Edge::new(spikes, corridor));

    let story = StoryAsset::new("Traps")
        .with_segment(segment)
        .with_attribute(hp);
    let (mut engine, segment_id) = engine_with(story);
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    engine.bus().on(Topic::AttributeChanged, move |event| {
        if let Event::AttributeChanged { key, value, .. } = event {
            sink.lock().unwrap().push((key.clone(), value.clone()));
        }
        Ok(())
    });

    engine.start_segment(segment_id).await.unwrap();
    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].0, "hp");
    assert_eq!(changes[0].1, faden_core::Value::Number(60.0));
}
