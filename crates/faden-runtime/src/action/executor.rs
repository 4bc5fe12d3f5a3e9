//! Sequencing of action groups.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use faden_core::{ActionBody, ActionDef};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bus::Event;
use crate::engine::EngineRequest;
use crate::error::RuntimeResult;

use super::{ActionContext, ActionRegistry};

/// A snapshot of the story generation counter. The engine bumps the
/// counter on every load; work scheduled under an older snapshot is stale
/// and must not touch state.
#[derive(Debug, Clone)]
pub struct Generation {
    counter: Arc<AtomicU64>,
    snapshot: u64,
}

impl Generation {
    /// Snapshot the current generation.
    pub fn snapshot(counter: &Arc<AtomicU64>) -> Self {
        Self {
            counter: Arc::clone(counter),
            snapshot: counter.load(Ordering::SeqCst),
        }
    }

    /// Whether the snapshot still matches the live counter.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.snapshot
    }
}

/// Runs ordered action lists against the registry with each entry's
/// delay/detach/ignore-error policy.
#[derive(Debug)]
pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
}

impl ActionExecutor {
    /// Create an executor over a registry.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// Execute an action list strictly in order. Detached entries are
    /// spawned fire-and-forget and may complete after later entries; a
    /// sequential entry's failure propagates unless it is marked
    /// `ignore_error`.
    pub async fn execute_group(
        &self,
        actions: &[ActionDef],
        ctx: &ActionContext,
    ) -> RuntimeResult<()> {
        for def in actions {
            if def.detached {
                self.spawn_detached(def.clone(), ctx.clone());
                continue;
            }
            if let Some(ms) = def.delay_ms {
                sleep(Duration::from_millis(ms)).await;
                if !ctx.generation.is_current() {
                    debug!("action group became stale during delay");
                    return Ok(());
                }
            }
            if let Err(error) = run_action(&self.registry, &def.body, ctx).await {
                if def.ignore_error {
                    warn!(%error, "action failed, ignored by policy");
                } else {
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    fn spawn_detached(&self, def: ActionDef, ctx: ActionContext) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            if let Some(ms) = def.delay_ms {
                sleep(Duration::from_millis(ms)).await;
            }
            if !ctx.generation.is_current() {
                debug!("stale detached action dropped");
                return;
            }
            if let Err(error) = run_action(&registry, &def.body, &ctx).await {
                if def.ignore_error {
                    debug!(%error, "detached action failed, ignored by policy");
                } else {
                    warn!(%error, "unhandled detached action failure");
                }
            }
        });
    }
}

/// Run a single action body.
async fn run_action(
    registry: &ActionRegistry,
    body: &ActionBody,
    ctx: &ActionContext,
) -> RuntimeResult<()> {
    match body {
        ActionBody::SetAttribute { attribute, value } => {
            ctx.store.lock().set_attribute(*attribute, value.clone());
        }
        ActionBody::ModifyAttribute {
            attribute,
            op,
            value,
        } => {
            ctx.store.lock().modify_attribute(*attribute, *op, *value);
        }
        ActionBody::AddItem { item, count } => {
            ctx.store.lock().add_item(*item, *count);
        }
        ActionBody::RemoveItem { item, count } => {
            ctx.store.lock().remove_item(*item, *count);
        }
        ActionBody::AddClue { clue, character } => {
            ctx.store.lock().add_clue(*clue, *character);
        }
        ActionBody::RemoveClue { clue, character } => {
            ctx.store.lock().remove_clue(*clue, *character);
        }
        ActionBody::ShareClue { clue, from, to } => {
            ctx.store.lock().share_clue(*clue, *from, *to);
        }
        ActionBody::OpenShop { shop } => {
            ctx.bus.emit(Event::OpenShop { shop_id: *shop });
        }
        ActionBody::OpenCrafting { station } => {
            ctx.bus.emit(Event::OpenCrafting {
                station: station.clone(),
            });
        }
        ActionBody::Toast {
            message,
            duration_ms,
        } => {
            ctx.bus.emit(Event::Toast {
                message: message.clone(),
                duration_ms: *duration_ms,
            });
        }
        ActionBody::PlaySfx { sound, volume } => {
            ctx.bus.emit(Event::PlaySfx {
                sound_id: sound.clone(),
                volume: *volume,
            });
        }
        ActionBody::Shake {
            intensity,
            duration_ms,
        } => {
            ctx.bus.emit(Event::Shake {
                intensity: *intensity,
                duration_ms: *duration_ms,
            });
        }
        ActionBody::Wait { duration_ms } => {
            sleep(Duration::from_millis(*duration_ms)).await;
        }
        ActionBody::JumpTo { target } => {
            ctx.requests.push(EngineRequest::JumpTo(*target));
        }
        ActionBody::Advance => {
            ctx.requests.push(EngineRequest::Advance);
        }
        ActionBody::Custom { kind, params } => {
            let Some(handler) = registry.get(kind) else {
                warn!(kind, "unknown action kind, skipped");
                return Ok(());
            };
            if !handler.validate(params) {
                warn!(kind, "action params rejected by validate, skipped");
                return Ok(());
            }
            handler.execute(params, ctx).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionHandler, ActionScope};
    use crate::bus::EventBus;
    use crate::engine::EngineMailbox;
    use crate::error::RuntimeError;
    use crate::store::{SharedStore, VariableStore};
    use async_trait::async_trait;
    use faden_core::{AttributeDefinition, NodeId, Params, SegmentId, StoryAsset, Value};
    use std::sync::Mutex;

    fn context(registry_counter: &Arc<AtomicU64>) -> (ActionContext, StoryAsset) {
        let story = StoryAsset::new("Test")
            .with_attribute(AttributeDefinition::number("hp", 50.0).with_range(0.0, 100.0));
        let bus = Arc::new(EventBus::new());
        let mut store = VariableStore::new(Arc::clone(&bus));
        store.init(&story);
        let ctx = ActionContext {
            store: SharedStore::new(store),
            bus,
            requests: EngineMailbox::new(),
            scope: ActionScope {
                segment: SegmentId::new(),
                node: NodeId::new(),
            },
            generation: Generation::snapshot(registry_counter),
        };
        (ctx, story)
    }

    fn set_hp(story: &StoryAsset, value: f64) -> ActionDef {
        ActionDef::new(ActionBody::SetAttribute {
            attribute: story.attributes[0].id,
            value: Value::Number(value),
        })
    }

    #[tokio::test]
    async fn sequential_actions_run_in_order() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, story) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));

        executor
            .execute_group(&[set_hp(&story, 10.0), set_hp(&story, 20.0)], &ctx)
            .await
            .unwrap();

        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(20.0));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_awaited_before_running() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, story) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));

        let start = tokio::time::Instant::now();
        executor
            .execute_group(&[set_hp(&story, 10.0).with_delay_ms(500)], &ctx)
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_action_does_not_block_the_group() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, story) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));

        executor
            .execute_group(
                &[
                    set_hp(&story, 10.0).with_delay_ms(1_000).detached(),
                    set_hp(&story, 20.0),
                ],
                &ctx,
            )
            .await
            .unwrap();

        // The detached write has not landed yet
        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(20.0));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_detached_action_is_dropped() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, story) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));

        executor
            .execute_group(&[set_hp(&story, 10.0).with_delay_ms(1_000).detached()], &ctx)
            .await
            .unwrap();

        // A reload bumps the generation before the delay elapses
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(50.0));
    }

    #[tokio::test]
    async fn unknown_custom_kind_is_a_no_op() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, _) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));

        let def = ActionDef::new(ActionBody::Custom {
            kind: "teleport".into(),
            params: Params::new(),
        });
        executor.execute_group(&[def], &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn failing_validate_skips_without_error() {
        struct Picky;
        #[async_trait]
        impl ActionHandler for Picky {
            fn validate(&self, params: &Params) -> bool {
                params.get_str("target").is_some()
            }
            async fn execute(&self, _: &Params, _: &ActionContext) -> RuntimeResult<()> {
                panic!("must not run");
            }
        }

        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, _) = context(&counter);
        let mut registry = ActionRegistry::new();
        registry.register("picky", Arc::new(Picky));
        let executor = ActionExecutor::new(Arc::new(registry));

        let def = ActionDef::new(ActionBody::Custom {
            kind: "picky".into(),
            params: Params::new(),
        });
        executor.execute_group(&[def], &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn errors_propagate_unless_ignored() {
        struct Failing;
        #[async_trait]
        impl ActionHandler for Failing {
            async fn execute(&self, _: &Params, _: &ActionContext) -> RuntimeResult<()> {
                Err(RuntimeError::handler("failing", "nope"))
            }
        }

        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, story) = context(&counter);
        let mut registry = ActionRegistry::new();
        registry.register("failing", Arc::new(Failing));
        let executor = ActionExecutor::new(Arc::new(registry));

        let failing = ActionDef::new(ActionBody::Custom {
            kind: "failing".into(),
            params: Params::new(),
        });
        let result = executor
            .execute_group(&[failing.clone(), set_hp(&story, 10.0)], &ctx)
            .await;
        assert!(result.is_err());
        // The group stopped before the second action
        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(50.0));

        executor
            .execute_group(&[failing.ignoring_errors(), set_hp(&story, 10.0)], &ctx)
            .await
            .unwrap();
        assert_eq!(ctx.store.lock().value_by_key("hp"), Value::Number(10.0));
    }

    #[tokio::test]
    async fn jump_and_advance_go_through_the_mailbox() {
        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, _) = context(&counter);
        let executor = ActionExecutor::new(Arc::new(ActionRegistry::new()));
        let target = NodeId::new();

        executor
            .execute_group(
                &[
                    ActionDef::new(ActionBody::Advance),
                    ActionDef::new(ActionBody::JumpTo { target }),
                ],
                &ctx,
            )
            .await
            .unwrap();

        assert!(matches!(ctx.requests.pop(), Some(EngineRequest::Advance)));
        match ctx.requests.pop() {
            Some(EngineRequest::JumpTo(node)) => assert_eq!(node, target),
            other => panic!("expected JumpTo, got {other:?}"),
        }
        assert!(ctx.requests.pop().is_none());
    }

    #[tokio::test]
    async fn custom_handler_sees_params_and_context() {
        struct Record(Arc<Mutex<Vec<String>>>);
        #[async_trait]
        impl ActionHandler for Record {
            async fn execute(&self, params: &Params, _: &ActionContext) -> RuntimeResult<()> {
                self.0
                    .lock()
                    .unwrap()
                    .push(params.get_str("line").unwrap_or("?").to_string());
                Ok(())
            }
        }

        let counter = Arc::new(AtomicU64::new(0));
        let (ctx, _) = context(&counter);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::new();
        registry.register("record", Arc::new(Record(Arc::clone(&lines))));
        let executor = ActionExecutor::new(Arc::new(registry));

        let def = ActionDef::new(ActionBody::Custom {
            kind: "record".into(),
            params: Params::new().with("line", "hello"),
        });
        executor.execute_group(&[def], &ctx).await.unwrap();

        assert_eq!(*lines.lock().unwrap(), vec!["hello".to_string()]);
    }
}
