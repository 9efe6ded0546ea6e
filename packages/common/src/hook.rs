use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::{collections::HashMap, sync::Arc};

use crate::event::{Event, GenericEvent};

/// Typed listener for one event type.
#[async_trait]
pub trait Hook<E: Event>: Send + Sync {
    type Context: Clone + Send + Sync + 'static;

    /// Hook identifier
    fn id(&self) -> &str;
    /// Get the topics this hook is interested in
    fn topics(&self) -> &[&str];

    async fn on_event(&self, ctx: Self::Context, e: &E) -> Result<()>;
}

/// Type-erased hook, as stored in the registry.
#[async_trait]
pub trait GenericHook: Send + Sync {
    type Context: Clone + Send + Sync + 'static;

    fn id(&self) -> &str;
    fn topics(&self) -> &[&str];

    async fn on_event(&self, ctx: Self::Context, e: &GenericEvent) -> Result<()>;
}

/// Adapter to convert typed Hook<E> into GenericHook
struct HookAdapter<E: Event, H: Hook<E>> {
    hook: H,
    _phantom: std::marker::PhantomData<fn(E)>,
}

#[async_trait]
impl<E: Event + 'static, H: Hook<E>> GenericHook for HookAdapter<E, H> {
    type Context = H::Context;

    fn id(&self) -> &str {
        self.hook.id()
    }
    fn topics(&self) -> &[&str] {
        self.hook.topics()
    }
    async fn on_event(&self, ctx: H::Context, generic_event: &GenericEvent) -> Result<()> {
        let typed_event: E = E::from_generic_event(generic_event)?;
        self.hook.on_event(ctx, &typed_event).await
    }
}

/// Outcome of one hook for one triggered event.
#[derive(Debug, Clone)]
pub struct HookReport {
    pub hook_id: String,
    pub error: Option<String>,
}

impl HookReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Topic-keyed registry of hooks. All hooks share the registry's context.
#[derive(Clone)]
pub struct HookRegistry<C: Clone + Send + Sync + 'static> {
    ctx: C,
    hooks: HashMap<String, Vec<Arc<dyn GenericHook<Context = C>>>>,
}

impl<C: Clone + Send + Sync + 'static> HookRegistry<C> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            hooks: HashMap::new(),
        }
    }

    /// Add a typed hook to the registry
    pub fn add_hook<E: Event + 'static, H: Hook<E, Context = C> + 'static>(&mut self, hook: H) {
        let adapter: Arc<dyn GenericHook<Context = C>> = Arc::new(HookAdapter::<E, H> {
            hook,
            _phantom: std::marker::PhantomData,
        });

        for &topic in adapter.topics() {
            self.hooks
                .entry(topic.to_string())
                .or_default()
                .push(adapter.clone());
        }
    }

    /// Number of hooks listening on `topic`.
    pub fn hook_count(&self, topic: &str) -> usize {
        self.hooks.get(topic).map(Vec::len).unwrap_or(0)
    }

    /// Run every hook registered for the event's topic.
    ///
    /// Hooks run concurrently and independently: a failing hook is reported,
    /// never short-circuits the others.
    pub async fn trigger<E: Event>(&self, event: &E) -> Vec<HookReport> {
        let Some(hooks) = self.hooks.get(event.topic()) else {
            return Vec::new();
        };

        let generic_event = event.to_generic_event();
        let runs = hooks.iter().map(|hook| {
            let ctx = self.ctx.clone();
            let generic_event = &generic_event;
            async move {
                let result = hook.on_event(ctx, generic_event).await;
                HookReport {
                    hook_id: hook.id().to_string(),
                    error: result.err().map(|e| format!("{e:#}")),
                }
            }
        });

        join_all(runs).await
    }
}
