pub mod results_published;

pub use results_published::{ParticipantsListener, SponsorsListener, TeamLeadsListener};

use std::sync::Arc;

use common::event::{Event, ResultsPublished};
use common::hook::{HookRegistry, HookReport};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::notification::{NotificationGate, TemplateRenderer};

/// Shared by every listener in the registry.
#[derive(Clone)]
pub struct ListenerContext {
    pub db: DatabaseConnection,
    pub gate: Arc<NotificationGate>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

/// Registry with the participant, team lead and sponsor listeners.
pub fn results_registry(ctx: ListenerContext) -> HookRegistry<ListenerContext> {
    let mut registry = HookRegistry::new(ctx);
    registry.add_hook::<ResultsPublished, _>(ParticipantsListener);
    registry.add_hook::<ResultsPublished, _>(TeamLeadsListener);
    registry.add_hook::<ResultsPublished, _>(SponsorsListener);
    registry
}

/// Fire-and-forget dispatch of domain events to registered hooks.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<HookRegistry<ListenerContext>>,
}

impl EventBus {
    pub fn new(registry: HookRegistry<ListenerContext>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Run the event's hooks on a background task.
    ///
    /// Failures are logged; the handle is only useful to callers that want
    /// to wait for delivery.
    pub fn emit<E: Event + 'static>(&self, event: E) -> JoinHandle<Vec<HookReport>> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let reports = registry.trigger(&event).await;
            for report in &reports {
                match &report.error {
                    Some(e) => error!(
                        topic = %event.topic(),
                        hook = %report.hook_id,
                        error = %e,
                        "Event listener failed"
                    ),
                    None => debug!(topic = %event.topic(), hook = %report.hook_id, "Event listener done"),
                }
            }
            reports
        })
    }
}
