use std::sync::Arc;

use common::Clock;
use sea_orm::DatabaseConnection;

use crate::announcement::DbAnnouncementPublisher;
use crate::certificate::CertificateIssuer;
use crate::config::AppConfig;
use crate::consumers::{EventBus, ListenerContext, results_registry};
use crate::finalize::ResultsFinalizer;
use crate::notification::{
    HandlebarsRenderer, LogSender, MessageSender, NotificationGate, WebhookSender,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<NotificationGate>,
    pub finalizer: Arc<ResultsFinalizer>,
}

impl AppState {
    /// Wire the results core with the sender chosen by configuration.
    pub fn build(
        db: DatabaseConnection,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let sender: Arc<dyn MessageSender> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookSender::new(url.clone())?),
            None => Arc::new(LogSender),
        };
        Self::with_sender(db, config, clock, sender)
    }

    pub fn with_sender(
        db: DatabaseConnection,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        sender: Arc<dyn MessageSender>,
    ) -> anyhow::Result<Self> {
        let gate = Arc::new(NotificationGate::new(
            db.clone(),
            sender,
            clock.clone(),
            config.notifications.clone(),
        ));

        let events = EventBus::new(results_registry(ListenerContext {
            db: db.clone(),
            gate: gate.clone(),
            renderer: Arc::new(HandlebarsRenderer::new()?),
        }));

        let finalizer = Arc::new(ResultsFinalizer::new(
            db.clone(),
            Arc::new(CertificateIssuer::new(
                clock.clone(),
                config.certificates.clone(),
            )),
            Arc::new(DbAnnouncementPublisher::new(
                db.clone(),
                clock.clone(),
                config.announcements.clone(),
            )),
            events,
            clock.clone(),
        ));

        Ok(Self {
            db,
            config: Arc::new(config),
            clock,
            gate,
            finalizer,
        })
    }
}
