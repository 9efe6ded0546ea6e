use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::config::NotificationConfig;
use common::{Clock, DedupKey, NotificationCategory, NotifyOutcome};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, Statement,
    TransactionTrait,
};
use tracing::{error, info, warn};

use super::sender::MessageSender;
use crate::entity::notification_send_record;

/// At most one send per (category, entity, recipient) inside the dedup window.
pub struct NotificationGate {
    db: DatabaseConnection,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
    config: NotificationConfig,
}

impl NotificationGate {
    pub fn new(
        db: DatabaseConnection,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            db,
            sender,
            clock,
            config,
        }
    }

    /// Send `body` to `recipient` unless an equivalent message went out
    /// recently or the category is switched off.
    ///
    /// Calls sharing a dedup key are serialized on a transaction-scoped
    /// advisory lock, so concurrent callers see each other's records.
    /// Sender failures are recorded and reported as [`NotifyOutcome::Failed`];
    /// only storage errors are returned.
    pub async fn notify(
        &self,
        category: NotificationCategory,
        entity_id: Option<i32>,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<NotifyOutcome, DbErr> {
        let key = DedupKey::compute(category, entity_id, recipient);
        let now = self.clock.now();

        let txn = self.db.begin().await?;
        lock_key(&txn, &key).await?;

        let skip_dedup = category.is_critical() && self.config.critical_bypass_dedup;
        let window = self.config.dedup_window_hours;
        if !skip_dedup && recently_recorded(&txn, &key, now, window).await? {
            info!(
                dedup_key = %key,
                category = %category,
                recipient = %recipient,
                "Duplicate notification suppressed"
            );
            return Ok(NotifyOutcome::Suppressed);
        }

        if !self.config.is_enabled(category) {
            warn!(category = %category, recipient = %recipient, "Notification category disabled");
            return Ok(NotifyOutcome::Disabled);
        }

        let (outcome, error_message) = match self.sender.send(recipient, subject, body).await {
            Ok(()) => {
                info!(
                    dedup_key = %key,
                    category = %category,
                    recipient = %recipient,
                    "Notification sent"
                );
                (NotifyOutcome::Sent, None)
            }
            Err(e) => {
                error!(
                    dedup_key = %key,
                    category = %category,
                    recipient = %recipient,
                    error = %e,
                    "Notification send failed"
                );
                (NotifyOutcome::Failed, Some(e.to_string()))
            }
        };

        notification_send_record::ActiveModel {
            dedup_key: Set(key.as_str().to_string()),
            event_type: Set(category.as_str().to_string()),
            entity_id: Set(entity_id),
            recipient: Set(recipient.to_string()),
            subject: Set(subject.to_string()),
            success: Set(outcome.is_sent()),
            error_message: Set(error_message),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        Ok(outcome)
    }
}

/// Held until `txn` ends.
async fn lock_key(txn: &DatabaseTransaction, key: &DedupKey) -> Result<(), DbErr> {
    txn.execute_raw(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [key.as_str().into()],
    ))
    .await?;
    Ok(())
}

async fn recently_recorded<C: ConnectionTrait>(
    conn: &C,
    key: &DedupKey,
    now: DateTime<Utc>,
    window_hours: u32,
) -> Result<bool, DbErr> {
    let since = now - Duration::hours(i64::from(window_hours));
    let count = notification_send_record::Entity::find()
        .filter(notification_send_record::Column::DedupKey.eq(key.as_str()))
        .filter(notification_send_record::Column::CreatedAt.gt(since))
        .count(conn)
        .await?;
    Ok(count > 0)
}
