use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only log of send attempts, matched by `dedup_key`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_send_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Hex SHA-256 of (event_type, entity_id, recipient).
    pub dedup_key: String,

    pub event_type: String,
    pub entity_id: Option<i32>,
    pub recipient: String,
    pub subject: String,

    pub success: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
