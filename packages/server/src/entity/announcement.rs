use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Public write-up, currently only the generated winner announcement.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "announcement")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub body: String, // in Markdown
    pub author: String,

    pub hackathon_id: Option<i32>,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: BelongsTo<Option<super::hackathon::Entity>>,

    pub published_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
