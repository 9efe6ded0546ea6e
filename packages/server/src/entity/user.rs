use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform account. Read-only from the results core.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(has_many, via = "team_member")]
    pub teams: HasMany<super::team::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
