use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    /// Aggregate of the judges' ratings, written by the rating subsystem.
    /// NULL until judged.
    pub average_score: Option<f64>,

    #[sea_orm(default_value = false)]
    pub is_winner: bool,
    /// 1..=3 when `is_winner`.
    pub winner_position: Option<i32>,

    #[sea_orm(indexed)]
    pub hackathon_id: i32,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: HasOne<super::hackathon::Entity>,

    /// A team owns at most one submission.
    #[sea_orm(unique)]
    pub team_id: i32,
    #[sea_orm(belongs_to, from = "team_id", to = "id")]
    pub team: HasOne<super::team::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
