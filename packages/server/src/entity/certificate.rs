use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What gets printed on a certificate. Stored alongside the issuance row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    pub hackathon_title: String,
    pub team_name: String,
    pub recipient_name: String,
    /// "1st Place", "2nd Place", ...
    pub position_label: String,
}

/// Immutable proof that a user placed with a winning team.
///
/// (hackathon_id, user_id, winner_position) is unique, see `database::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "certificate")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub certificate_number: String,

    pub hackathon_id: i32,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: HasOne<super::hackathon::Entity>,

    #[sea_orm(indexed)]
    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub team_id: i32,
    #[sea_orm(belongs_to, from = "team_id", to = "id")]
    pub team: HasOne<super::team::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub winner_position: i32,

    /// Serialized [`CertificateData`].
    #[sea_orm(column_type = "JsonBinary")]
    pub certificate_data: serde_json::Value,

    pub issued_date: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
