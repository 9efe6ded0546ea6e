use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{certificate, notification_send_record};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("podium_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure the composite indexes schema-sync cannot express exist.
///
/// The certificate identity index is load-bearing: issuance relies on it to
/// never hand the same person two certificates for one placement.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let identity = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_certificate_hackathon_user_position")
        .table(certificate::Entity)
        .col(certificate::Column::HackathonId)
        .col(certificate::Column::UserId)
        .col(certificate::Column::WinnerPosition)
        .to_owned();
    create_index(db, "uq_certificate_hackathon_user_position", identity, true).await?;

    // SELECT ... FROM notification_send_record WHERE dedup_key = ? AND created_at > ?
    let dedup = Index::create()
        .if_not_exists()
        .name("idx_notification_dedup_created")
        .table(notification_send_record::Entity)
        .col(notification_send_record::Column::DedupKey)
        .col(notification_send_record::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_notification_dedup_created", dedup, false).await?;

    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    stmt: IndexCreateStatement,
    required: bool,
) -> Result<(), DbErr> {
    match db.execute_unprepared(&stmt.to_string(PostgresQueryBuilder)).await {
        Ok(_) => {
            info!(index = %name, "Ensured index exists");
            Ok(())
        }
        Err(e) if required => Err(e),
        Err(e) => {
            warn!(index = %name, error = %e, "Failed to create index");
            Ok(())
        }
    }
}
