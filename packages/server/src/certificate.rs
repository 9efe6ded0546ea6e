use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Clock;
use common::config::CertificateConfig;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, ExprTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::entity::certificate::{self, CertificateData};
use crate::error::CertificateError;
use crate::models::shared::escape_like;

/// One certificate to hand out.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub hackathon_id: i32,
    pub submission_id: i32,
    pub team_id: i32,
    pub user_id: i32,
    pub winner_position: u8,
    pub data: CertificateData,
}

#[derive(Debug, Clone)]
pub struct Issuance {
    pub certificate: certificate::Model,
    /// The person already held a certificate for this placement.
    pub reused: bool,
}

/// Issues certificates inside the caller's transaction.
#[async_trait]
pub trait IssueCertificate: Send + Sync {
    async fn issue(
        &self,
        txn: &DatabaseTransaction,
        request: IssueRequest,
    ) -> Result<Issuance, CertificateError>;
}

pub struct CertificateIssuer {
    clock: Arc<dyn Clock>,
    config: CertificateConfig,
}

impl CertificateIssuer {
    pub fn new(clock: Arc<dyn Clock>, config: CertificateConfig) -> Self {
        Self { clock, config }
    }
}

/// `1` -> `1st Place`, `2` -> `2nd Place`, ...
pub fn position_label(position: u8) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{position}{suffix} Place")
}

/// `PREFIX-YYYYMMDD-HASH8-PP`, where HASH8 is the head of
/// SHA-256(hackathon id, position, issuing instant).
pub fn candidate_number(
    prefix: &str,
    hackathon_id: i32,
    position: u8,
    at: DateTime<Utc>,
) -> String {
    let digest = Sha256::digest(format!(
        "{hackathon_id}:{position}:{}",
        at.timestamp_nanos_opt().unwrap_or_else(|| at.timestamp_micros())
    ));
    let short = hex::encode(&digest[..4]).to_uppercase();
    format!("{prefix}-{}-{short}-{position:02}", at.format("%Y%m%d"))
}

/// Smallest counter above every `base` / `base-N` already stored.
async fn next_counter<C: ConnectionTrait>(conn: &C, base: &str) -> Result<u32, DbErr> {
    let taken: Vec<String> = certificate::Entity::find()
        .select_only()
        .column(certificate::Column::CertificateNumber)
        .filter(
            Expr::col(certificate::Column::CertificateNumber)
                .like(LikeExpr::new(format!("{}%", escape_like(base))).escape('\\')),
        )
        .into_tuple()
        .all(conn)
        .await?;

    let dashed = format!("{base}-");
    let next = taken
        .iter()
        .filter_map(|number| {
            if number == base {
                Some(1)
            } else {
                number
                    .strip_prefix(&dashed)?
                    .parse::<u32>()
                    .ok()
                    .map(|n| n.saturating_add(1))
            }
        })
        .max()
        .unwrap_or(0);

    Ok(next)
}

async fn find_existing<C: ConnectionTrait>(
    conn: &C,
    request: &IssueRequest,
) -> Result<Option<certificate::Model>, DbErr> {
    certificate::Entity::find()
        .filter(certificate::Column::HackathonId.eq(request.hackathon_id))
        .filter(certificate::Column::UserId.eq(request.user_id))
        .filter(certificate::Column::WinnerPosition.eq(i32::from(request.winner_position)))
        .one(conn)
        .await
}

#[async_trait]
impl IssueCertificate for CertificateIssuer {
    async fn issue(
        &self,
        txn: &DatabaseTransaction,
        request: IssueRequest,
    ) -> Result<Issuance, CertificateError> {
        if let Some(existing) = find_existing(txn, &request).await? {
            debug!(
                certificate_number = %existing.certificate_number,
                user_id = request.user_id,
                "Reusing certificate for an unchanged placement"
            );
            return Ok(Issuance {
                certificate: existing,
                reused: true,
            });
        }

        let issued_at = self.clock.now();
        let base = candidate_number(
            &self.config.prefix,
            request.hackathon_id,
            request.winner_position,
            issued_at,
        );
        let certificate_data =
            serde_json::to_value(&request.data).map_err(|e| DbErr::Json(e.to_string()))?;

        for _ in 0..self.config.max_attempts {
            let counter = next_counter(txn, &base).await?;
            let number = if counter == 0 {
                base.clone()
            } else {
                format!("{base}-{counter}")
            };

            let model = certificate::ActiveModel {
                certificate_number: Set(number.clone()),
                hackathon_id: Set(request.hackathon_id),
                submission_id: Set(request.submission_id),
                team_id: Set(request.team_id),
                user_id: Set(request.user_id),
                winner_position: Set(i32::from(request.winner_position)),
                certificate_data: Set(certificate_data.clone()),
                issued_date: Set(issued_at),
                ..Default::default()
            };

            // A failed INSERT poisons a Postgres transaction, so each attempt
            // runs in its own savepoint.
            let savepoint = txn.begin().await?;
            match model.insert(&savepoint).await {
                Ok(inserted) => {
                    savepoint.commit().await?;
                    debug!(
                        certificate_number = %inserted.certificate_number,
                        user_id = request.user_id,
                        position = request.winner_position,
                        "Issued certificate"
                    );
                    return Ok(Issuance {
                        certificate: inserted,
                        reused: false,
                    });
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    savepoint.rollback().await?;
                    // A concurrent finalization may have issued this placement.
                    if let Some(existing) = find_existing(txn, &request).await? {
                        return Ok(Issuance {
                            certificate: existing,
                            reused: true,
                        });
                    }
                    warn!(
                        certificate_number = %number,
                        "Certificate number taken, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CertificateError::NumberSpaceExhausted {
            base,
            attempts: self.config.max_attempts,
        })
    }
}
