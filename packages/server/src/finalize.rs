use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::event::ResultsPublished;
use common::hook::HookReport;
use common::{Clock, HackathonStatus, LifecyclePhase};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::announcement::{AnnouncementPublisher, WinnerLine, winners_draft};
use crate::certificate::{IssueCertificate, IssueRequest, position_label};
use crate::consumers::EventBus;
use crate::entity::certificate::CertificateData;
use crate::entity::{hackathon, submission, team, team_member, user};
use crate::error::FinalizeError;

/// Number of placements awarded.
pub const WINNER_COUNT: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct WinnerReport {
    pub submission_id: i32,
    pub team_id: i32,
    pub team_name: String,
    pub position: u8,
    pub average_score: f64,
    /// One per team member, in user id order.
    pub certificates: Vec<String>,
}

#[derive(Debug)]
pub struct FinalizeReport {
    pub hackathon_id: i32,
    pub winners: Vec<WinnerReport>,
    /// `None` when publishing the announcement failed.
    pub announcement_slug: Option<String>,
    /// Listener run for the `ResultsPublished` event.
    pub notifications: JoinHandle<Vec<HookReport>>,
}

/// Ranks submissions, awards placements and certificates, then announces.
pub struct ResultsFinalizer {
    db: DatabaseConnection,
    issuer: Arc<dyn IssueCertificate>,
    publisher: Arc<dyn AnnouncementPublisher>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl ResultsFinalizer {
    pub fn new(
        db: DatabaseConnection,
        issuer: Arc<dyn IssueCertificate>,
        publisher: Arc<dyn AnnouncementPublisher>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            issuer,
            publisher,
            events,
            clock,
        }
    }

    /// Publish the results of a hackathon.
    ///
    /// Winner flags, certificates and the terminal status are committed
    /// together or not at all. The event and announcement run after the
    /// commit and their failures are only logged.
    pub async fn finalize_results(&self, hackathon_id: i32) -> Result<FinalizeReport, FinalizeError> {
        info!(hackathon_id, "Finalizing results");
        let now = self.clock.now();

        let txn = self.db.begin().await?;
        let (hackathon, winners) = self.commit_results(&txn, hackathon_id, now).await?;
        txn.commit().await?;

        let certificate_count: usize = winners.iter().map(|w| w.report.certificates.len()).sum();
        info!(
            hackathon_id,
            winners = winners.len(),
            certificates = certificate_count,
            "Results committed"
        );

        let notifications = self.events.emit(ResultsPublished {
            hackathon_id,
            published_at: now,
        });

        let lines: Vec<WinnerLine> = winners
            .iter()
            .map(|w| WinnerLine {
                position: w.report.position,
                team_name: w.report.team_name.clone(),
                submission_title: w.submission_title.clone(),
                average_score: w.report.average_score,
            })
            .collect();
        let announcement_slug = match self
            .publisher
            .publish(winners_draft(hackathon_id, &hackathon.title, &lines))
            .await
        {
            Ok(announcement) => Some(announcement.slug),
            Err(e) => {
                error!(hackathon_id, error = %e, "Failed to publish winners announcement");
                None
            }
        };

        Ok(FinalizeReport {
            hackathon_id,
            winners: winners.into_iter().map(|w| w.report).collect(),
            announcement_slug,
            notifications,
        })
    }

    async fn commit_results(
        &self,
        txn: &DatabaseTransaction,
        hackathon_id: i32,
        now: DateTime<Utc>,
    ) -> Result<(hackathon::Model, Vec<RankedWinner>), FinalizeError> {
        // Serializes concurrent finalizations of the same hackathon.
        let hackathon = hackathon::Entity::find_by_id(hackathon_id)
            .lock(LockType::Update)
            .one(txn)
            .await?
            .ok_or(FinalizeError::NotFound(hackathon_id))?;

        let ranked = submission::Entity::find()
            .filter(submission::Column::HackathonId.eq(hackathon_id))
            .filter(submission::Column::AverageScore.gt(0.0))
            .order_by_desc(submission::Column::AverageScore)
            .order_by_asc(submission::Column::Id)
            .limit(WINNER_COUNT)
            .all(txn)
            .await?;

        if ranked.is_empty() {
            warn!(hackathon_id, "No scored submissions, nothing to finalize");
            return Err(FinalizeError::NoScoredSubmissions(hackathon_id));
        }

        submission::Entity::update_many()
            .col_expr(submission::Column::IsWinner, Expr::value(false))
            .col_expr(submission::Column::WinnerPosition, Expr::value(Option::<i32>::None))
            .col_expr(submission::Column::UpdatedAt, Expr::value(now))
            .filter(submission::Column::HackathonId.eq(hackathon_id))
            .exec(txn)
            .await?;

        let mut winners = Vec::with_capacity(ranked.len());
        for (rank, entry) in ranked.into_iter().enumerate() {
            let position = u8::try_from(rank + 1).unwrap_or(u8::MAX);
            winners.push(self.award(txn, &hackathon, entry, position, now).await?);
        }

        hackathon::ActiveModel {
            id: Set(hackathon.id),
            status: Set(HackathonStatus::ResultsPublished),
            lifecycle_phase: Set(LifecyclePhase::Ended),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(txn)
        .await?;

        Ok((hackathon, winners))
    }

    /// Mark one submission as placed and certify every member of its team.
    async fn award(
        &self,
        txn: &DatabaseTransaction,
        hackathon: &hackathon::Model,
        entry: submission::Model,
        position: u8,
        now: DateTime<Utc>,
    ) -> Result<RankedWinner, FinalizeError> {
        submission::ActiveModel {
            id: Set(entry.id),
            is_winner: Set(true),
            winner_position: Set(Some(i32::from(position))),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(txn)
        .await?;

        let team = team::Entity::find_by_id(entry.team_id)
            .one(txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Team {} not found", entry.team_id)))?;

        let member_ids: Vec<i32> = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team.id))
            .all(txn)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let members = user::Entity::find()
            .filter(user::Column::Id.is_in(member_ids))
            .order_by_asc(user::Column::Id)
            .all(txn)
            .await?;

        let mut certificates = Vec::with_capacity(members.len());
        for member in members {
            let issuance = self
                .issuer
                .issue(
                    txn,
                    IssueRequest {
                        hackathon_id: hackathon.id,
                        submission_id: entry.id,
                        team_id: team.id,
                        user_id: member.id,
                        winner_position: position,
                        data: CertificateData {
                            hackathon_title: hackathon.title.clone(),
                            team_name: team.name.clone(),
                            recipient_name: member.name,
                            position_label: position_label(position),
                        },
                    },
                )
                .await?;
            certificates.push(issuance.certificate.certificate_number);
        }

        Ok(RankedWinner {
            submission_title: entry.title,
            report: WinnerReport {
                submission_id: entry.id,
                team_id: team.id,
                team_name: team.name,
                position,
                average_score: entry.average_score.unwrap_or_default(),
                certificates,
            },
        })
    }
}

struct RankedWinner {
    submission_title: String,
    report: WinnerReport,
}
