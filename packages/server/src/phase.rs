use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::SchedulerConfig;
use common::{Clock, HackathonStatus, LifecyclePhase, compute_phase};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::entity::hackathon;

/// Result of recomputing one hackathon's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseRefresh {
    pub hackathon_id: i32,
    pub phase: LifecyclePhase,
    pub changed: bool,
}

/// The phase a hackathon is in at `now`.
///
/// Once results are published the phase is pinned to `Ended`, whatever the
/// windows say.
pub fn effective_phase(hackathon: &hackathon::Model, now: DateTime<Utc>) -> LifecyclePhase {
    if hackathon.status.is_final() {
        return LifecyclePhase::Ended;
    }
    compute_phase(&hackathon.windows(), now)
}

/// Persist the derived phase when it differs from the stored one.
///
/// The write is a bare column update: `updated_at` and any other change
/// tracking are left alone. Concurrent callers converge on the same value.
pub async fn refresh_phase<C: ConnectionTrait>(
    conn: &C,
    hackathon: &hackathon::Model,
    now: DateTime<Utc>,
) -> Result<PhaseRefresh, DbErr> {
    let phase = effective_phase(hackathon, now);

    if phase == hackathon.lifecycle_phase {
        debug!(hackathon_id = hackathon.id, %phase, "Phase unchanged");
        return Ok(PhaseRefresh {
            hackathon_id: hackathon.id,
            phase,
            changed: false,
        });
    }

    let result = hackathon::Entity::update_many()
        .set(hackathon::ActiveModel {
            lifecycle_phase: Set(phase),
            ..Default::default()
        })
        .filter(hackathon::Column::Id.eq(hackathon.id))
        .filter(hackathon::Column::LifecyclePhase.ne(phase))
        .exec(conn)
        .await?;

    let changed = result.rows_affected > 0;
    if changed {
        info!(
            hackathon_id = hackathon.id,
            from = %hackathon.lifecycle_phase,
            to = %phase,
            "Lifecycle phase changed"
        );
    }

    Ok(PhaseRefresh {
        hackathon_id: hackathon.id,
        phase,
        changed,
    })
}

/// Summary of one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub scanned: usize,
    pub changed: usize,
    pub failed: usize,
}

/// Refresh every hackathon whose results are not yet published.
///
/// A stored `Ended` phase is still revisited: moving `judging_end` later
/// reopens judging.
pub async fn refresh_all_phases(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<RefreshSummary, DbErr> {
    let hackathons = hackathon::Entity::find()
        .filter(hackathon::Column::Status.ne(HackathonStatus::ResultsPublished))
        .all(db)
        .await?;

    let mut summary = RefreshSummary {
        scanned: hackathons.len(),
        ..Default::default()
    };

    for model in &hackathons {
        match refresh_phase(db, model, now).await {
            Ok(refresh) if refresh.changed => summary.changed += 1,
            Ok(_) => {}
            Err(e) => {
                summary.failed += 1;
                error!(hackathon_id = model.id, error = %e, "Failed to refresh phase");
            }
        }
    }

    Ok(summary)
}

/// Run the phase refresher as a background task.
pub async fn run_phase_scheduler(
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
) {
    info!(
        interval_secs = config.phase_refresh_interval_secs,
        "Starting phase scheduler"
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.phase_refresh_interval_secs.max(1)));

    loop {
        interval.tick().await;

        match refresh_all_phases(&db, clock.now()).await {
            Ok(summary) if summary.changed > 0 || summary.failed > 0 => info!(
                scanned = summary.scanned,
                changed = summary.changed,
                failed = summary.failed,
                "Phase refresh pass complete"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Phase refresh pass failed"),
        }
    }
}
