use common::{HackathonStatus, LifecyclePhase};
use serde::Serialize;
use utoipa::ToSchema;

use crate::finalize::{FinalizeReport, WinnerReport};
use crate::phase::PhaseRefresh;

#[derive(Serialize, ToSchema)]
pub struct PhaseResponse {
    pub hackathon_id: i32,
    /// Phase derived from the windows at request time.
    #[schema(example = "submission")]
    pub phase: LifecyclePhase,
    /// Phase persisted before this request.
    #[schema(example = "mentor_assignment")]
    pub stored_phase: LifecyclePhase,
    #[schema(example = "open")]
    pub status: HackathonStatus,
}

#[derive(Serialize, ToSchema)]
pub struct PhaseRefreshResponse {
    pub hackathon_id: i32,
    #[schema(example = "judging")]
    pub phase: LifecyclePhase,
    /// Whether the stored phase was rewritten.
    pub changed: bool,
}

impl From<PhaseRefresh> for PhaseRefreshResponse {
    fn from(r: PhaseRefresh) -> Self {
        Self {
            hackathon_id: r.hackathon_id,
            phase: r.phase,
            changed: r.changed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct WinnerResponse {
    pub submission_id: i32,
    pub team_id: i32,
    pub team_name: String,
    /// 1, 2 or 3.
    pub position: u8,
    pub average_score: f64,
    /// Certificate numbers issued to the team's members.
    pub certificates: Vec<String>,
}

impl From<WinnerReport> for WinnerResponse {
    fn from(w: WinnerReport) -> Self {
        Self {
            submission_id: w.submission_id,
            team_id: w.team_id,
            team_name: w.team_name,
            position: w.position,
            average_score: w.average_score,
            certificates: w.certificates,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FinalizeResponse {
    pub hackathon_id: i32,
    pub winners: Vec<WinnerResponse>,
    /// Slug of the published announcement, absent if publishing failed.
    pub announcement_slug: Option<String>,
}

impl From<FinalizeReport> for FinalizeResponse {
    fn from(r: FinalizeReport) -> Self {
        Self {
            hackathon_id: r.hackathon_id,
            winners: r.winners.into_iter().map(WinnerResponse::from).collect(),
            announcement_slug: r.announcement_slug,
        }
    }
}
