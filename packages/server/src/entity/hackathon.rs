use common::{HackathonStatus, LifecyclePhase, PhaseWindows};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hackathon")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown

    /// Editorial state, set by organisers and by finalization.
    #[sea_orm(indexed)]
    pub status: HackathonStatus,
    /// Last persisted output of the phase engine.
    pub lifecycle_phase: LifecyclePhase,

    pub team_joining_start: Option<DateTimeUtc>,
    pub team_joining_end: Option<DateTimeUtc>,
    pub mentor_assignment_start: Option<DateTimeUtc>,
    pub mentor_assignment_end: Option<DateTimeUtc>,
    pub submission_start: Option<DateTimeUtc>,
    pub submission_end: Option<DateTimeUtc>,
    #[sea_orm(default_value = 24)]
    pub submission_judging_gap_hours: i32,
    pub judging_start: Option<DateTimeUtc>,
    pub judging_end: Option<DateTimeUtc>,
    pub winner_announcement: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub teams: HasMany<super::team::Entity>,

    #[sea_orm(has_many)]
    pub sponsors: HasMany<super::sponsor::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn windows(&self) -> PhaseWindows {
        PhaseWindows {
            team_joining_start: self.team_joining_start,
            team_joining_end: self.team_joining_end,
            mentor_assignment_start: self.mentor_assignment_start,
            mentor_assignment_end: self.mentor_assignment_end,
            submission_start: self.submission_start,
            submission_end: self.submission_end,
            submission_judging_gap_hours: u32::try_from(self.submission_judging_gap_hours)
                .unwrap_or(common::lifecycle::DEFAULT_GAP_HOURS),
            judging_start: self.judging_start,
            judging_end: self.judging_end,
            winner_announcement: self.winner_announcement,
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
