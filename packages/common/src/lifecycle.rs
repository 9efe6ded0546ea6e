#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

/// Fine-grained, time-derived stage of a hackathon.
///
/// Variants are declared in evaluation order: the phase engine tests them
/// top-down and the first match wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Winners announced, or judging is over.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ended"))]
    Ended,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "judging"))]
    Judging,
    /// Submissions closed, judging not yet open.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "submission_judging_gap"))]
    SubmissionJudgingGap,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "submission"))]
    Submission,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "mentor_assignment"))]
    MentorAssignment,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "team_joining"))]
    TeamJoining,
    /// Nothing configured has started yet (or nothing matched).
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "upcoming"))]
    Upcoming,
}

impl LifecyclePhase {
    pub const ALL: &'static [LifecyclePhase] = &[
        Self::Ended,
        Self::Judging,
        Self::SubmissionJudgingGap,
        Self::Submission,
        Self::MentorAssignment,
        Self::TeamJoining,
        Self::Upcoming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ended => "ended",
            Self::Judging => "judging",
            Self::SubmissionJudgingGap => "submission_judging_gap",
            Self::Submission => "submission",
            Self::MentorAssignment => "mentor_assignment",
            Self::TeamJoining => "team_joining",
            Self::Upcoming => "upcoming",
        }
    }

    /// `Ended` is the only phase a hackathon never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LifecyclePhase {
    fn default() -> Self {
        Self::Upcoming
    }
}

impl FromStr for LifecyclePhase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                ParseEnumError::new("lifecycle phase", s, &valid)
            })
    }
}

/// Default spacing between submission close and judging open, in hours.
pub const DEFAULT_GAP_HOURS: u32 = 24;

/// The configured time windows of a hackathon. Any of them may be absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWindows {
    pub team_joining_start: Option<DateTime<Utc>>,
    pub team_joining_end: Option<DateTime<Utc>>,
    pub mentor_assignment_start: Option<DateTime<Utc>>,
    pub mentor_assignment_end: Option<DateTime<Utc>>,
    pub submission_start: Option<DateTime<Utc>>,
    pub submission_end: Option<DateTime<Utc>>,
    /// Intended spacing between `submission_end` and `judging_start`.
    /// Informational only: it never bounds the gap phase.
    pub submission_judging_gap_hours: u32,
    pub judging_start: Option<DateTime<Utc>>,
    pub judging_end: Option<DateTime<Utc>>,
    pub winner_announcement: Option<DateTime<Utc>>,
}

impl Default for PhaseWindows {
    fn default() -> Self {
        Self {
            team_joining_start: None,
            team_joining_end: None,
            mentor_assignment_start: None,
            mentor_assignment_end: None,
            submission_start: None,
            submission_end: None,
            submission_judging_gap_hours: DEFAULT_GAP_HOURS,
            judging_start: None,
            judging_end: None,
            winner_announcement: None,
        }
    }
}

impl PhaseWindows {
    /// Where judging would open if the configured gap were honoured.
    pub fn planned_judging_start(&self) -> Option<DateTime<Utc>> {
        self.submission_end
            .map(|end| end + Duration::hours(i64::from(self.submission_judging_gap_hours)))
    }
}

/// `[start, end]`, inclusive on both ends; absent bounds never match.
fn within(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => start <= now && now <= end,
        _ => false,
    }
}

fn has_passed(instant: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    instant.is_some_and(|at| at < now)
}

/// Derive the lifecycle phase of a hackathon at `now`.
///
/// Total over every window configuration: missing windows just make their
/// rule inapplicable, and `Upcoming` is the fallback.
pub fn compute_phase(windows: &PhaseWindows, now: DateTime<Utc>) -> LifecyclePhase {
    if has_passed(windows.winner_announcement, now) || has_passed(windows.judging_end, now) {
        return LifecyclePhase::Ended;
    }

    if within(windows.judging_start, windows.judging_end, now) {
        return LifecyclePhase::Judging;
    }

    if let (Some(submission_end), Some(judging_start)) =
        (windows.submission_end, windows.judging_start)
    {
        if submission_end < now && now < judging_start {
            return LifecyclePhase::SubmissionJudgingGap;
        }
    }

    if within(windows.submission_start, windows.submission_end, now) {
        return LifecyclePhase::Submission;
    }

    if within(
        windows.mentor_assignment_start,
        windows.mentor_assignment_end,
        now,
    ) {
        return LifecyclePhase::MentorAssignment;
    }

    if within(windows.team_joining_start, windows.team_joining_end, now) {
        return LifecyclePhase::TeamJoining;
    }

    LifecyclePhase::Upcoming
}
