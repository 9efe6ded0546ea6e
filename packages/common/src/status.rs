#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

/// Coarse editorial state of a hackathon, set by organisers.
///
/// Distinct from [`crate::LifecyclePhase`], which is derived from time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum HackathonStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draft"))]
    Draft,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "open"))]
    Open,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "judging"))]
    Judging,
    /// Terminal: winners are fixed and certificates issued.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "results_published"))]
    ResultsPublished,
}

impl HackathonStatus {
    pub const ALL: &'static [HackathonStatus] = &[
        Self::Draft,
        Self::Open,
        Self::Judging,
        Self::ResultsPublished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Judging => "judging",
            Self::ResultsPublished => "results_published",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::ResultsPublished)
    }
}

impl fmt::Display for HackathonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for HackathonStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl FromStr for HackathonStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                ParseEnumError::new("hackathon status", s, &valid)
            })
    }
}
