use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ParseEnumError;

/// Closed set of notification event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    EmailVerification,
    PasswordReset,
    SystemFailure,
    ResultsParticipant,
    ResultsTeamLead,
    ResultsSponsor,
}

impl NotificationCategory {
    pub const ALL: &'static [NotificationCategory] = &[
        Self::EmailVerification,
        Self::PasswordReset,
        Self::SystemFailure,
        Self::ResultsParticipant,
        Self::ResultsTeamLead,
        Self::ResultsSponsor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::SystemFailure => "system_failure",
            Self::ResultsParticipant => "results_participant",
            Self::ResultsTeamLead => "results_team_lead",
            Self::ResultsSponsor => "results_sponsor",
        }
    }

    /// Critical categories are always enabled, whatever the configuration says.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::EmailVerification | Self::PasswordReset | Self::SystemFailure
        )
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                ParseEnumError::new("notification category", s, &valid)
            })
    }
}

/// Deterministic identity of a notification: (event type, entity, recipient).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    /// SHA-256 over the three parts, hex encoded. Recipient addresses are
    /// compared case-insensitively.
    pub fn compute(category: NotificationCategory, entity_id: Option<i32>, recipient: &str) -> Self {
        let entity = entity_id.map(|id| id.to_string()).unwrap_or_default();
        let recipient = recipient.trim().to_lowercase();

        let mut hasher = Sha256::new();
        hasher.update(category.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(entity.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(recipient.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DedupKey({})", self.0)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the notification gate did with a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Handed to the sender, which reported success.
    Sent,
    /// A matching send was recorded inside the dedup window.
    Suppressed,
    /// The category is switched off.
    Disabled,
    /// The sender reported an error. The attempt is still recorded.
    Failed,
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}
