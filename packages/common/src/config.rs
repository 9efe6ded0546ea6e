use serde::Deserialize;

use crate::notification::NotificationCategory;

/// Notification gate configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Non-critical categories that may be sent. Critical categories are
    /// always enabled. Default: every results category.
    #[serde(default = "default_enabled_categories")]
    pub enabled_categories: Vec<NotificationCategory>,
    /// How long a recorded send suppresses repeats. Default: 24.
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: u32,
    /// Whether critical categories skip the dedup check. Default: true.
    #[serde(default = "default_critical_bypass_dedup")]
    pub critical_bypass_dedup: bool,
    /// When set, messages are POSTed to this URL instead of only being logged.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_enabled_categories() -> Vec<NotificationCategory> {
    vec![
        NotificationCategory::ResultsParticipant,
        NotificationCategory::ResultsTeamLead,
        NotificationCategory::ResultsSponsor,
    ]
}
fn default_dedup_window_hours() -> u32 {
    24
}
fn default_critical_bypass_dedup() -> bool {
    true
}

impl NotificationConfig {
    pub fn is_enabled(&self, category: NotificationCategory) -> bool {
        category.is_critical() || self.enabled_categories.contains(&category)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled_categories: default_enabled_categories(),
            dedup_window_hours: default_dedup_window_hours(),
            critical_bypass_dedup: default_critical_bypass_dedup(),
            webhook_url: None,
        }
    }
}

/// Background phase recomputation.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Default: true.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Default: 60.
    #[serde(default = "default_phase_refresh_interval_secs")]
    pub phase_refresh_interval_secs: u64,
}

fn default_scheduler_enabled() -> bool {
    true
}
fn default_phase_refresh_interval_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            phase_refresh_interval_secs: default_phase_refresh_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CertificateConfig {
    /// Leading segment of every certificate number. Default: "CERT".
    #[serde(default = "default_certificate_prefix")]
    pub prefix: String,
    /// Upper bound on numbering attempts for one certificate. Default: 1000.
    #[serde(default = "default_certificate_max_attempts")]
    pub max_attempts: u32,
}

fn default_certificate_prefix() -> String {
    "CERT".into()
}
fn default_certificate_max_attempts() -> u32 {
    1000
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            prefix: default_certificate_prefix(),
            max_attempts: default_certificate_max_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnouncementConfig {
    /// Upper bound on slug suffixes tried before giving up. Default: 1000.
    #[serde(default = "default_max_slug_attempts")]
    pub max_slug_attempts: u32,
    /// Byline of generated announcements. Default: "Podium".
    #[serde(default = "default_announcement_author")]
    pub author: String,
}

fn default_max_slug_attempts() -> u32 {
    1000
}
fn default_announcement_author() -> String {
    "Podium".into()
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            max_slug_attempts: default_max_slug_attempts(),
            author: default_announcement_author(),
        }
    }
}
