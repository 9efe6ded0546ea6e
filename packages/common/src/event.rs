use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Core event trait
pub trait Event: Send + Sync + Sized + Serialize + DeserializeOwned {
    /// Get the event topic (e.g., "results_published")
    fn topic(&self) -> &str;

    /// Convert event to a generic event
    fn to_generic_event(&self) -> GenericEvent {
        GenericEvent {
            topic: self.topic().to_string(),
            payload: serde_json::to_value(self).unwrap_or_default(),
        }
    }

    /// Create an event from a generic event
    fn from_generic_event(e: &GenericEvent) -> Result<Self, anyhow::Error> {
        let payload: Self = serde_json::from_value(e.payload.clone())?;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

pub const RESULTS_PUBLISHED: &str = "results_published";

/// Raised once a hackathon's winners and certificates are committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPublished {
    pub hackathon_id: i32,
    pub published_at: DateTime<Utc>,
}

impl Event for ResultsPublished {
    fn topic(&self) -> &str {
        RESULTS_PUBLISHED
    }
}
