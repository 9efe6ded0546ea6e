use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use common::Clock;
use common::config::AnnouncementConfig;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use tracing::{info, warn};

use crate::entity::announcement;
use crate::error::PublishError;

/// Announcement content before a slug is assigned.
#[derive(Debug, Clone)]
pub struct AnnouncementDraft {
    pub hackathon_id: Option<i32>,
    pub title: String,
    pub body: String,
    /// Preferred slug. Suffixed with `-1`, `-2`, ... when taken.
    pub slug_base: String,
}

#[async_trait]
pub trait AnnouncementPublisher: Send + Sync {
    async fn publish(&self, draft: AnnouncementDraft) -> Result<announcement::Model, PublishError>;
}

pub struct DbAnnouncementPublisher {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    config: AnnouncementConfig,
}

impl DbAnnouncementPublisher {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>, config: AnnouncementConfig) -> Self {
        Self { db, clock, config }
    }

    async fn slug_taken(&self, slug: &str) -> Result<bool, PublishError> {
        let count = announcement::Entity::find()
            .filter(announcement::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl AnnouncementPublisher for DbAnnouncementPublisher {
    async fn publish(&self, draft: AnnouncementDraft) -> Result<announcement::Model, PublishError> {
        let base = slugify(&draft.slug_base);

        for attempt in 0..self.config.max_slug_attempts {
            let slug = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };

            if self.slug_taken(&slug).await? {
                continue;
            }

            let model = announcement::ActiveModel {
                title: Set(draft.title.clone()),
                slug: Set(slug.clone()),
                body: Set(draft.body.clone()),
                author: Set(self.config.author.clone()),
                hackathon_id: Set(draft.hackathon_id),
                published_at: Set(self.clock.now()),
                ..Default::default()
            };

            match model.insert(&self.db).await {
                Ok(inserted) => {
                    info!(
                        slug = %inserted.slug,
                        hackathon_id = ?inserted.hackathon_id,
                        "Published announcement"
                    );
                    return Ok(inserted);
                }
                // Lost a race for this slug; try the next suffix.
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(slug = %slug, "Announcement slug taken concurrently");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PublishError::SlugCollisionExhaustion {
            base,
            attempts: self.config.max_slug_attempts,
        })
    }
}

/// Lowercase ASCII alphanumerics joined by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "announcement".to_string()
    } else {
        slug
    }
}

/// One placement line in a winners announcement.
#[derive(Debug, Clone)]
pub struct WinnerLine {
    pub position: u8,
    pub team_name: String,
    pub submission_title: String,
    pub average_score: f64,
}

/// Draft for the public "winners announced" post.
pub fn winners_draft(hackathon_id: i32, hackathon_title: &str, winners: &[WinnerLine]) -> AnnouncementDraft {
    let mut body = format!(
        "The results of **{hackathon_title}** are in. Congratulations to the winning teams!\n\n"
    );
    for winner in winners {
        let _ = writeln!(
            body,
            "{}. **{}** with *{}* (average score {:.2})",
            winner.position, winner.team_name, winner.submission_title, winner.average_score
        );
    }
    body.push_str("\nThank you to every participant, mentor, judge and sponsor.\n");

    AnnouncementDraft {
        hackathon_id: Some(hackathon_id),
        title: format!("{hackathon_title} — Winners Announced"),
        body,
        slug_base: format!("{hackathon_title}-winners"),
    }
}
