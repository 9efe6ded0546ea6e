use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use common::event::{RESULTS_PUBLISHED, ResultsPublished};
use common::hook::Hook;
use common::{NotificationCategory, NotifyOutcome};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use tracing::{error, info};

use super::ListenerContext;
use crate::certificate::position_label;
use crate::entity::{hackathon, sponsor, submission, team, team_member, user};
use crate::notification::template::{RESULTS_PARTICIPANT, RESULTS_SPONSOR, RESULTS_TEAM_LEAD};

/// Notifies every team member who is not a team lead.
pub struct ParticipantsListener;
/// Notifies each team's lead.
pub struct TeamLeadsListener;
/// Notifies sponsor contacts.
pub struct SponsorsListener;

#[derive(Debug, Clone)]
struct Recipient {
    name: String,
    email: String,
    team_name: Option<String>,
    position: Option<u8>,
}

#[derive(Debug, Clone)]
struct Placement {
    position: u8,
    team_name: String,
    submission_title: String,
    average_score: f64,
}

/// Committed results of one hackathon, as seen by the listeners.
struct ResultsSnapshot {
    hackathon: hackathon::Model,
    teams: Vec<team::Model>,
    members: HashMap<i32, Vec<user::Model>>,
    users: HashMap<i32, user::Model>,
    placements: Vec<Placement>,
    positions: HashMap<i32, u8>,
    sponsors: Vec<sponsor::Model>,
}

impl ResultsSnapshot {
    async fn load(db: &DatabaseConnection, hackathon_id: i32) -> anyhow::Result<Self> {
        let hackathon = hackathon::Entity::find_by_id(hackathon_id)
            .one(db)
            .await?
            .ok_or_else(|| anyhow!("Hackathon {hackathon_id} not found"))?;

        let teams = team::Entity::find()
            .filter(team::Column::HackathonId.eq(hackathon_id))
            .order_by_asc(team::Column::Id)
            .all(db)
            .await?;
        let team_ids: Vec<i32> = teams.iter().map(|t| t.id).collect();
        let team_names: HashMap<i32, String> =
            teams.iter().map(|t| (t.id, t.name.clone())).collect();

        let memberships = team_member::Entity::find()
            .filter(team_member::Column::TeamId.is_in(team_ids))
            .order_by_asc(team_member::Column::UserId)
            .all(db)
            .await?;
        let mut user_ids: Vec<i32> = memberships.iter().map(|m| m.user_id).collect();
        user_ids.extend(teams.iter().map(|t| t.leader_id));

        let users: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut members: HashMap<i32, Vec<user::Model>> = HashMap::new();
        for membership in &memberships {
            if let Some(member) = users.get(&membership.user_id) {
                members
                    .entry(membership.team_id)
                    .or_default()
                    .push(member.clone());
            }
        }

        let winners = submission::Entity::find()
            .filter(submission::Column::HackathonId.eq(hackathon_id))
            .filter(submission::Column::IsWinner.eq(true))
            .order_by_asc(submission::Column::WinnerPosition)
            .all(db)
            .await?;

        let mut placements = Vec::with_capacity(winners.len());
        let mut positions = HashMap::new();
        for winner in &winners {
            let Some(position) = winner.winner_position.and_then(|p| u8::try_from(p).ok()) else {
                continue;
            };
            positions.insert(winner.team_id, position);
            placements.push(Placement {
                position,
                team_name: team_names.get(&winner.team_id).cloned().unwrap_or_default(),
                submission_title: winner.title.clone(),
                average_score: winner.average_score.unwrap_or_default(),
            });
        }

        let sponsors = sponsor::Entity::find()
            .filter(sponsor::Column::HackathonId.eq(hackathon_id))
            .order_by_asc(sponsor::Column::Id)
            .all(db)
            .await?;

        Ok(Self {
            hackathon,
            teams,
            members,
            users,
            placements,
            positions,
            sponsors,
        })
    }

    fn participants(&self) -> Vec<Recipient> {
        self.teams
            .iter()
            .flat_map(|team| {
                self.members
                    .get(&team.id)
                    .into_iter()
                    .flatten()
                    .filter(move |member| member.id != team.leader_id)
                    .map(move |member| self.team_recipient(team, member))
            })
            .collect()
    }

    fn team_leads(&self) -> Vec<Recipient> {
        self.teams
            .iter()
            .filter_map(|team| {
                let leader = self.users.get(&team.leader_id)?;
                Some(self.team_recipient(team, leader))
            })
            .collect()
    }

    fn sponsor_contacts(&self) -> Vec<Recipient> {
        self.sponsors
            .iter()
            .map(|s| Recipient {
                name: s.name.clone(),
                email: s.contact_email.clone(),
                team_name: None,
                position: None,
            })
            .collect()
    }

    fn team_recipient(&self, team: &team::Model, member: &user::Model) -> Recipient {
        Recipient {
            name: member.name.clone(),
            email: member.email.clone(),
            team_name: Some(team.name.clone()),
            position: self.positions.get(&team.id).copied(),
        }
    }

    fn context(&self, recipient: &Recipient) -> serde_json::Value {
        let winners: Vec<serde_json::Value> = self
            .placements
            .iter()
            .map(|p| {
                json!({
                    "position": p.position,
                    "team_name": p.team_name,
                    "submission_title": p.submission_title,
                    "average_score": format!("{:.2}", p.average_score),
                })
            })
            .collect();

        json!({
            "recipient_name": recipient.name,
            "hackathon_title": self.hackathon.title,
            "team_name": recipient.team_name,
            "position_label": recipient.position.map(position_label),
            "winners": winners,
        })
    }
}

/// Render and gate one message per recipient. Every recipient is attempted;
/// the error summarises the ones that did not go out.
async fn deliver(
    ctx: &ListenerContext,
    snapshot: &ResultsSnapshot,
    category: NotificationCategory,
    template: &str,
    subject: &str,
    recipients: Vec<Recipient>,
) -> anyhow::Result<()> {
    let hackathon_id = snapshot.hackathon.id;
    let total = recipients.len();
    let mut failed = 0usize;

    for recipient in &recipients {
        let body = match ctx.renderer.render(template, &snapshot.context(recipient)) {
            Ok(body) => body,
            Err(e) => {
                failed += 1;
                error!(
                    hackathon_id,
                    template = %template,
                    recipient = %recipient.email,
                    error = %e,
                    "Failed to render notification"
                );
                continue;
            }
        };

        match ctx
            .gate
            .notify(category, Some(hackathon_id), &recipient.email, subject, &body)
            .await
        {
            Ok(NotifyOutcome::Failed) => failed += 1,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                error!(
                    hackathon_id,
                    recipient = %recipient.email,
                    error = %e,
                    "Failed to record notification"
                );
            }
        }
    }

    info!(
        hackathon_id,
        category = %category,
        total,
        failed,
        "Results notifications processed"
    );

    if failed > 0 {
        return Err(anyhow!("{failed} of {total} {category} notifications failed"));
    }
    Ok(())
}

#[async_trait]
impl Hook<ResultsPublished> for ParticipantsListener {
    type Context = ListenerContext;

    fn id(&self) -> &str {
        "results_participants"
    }

    fn topics(&self) -> &[&str] {
        &[RESULTS_PUBLISHED]
    }

    async fn on_event(&self, ctx: ListenerContext, e: &ResultsPublished) -> anyhow::Result<()> {
        let snapshot = ResultsSnapshot::load(&ctx.db, e.hackathon_id).await?;
        let subject = format!("Results for {}", snapshot.hackathon.title);
        let recipients = snapshot.participants();
        deliver(
            &ctx,
            &snapshot,
            NotificationCategory::ResultsParticipant,
            RESULTS_PARTICIPANT,
            &subject,
            recipients,
        )
        .await
    }
}

#[async_trait]
impl Hook<ResultsPublished> for TeamLeadsListener {
    type Context = ListenerContext;

    fn id(&self) -> &str {
        "results_team_leads"
    }

    fn topics(&self) -> &[&str] {
        &[RESULTS_PUBLISHED]
    }

    async fn on_event(&self, ctx: ListenerContext, e: &ResultsPublished) -> anyhow::Result<()> {
        let snapshot = ResultsSnapshot::load(&ctx.db, e.hackathon_id).await?;
        let subject = format!("Results for {}", snapshot.hackathon.title);
        let recipients = snapshot.team_leads();
        deliver(
            &ctx,
            &snapshot,
            NotificationCategory::ResultsTeamLead,
            RESULTS_TEAM_LEAD,
            &subject,
            recipients,
        )
        .await
    }
}

#[async_trait]
impl Hook<ResultsPublished> for SponsorsListener {
    type Context = ListenerContext;

    fn id(&self) -> &str {
        "results_sponsors"
    }

    fn topics(&self) -> &[&str] {
        &[RESULTS_PUBLISHED]
    }

    async fn on_event(&self, ctx: ListenerContext, e: &ResultsPublished) -> anyhow::Result<()> {
        let snapshot = ResultsSnapshot::load(&ctx.db, e.hackathon_id).await?;
        let subject = format!("Winners of {}", snapshot.hackathon.title);
        let recipients = snapshot.sponsor_contacts();
        deliver(
            &ctx,
            &snapshot,
            NotificationCategory::ResultsSponsor,
            RESULTS_SPONSOR,
            &subject,
            recipients,
        )
        .await
    }
}
