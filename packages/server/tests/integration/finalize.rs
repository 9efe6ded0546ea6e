use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::{HackathonStatus, LifecyclePhase};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use podium_server::announcement::{AnnouncementDraft, AnnouncementPublisher, DbAnnouncementPublisher};
use podium_server::certificate::{CertificateIssuer, IssueCertificate, IssueRequest, Issuance};
use podium_server::consumers::{EventBus, ListenerContext, results_registry};
use podium_server::entity::certificate::CertificateData;
use podium_server::entity::{
    announcement, certificate, hackathon, notification_send_record, submission,
};
use podium_server::error::{CertificateError, FinalizeError, PublishError};
use podium_server::finalize::ResultsFinalizer;
use podium_server::notification::HandlebarsRenderer;

use crate::common::{TestEnv, create_sponsor, scored_hackathon};

/// Delegates to the real issuer except for one team.
struct FailingForTeam {
    inner: CertificateIssuer,
    team_id: i32,
}

#[async_trait]
impl IssueCertificate for FailingForTeam {
    async fn issue(
        &self,
        txn: &DatabaseTransaction,
        request: IssueRequest,
    ) -> Result<Issuance, CertificateError> {
        if request.team_id == self.team_id {
            return Err(CertificateError::Storage(DbErr::Custom(
                "injected issuance failure".into(),
            )));
        }
        self.inner.issue(txn, request).await
    }
}

/// Never finds a free slug.
struct ExhaustedPublisher;

#[async_trait]
impl AnnouncementPublisher for ExhaustedPublisher {
    async fn publish(&self, draft: AnnouncementDraft) -> Result<announcement::Model, PublishError> {
        Err(PublishError::SlugCollisionExhaustion {
            base: draft.slug_base,
            attempts: 0,
        })
    }
}

fn finalizer_with(
    env: &TestEnv,
    issuer: Arc<dyn IssueCertificate>,
    publisher: Arc<dyn AnnouncementPublisher>,
) -> ResultsFinalizer {
    let events = EventBus::new(results_registry(ListenerContext {
        db: env.db.clone(),
        gate: env.state.gate.clone(),
        renderer: Arc::new(HandlebarsRenderer::new().unwrap()),
    }));
    ResultsFinalizer::new(env.db.clone(), issuer, publisher, events, env.clock.clone())
}

fn finalizer_with_issuer(env: &TestEnv, issuer: Arc<dyn IssueCertificate>) -> ResultsFinalizer {
    let publisher = Arc::new(DbAnnouncementPublisher::new(
        env.db.clone(),
        env.clock.clone(),
        env.state.config.announcements.clone(),
    ));
    finalizer_with(env, issuer, publisher)
}

async fn submissions_of(env: &TestEnv, hackathon_id: i32) -> Vec<submission::Model> {
    submission::Entity::find()
        .filter(submission::Column::HackathonId.eq(hackathon_id))
        .order_by_asc(submission::Column::Id)
        .all(&env.db)
        .await
        .unwrap()
}

async fn certificates_of(env: &TestEnv, hackathon_id: i32) -> Vec<certificate::Model> {
    certificate::Entity::find()
        .filter(certificate::Column::HackathonId.eq(hackathon_id))
        .order_by_asc(certificate::Column::Id)
        .all(&env.db)
        .await
        .unwrap()
}

async fn reload_hackathon(env: &TestEnv, id: i32) -> hackathon::Model {
    hackathon::Entity::find_by_id(id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap()
}

mod ranking {
    use super::*;

    #[tokio::test]
    async fn ties_break_by_submission_order() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[Some(90.0), Some(90.0), Some(70.0), Some(50.0)],
            &[1, 1, 1, 1],
        )
        .await;

        let report = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();

        let placed: Vec<(i32, u8)> = report
            .winners
            .iter()
            .map(|w| (w.submission_id, w.position))
            .collect();
        assert_eq!(
            placed,
            vec![
                (h.submissions[0].id, 1),
                (h.submissions[1].id, 2),
                (h.submissions[2].id, 3),
            ]
        );

        let stored = submissions_of(&env, h.hackathon.id).await;
        let marked: Vec<(bool, Option<i32>)> =
            stored.iter().map(|s| (s.is_winner, s.winner_position)).collect();
        assert_eq!(
            marked,
            vec![
                (true, Some(1)),
                (true, Some(2)),
                (true, Some(3)),
                (false, None),
            ]
        );
    }

    #[tokio::test]
    async fn unscored_and_zero_scores_never_place() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[None, Some(0.0), Some(12.5)],
            &[1, 1, 1],
        )
        .await;

        let report = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();

        assert_eq!(report.winners.len(), 1);
        assert_eq!(report.winners[0].submission_id, h.submissions[2].id);
        assert_eq!(report.winners[0].position, 1);
        assert_eq!(report.winners[0].average_score, 12.5);
    }

    #[tokio::test]
    async fn rejects_hackathon_without_scored_submissions() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(&env.db, "Spring Hack", &[None, Some(0.0)], &[1, 1]).await;

        let err = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FinalizeError::NoScoredSubmissions(id) if id == h.hackathon.id));

        let stored = reload_hackathon(&env, h.hackathon.id).await;
        assert_eq!(stored.status, HackathonStatus::Open);
        assert!(certificates_of(&env, h.hackathon.id).await.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_hackathon() {
        let env = TestEnv::new().await;
        let err = env.state.finalizer.finalize_results(9999).await.unwrap_err();
        assert!(matches!(err, FinalizeError::NotFound(9999)));
    }
}

mod certificates {
    use super::*;

    #[tokio::test]
    async fn every_member_of_a_winning_team_is_certified() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(&env.db, "Spring Hack", &[Some(88.0)], &[3]).await;

        let report = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();

        let certs = certificates_of(&env, h.hackathon.id).await;
        assert_eq!(certs.len(), 3);
        assert!(certs.iter().all(|c| c.winner_position == 1));
        assert!(certs.iter().all(|c| c.team_id == h.teams[0].id));

        let numbers: HashSet<&str> = certs.iter().map(|c| c.certificate_number.as_str()).collect();
        assert_eq!(numbers.len(), 3);

        let holders: HashSet<i32> = certs.iter().map(|c| c.user_id).collect();
        let members: HashSet<i32> = h.members[0].iter().map(|u| u.id).collect();
        assert_eq!(holders, members);

        let data: CertificateData = serde_json::from_value(certs[0].certificate_data.clone()).unwrap();
        assert_eq!(data.hackathon_title, "Spring Hack");
        assert_eq!(data.team_name, "Team 0");
        assert_eq!(data.position_label, "1st Place");

        assert_eq!(report.winners[0].certificates.len(), 3);
    }

    #[tokio::test]
    async fn refinalizing_reuses_existing_certificates() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[Some(90.0), Some(80.0)],
            &[2, 2],
        )
        .await;
        let finalizer = &env.state.finalizer;

        let first = finalizer.finalize_results(h.hackathon.id).await.unwrap();
        let second = finalizer.finalize_results(h.hackathon.id).await.unwrap();

        assert_eq!(first.winners, second.winners);
        assert_eq!(certificates_of(&env, h.hackathon.id).await.len(), 4);

        let stored = reload_hackathon(&env, h.hackathon.id).await;
        assert_eq!(stored.status, HackathonStatus::ResultsPublished);
        assert_eq!(stored.lifecycle_phase, LifecyclePhase::Ended);
    }

    #[tokio::test]
    async fn failed_issuance_rolls_back_everything() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[Some(90.0), Some(80.0), Some(70.0)],
            &[2, 2, 2],
        )
        .await;

        let finalizer = finalizer_with_issuer(
            &env,
            Arc::new(FailingForTeam {
                inner: CertificateIssuer::new(
                    env.clock.clone(),
                    env.state.config.certificates.clone(),
                ),
                team_id: h.teams[1].id,
            }),
        );

        let err = finalizer.finalize_results(h.hackathon.id).await.unwrap_err();
        assert!(matches!(err, FinalizeError::Certificate(_)));

        let stored = submissions_of(&env, h.hackathon.id).await;
        assert!(stored.iter().all(|s| !s.is_winner && s.winner_position.is_none()));
        assert!(certificates_of(&env, h.hackathon.id).await.is_empty());

        let hackathon = reload_hackathon(&env, h.hackathon.id).await;
        assert_eq!(hackathon.status, HackathonStatus::Open);
        assert_ne!(hackathon.lifecycle_phase, LifecyclePhase::Ended);

        assert_eq!(announcement::Entity::find().count(&env.db).await.unwrap(), 0);
        assert!(env.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_refinalization_keeps_the_previous_results() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[Some(90.0), Some(80.0), Some(70.0)],
            &[1, 1, 1],
        )
        .await;

        env.state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();
        let before = certificates_of(&env, h.hackathon.id).await;

        let finalizer = finalizer_with_issuer(
            &env,
            Arc::new(FailingForTeam {
                inner: CertificateIssuer::new(
                    env.clock.clone(),
                    env.state.config.certificates.clone(),
                ),
                team_id: h.teams[2].id,
            }),
        );
        assert!(finalizer.finalize_results(h.hackathon.id).await.is_err());

        let marked: Vec<Option<i32>> = submissions_of(&env, h.hackathon.id)
            .await
            .iter()
            .map(|s| s.winner_position)
            .collect();
        assert_eq!(marked, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(certificates_of(&env, h.hackathon.id).await, before);
    }
}

mod side_effects {
    use super::*;

    #[tokio::test]
    async fn announcement_failure_keeps_committed_results() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(&env.db, "Spring Hack", &[Some(90.0), Some(80.0)], &[2, 1]).await;
        let issuer = Arc::new(CertificateIssuer::new(
            env.clock.clone(),
            env.state.config.certificates.clone(),
        ));
        let finalizer = finalizer_with(&env, issuer, Arc::new(ExhaustedPublisher));

        let report = finalizer.finalize_results(h.hackathon.id).await.unwrap();
        assert_eq!(report.announcement_slug, None);
        assert_eq!(report.winners.len(), 2);
        let hooks = report.notifications.await.unwrap();
        assert!(hooks.iter().all(|r| r.is_ok()), "{hooks:?}");

        let submissions = submissions_of(&env, h.hackathon.id).await;
        assert_eq!(submissions[0].winner_position, Some(1));
        assert_eq!(submissions[1].winner_position, Some(2));
        assert!(submissions.iter().all(|s| s.is_winner));
        assert_eq!(certificates_of(&env, h.hackathon.id).await.len(), 3);

        let stored = reload_hackathon(&env, h.hackathon.id).await;
        assert_eq!(stored.status, HackathonStatus::ResultsPublished);
        assert_eq!(stored.lifecycle_phase, LifecyclePhase::Ended);

        let posts = announcement::Entity::find()
            .filter(announcement::Column::HackathonId.eq(h.hackathon.id))
            .count(&env.db)
            .await
            .unwrap();
        assert_eq!(posts, 0);
    }

    #[tokio::test]
    async fn publishes_an_announcement_with_a_unique_slug() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(&env.db, "Spring Hack", &[Some(90.0)], &[1]).await;

        let first = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();
        let second = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();

        assert_eq!(first.announcement_slug.as_deref(), Some("spring-hack-winners"));
        assert_eq!(second.announcement_slug.as_deref(), Some("spring-hack-winners-1"));

        let post = announcement::Entity::find()
            .filter(announcement::Column::Slug.eq("spring-hack-winners"))
            .one(&env.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.title, "Spring Hack — Winners Announced");
        assert_eq!(post.hackathon_id, Some(h.hackathon.id));
        assert!(post.body.contains("1. **Team 0**"));
    }

    #[tokio::test]
    async fn notifies_every_stakeholder_once() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(
            &env.db,
            "Spring Hack",
            &[Some(90.0), Some(10.0), None],
            &[2, 1, 1],
        )
        .await;
        create_sponsor(&env.db, h.hackathon.id, "Acme", "hello@acme.test").await;

        let report = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();
        let hooks = report.notifications.await.unwrap();
        assert_eq!(hooks.len(), 3);
        assert!(hooks.iter().all(|r| r.is_ok()), "{hooks:?}");

        // Leads of three teams, one non-lead member, one sponsor.
        assert_eq!(env.sender.sent().len(), 5);

        let winner_lead = &h.members[0][0].email;
        let mail = env.sender.sent_to(winner_lead);
        assert_eq!(mail.len(), 1);
        assert_eq!(mail[0].subject, "Results for Spring Hack");
        assert!(mail[0].body.contains("placed 1st Place"));

        let non_winner_lead = &h.members[2][0].email;
        assert!(env.sender.sent_to(non_winner_lead)[0]
            .body
            .contains("did not place this time"));

        let sponsor_mail = env.sender.sent_to("hello@acme.test");
        assert_eq!(sponsor_mail.len(), 1);
        assert_eq!(sponsor_mail[0].subject, "Winners of Spring Hack");

        // Re-running inside the dedup window sends nothing new.
        let again = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();
        again.notifications.await.unwrap();
        assert_eq!(env.sender.sent().len(), 5);
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_block_the_others() {
        let env = TestEnv::new().await;
        let h = scored_hackathon(&env.db, "Spring Hack", &[Some(90.0)], &[3]).await;
        let unlucky = h.members[0][1].email.clone();
        env.sender.fail_for(&unlucky);

        let report = env
            .state
            .finalizer
            .finalize_results(h.hackathon.id)
            .await
            .unwrap();
        let hooks = report.notifications.await.unwrap();

        let failed: Vec<&str> = hooks
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.hook_id.as_str())
            .collect();
        assert_eq!(failed, vec!["results_participants"]);

        // The other member and the lead still heard about it.
        assert_eq!(env.sender.sent_to(&h.members[0][2].email).len(), 1);
        assert_eq!(env.sender.sent_to(&h.members[0][0].email).len(), 1);

        let record = notification_send_record::Entity::find()
            .filter(notification_send_record::Column::Recipient.eq(unlucky.as_str()))
            .one(&env.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.success);
        assert!(record.error_message.unwrap().contains("unavailable"));
    }
}
