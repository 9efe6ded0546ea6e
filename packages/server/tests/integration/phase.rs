use common::{HackathonStatus, LifecyclePhase, PhaseWindows};
use futures::future::join_all;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use podium_server::entity::hackathon;
use podium_server::phase::{effective_phase, refresh_all_phases, refresh_phase};

use crate::common::{TestEnv, base_time, create_hackathon, hours, judging_windows};

async fn reload(env: &TestEnv, id: i32) -> hackathon::Model {
    hackathon::Entity::find_by_id(id)
        .one(&env.db)
        .await
        .unwrap()
        .expect("hackathon should exist")
}

async fn set_status(
    env: &TestEnv,
    id: i32,
    status: HackathonStatus,
    phase: LifecyclePhase,
) -> hackathon::Model {
    hackathon::ActiveModel {
        id: Set(id),
        status: Set(status),
        lifecycle_phase: Set(phase),
        ..Default::default()
    }
    .update(&env.db)
    .await
    .unwrap()
}

mod quiet_refresh {
    use super::*;

    #[tokio::test]
    async fn persists_changed_phase_without_touching_updated_at() {
        let env = TestEnv::new().await;
        let model = create_hackathon(&env.db, "Spring Hack", judging_windows()).await;
        assert_eq!(model.lifecycle_phase, LifecyclePhase::Upcoming);

        let refresh = refresh_phase(&env.db, &model, base_time()).await.unwrap();
        assert_eq!(refresh.phase, LifecyclePhase::Judging);
        assert!(refresh.changed);

        let stored = reload(&env, model.id).await;
        assert_eq!(stored.lifecycle_phase, LifecyclePhase::Judging);
        assert_eq!(stored.updated_at, model.updated_at);
    }

    #[tokio::test]
    async fn unchanged_phase_is_not_rewritten() {
        let env = TestEnv::new().await;
        let model = create_hackathon(&env.db, "Spring Hack", judging_windows()).await;

        refresh_phase(&env.db, &model, base_time()).await.unwrap();
        let stored = reload(&env, model.id).await;
        let again = refresh_phase(&env.db, &stored, base_time()).await.unwrap();

        assert_eq!(again.phase, LifecyclePhase::Judging);
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn concurrent_refreshes_converge() {
        let env = TestEnv::new().await;
        let model = create_hackathon(&env.db, "Spring Hack", judging_windows()).await;

        let results = join_all((0..10).map(|_| refresh_phase(&env.db, &model, base_time()))).await;

        let mut changed = 0;
        for result in results {
            let refresh = result.unwrap();
            assert_eq!(refresh.phase, LifecyclePhase::Judging);
            if refresh.changed {
                changed += 1;
            }
        }
        assert_eq!(changed, 1);
        assert_eq!(
            reload(&env, model.id).await.lifecycle_phase,
            LifecyclePhase::Judging
        );
    }

    #[tokio::test]
    async fn follows_the_clock_across_phases() {
        let env = TestEnv::new().await;
        let now = base_time();
        let windows = PhaseWindows {
            submission_start: Some(now),
            submission_end: Some(now + hours(24)),
            judging_start: Some(now + hours(48)),
            judging_end: Some(now + hours(72)),
            ..Default::default()
        };
        let model = create_hackathon(&env.db, "Autumn Hack", windows).await;

        for (at, expected) in [
            (now - hours(1), LifecyclePhase::Upcoming),
            (now + hours(1), LifecyclePhase::Submission),
            (now + hours(30), LifecyclePhase::SubmissionJudgingGap),
            (now + hours(50), LifecyclePhase::Judging),
            (now + hours(73), LifecyclePhase::Ended),
        ] {
            let stored = reload(&env, model.id).await;
            let refresh = refresh_phase(&env.db, &stored, at).await.unwrap();
            assert_eq!(refresh.phase, expected, "at {at}");
            assert_eq!(reload(&env, model.id).await.lifecycle_phase, expected);
        }
    }
}

mod terminal_state {
    use super::*;

    #[tokio::test]
    async fn published_results_pin_the_phase_to_ended() {
        let env = TestEnv::new().await;
        let model = create_hackathon(&env.db, "Spring Hack", judging_windows()).await;
        let model = set_status(
            &env,
            model.id,
            HackathonStatus::ResultsPublished,
            LifecyclePhase::Judging,
        )
        .await;

        assert_eq!(effective_phase(&model, base_time()), LifecyclePhase::Ended);

        let refresh = refresh_phase(&env.db, &model, base_time()).await.unwrap();
        assert_eq!(refresh.phase, LifecyclePhase::Ended);
        assert_eq!(
            reload(&env, model.id).await.lifecycle_phase,
            LifecyclePhase::Ended
        );
    }

    #[tokio::test]
    async fn sweep_skips_published_hackathons() {
        let env = TestEnv::new().await;
        let active = create_hackathon(&env.db, "Active", judging_windows()).await;

        let published = create_hackathon(&env.db, "Published", judging_windows()).await;
        set_status(
            &env,
            published.id,
            HackathonStatus::ResultsPublished,
            LifecyclePhase::Upcoming,
        )
        .await;

        let summary = refresh_all_phases(&env.db, base_time()).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 0);

        assert_eq!(
            reload(&env, active.id).await.lifecycle_phase,
            LifecyclePhase::Judging
        );
        assert_eq!(
            reload(&env, published.id).await.lifecycle_phase,
            LifecyclePhase::Upcoming
        );
    }

    #[tokio::test]
    async fn sweep_reopens_ended_hackathon_when_judging_is_extended() {
        let env = TestEnv::new().await;
        // Stored as ended, but judging_end now lies in the future.
        let extended = create_hackathon(&env.db, "Extended", judging_windows()).await;
        set_status(&env, extended.id, HackathonStatus::Judging, LifecyclePhase::Ended).await;

        let summary = refresh_all_phases(&env.db, base_time()).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.changed, 1);

        assert_eq!(
            reload(&env, extended.id).await.lifecycle_phase,
            LifecyclePhase::Judging
        );

        // A second pass finds nothing to rewrite.
        let summary = refresh_all_phases(&env.db, base_time()).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.changed, 0);
    }
}
