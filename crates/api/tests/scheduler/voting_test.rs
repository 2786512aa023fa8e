use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use slotpoll_api::scheduler::{ActionOutcome, GroupPollOutcome, GroupPollRequest, GroupScheduler};
use slotpoll_core::{
    errors::ScheduleError,
    models::{
        poll::PollAction,
        time_slot::AvailabilityWindow,
        voting::{CommitOutcome, PollOption, SessionKey, VotingSession},
    },
    services::SessionStore,
};
use slotpoll_db::{
    mock::{uncontended_lock, MockCalendar, MockNotifier, MockSessions},
    stores::MemorySessionStore,
};
use test_log::test;

use crate::test_utils::{monday, monday_request, settings, TestContext};

fn key() -> SessionKey {
    SessionKey::new("C1", "Retro")
}

fn option(hour: u32) -> PollOption {
    PollOption {
        start: monday(hour, 0),
        end: monday(hour + 1, 0),
    }
}

fn windows(hours: &[u32]) -> Vec<AvailabilityWindow> {
    hours
        .iter()
        .map(|&hour| AvailabilityWindow {
            start: monday(hour, 0),
            end: monday(hour + 1, 0),
        })
        .collect()
}

async fn open(ctx: &TestContext) {
    ctx.scheduler
        .open_poll(&key(), &windows(&[9, 11, 14]))
        .await
        .unwrap();
}

#[test(tokio::test)]
async fn open_poll_offers_the_earliest_windows() {
    let ctx = TestContext::new();

    let poll = ctx
        .scheduler
        .open_poll(&key(), &windows(&[9, 10, 11, 12, 13, 14, 15]))
        .await
        .unwrap();

    assert_eq!(poll.options.len(), 5);
    assert_eq!(poll.options[0].start, monday(9, 0));
    assert_eq!(poll.options[4].start, monday(13, 0));
    assert_eq!(poll.options[2].action, PollAction::vote(&key(), 2, option(11)));
    assert_eq!(poll.close_action, PollAction::close(&key()));

    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options.len(), 5);
    assert_eq!(snapshot.counts, vec![0; 5]);
    assert_eq!(snapshot.leading_index, None);
}

#[test(tokio::test)]
async fn opening_twice_is_rejected() {
    let ctx = TestContext::new();
    open(&ctx).await;

    let again = ctx.scheduler.open_poll(&key(), &windows(&[15])).await;

    assert!(matches!(again, Err(ScheduleError::Validation(_))));
    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options[0], option(9));
}

#[test(tokio::test)]
async fn schedule_group_poll_without_common_time_creates_nothing() {
    let ctx = TestContext::new();
    ctx.calendar.busy("U1", monday(9, 0), monday(18, 0));

    let outcome = ctx
        .scheduler
        .schedule_group_poll(&GroupPollRequest {
            group_id: "C1".to_string(),
            event_title: "Retro".to_string(),
            availability: monday_request(60),
        })
        .await
        .unwrap();

    assert_eq!(outcome, GroupPollOutcome::NoCommonTime);
    assert!(ctx.sessions.is_empty().await);
}

#[test(tokio::test)]
async fn schedule_group_poll_opens_over_found_windows() {
    let ctx = TestContext::new();
    ctx.calendar.busy("U2", monday(9, 0), monday(16, 0));

    let outcome = ctx
        .scheduler
        .schedule_group_poll(&GroupPollRequest {
            group_id: "C1".to_string(),
            event_title: "Retro".to_string(),
            availability: monday_request(60),
        })
        .await
        .unwrap();

    let GroupPollOutcome::Opened { poll } = outcome else {
        panic!("expected a poll");
    };
    let starts: Vec<_> = poll.options.iter().map(|o| o.start).collect();
    assert_eq!(starts, vec![monday(16, 0), monday(16, 30), monday(17, 0)]);
}

#[test(tokio::test)]
async fn ties_go_to_the_first_option() {
    let ctx = TestContext::new();
    open(&ctx).await;

    ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();
    ctx.scheduler.process_vote("B", &key(), 1, option(11)).await.unwrap();
    ctx.scheduler.process_vote("C", &key(), 0, option(9)).await.unwrap();
    ctx.scheduler.process_vote("D", &key(), 1, option(11)).await.unwrap();

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    assert_eq!(report.counts, vec![2, 2, 0]);
    assert_eq!(report.winning_index, 0);
    assert_eq!(report.winner, option(9));
}

#[test(tokio::test)]
async fn majority_wins() {
    let ctx = TestContext::new();
    open(&ctx).await;

    ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();
    ctx.scheduler.process_vote("B", &key(), 1, option(11)).await.unwrap();
    ctx.scheduler.process_vote("C", &key(), 0, option(9)).await.unwrap();

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    assert_eq!(report.winning_index, 0);
    assert_eq!(report.counts, vec![2, 1, 0]);
}

#[test(tokio::test)]
async fn revoting_replaces_the_earlier_ballot() {
    let ctx = TestContext::new();
    open(&ctx).await;

    ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();
    let outcome = ctx.scheduler.process_vote("A", &key(), 1, option(11)).await.unwrap();

    assert_eq!(outcome.previous_choice, Some(0));
    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.counts, vec![0, 1, 0]);
    assert_eq!(snapshot.ballots_cast, 1);
    assert_eq!(snapshot.leading_index, Some(1));
}

#[test(tokio::test)]
async fn unopened_polls_grow_options_from_ballots() {
    let ctx = TestContext::new();

    let first = ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();
    let second = ctx.scheduler.process_vote("B", &key(), 1, option(14)).await.unwrap();
    let repeat = ctx.scheduler.process_vote("C", &key(), 1, option(14)).await.unwrap();

    assert!(first.appended_option);
    assert!(second.appended_option);
    assert!(!repeat.appended_option);
    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options, vec![option(9), option(14)]);
}

#[test(tokio::test)]
async fn malformed_ballots_leave_the_poll_untouched() {
    let ctx = TestContext::new();
    open(&ctx).await;

    let gap = ctx.scheduler.process_vote("A", &key(), 7, option(16)).await;
    let mismatch = ctx.scheduler.process_vote("A", &key(), 1, option(16)).await;

    assert!(matches!(gap, Err(ScheduleError::Validation(_))));
    assert!(matches!(mismatch, Err(ScheduleError::Validation(_))));
    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options.len(), 3);
    assert_eq!(snapshot.ballots_cast, 0);
}

#[test(tokio::test)]
async fn closing_writes_the_winner_to_every_voter() {
    let ctx = TestContext::new();
    open(&ctx).await;

    ctx.scheduler.process_vote("X", &key(), 0, option(9)).await.unwrap();
    ctx.scheduler.process_vote("Y", &key(), 1, option(11)).await.unwrap();
    ctx.scheduler.process_vote("Z", &key(), 1, option(11)).await.unwrap();

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    let created = ctx.calendar.created();
    let mut users: Vec<_> = created.iter().map(|(user, _)| user.as_str()).collect();
    users.sort();
    assert_eq!(users, vec!["X", "Y", "Z"]);
    assert!(created.iter().all(|(_, event)| event.title == "Retro"
        && event.start == monday(11, 0)
        && event.end == monday(12, 0)));
    assert!(report.commits.iter().all(|c| c.outcome.is_committed()));
    assert!(report.notified);

    let messages = ctx.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "C1");
    assert!(messages[0].1.contains("2024-06-03 (Mon) 11:00-12:00"));
}

#[test(tokio::test)]
async fn commit_fan_out_uses_the_calendar_once_per_voter() {
    let mut calendar = MockCalendar::new();
    calendar
        .expect_create_event()
        .withf(|_, event| event.start == monday(9, 0) && event.title == "Retro")
        .times(3)
        .returning(|user_id, _| Ok(format!("evt-{}", user_id)));
    let mut notifier = MockNotifier::new();
    notifier
        .expect_send_group_message()
        .times(1)
        .returning(|_, _| Ok(()));
    let sessions = Arc::new(MemorySessionStore::new());
    let scheduler = GroupScheduler::new(Arc::new(calendar), Arc::new(notifier), sessions.clone(), settings());

    scheduler.open_poll(&key(), &windows(&[9, 11])).await.unwrap();
    scheduler.process_vote("X", &key(), 0, option(9)).await.unwrap();
    scheduler.process_vote("Y", &key(), 1, option(11)).await.unwrap();
    scheduler.process_vote("Z", &key(), 0, option(9)).await.unwrap();

    let report = scheduler.close_voting(&key()).await.unwrap();

    assert_eq!(
        report.commits.iter().map(|c| c.outcome.clone()).collect::<Vec<_>>(),
        vec![
            CommitOutcome::Committed { event_id: "evt-X".to_string() },
            CommitOutcome::Committed { event_id: "evt-Y".to_string() },
            CommitOutcome::Committed { event_id: "evt-Z".to_string() },
        ]
    );
    assert!(sessions.is_empty().await);
}

#[test(tokio::test)]
async fn partial_commit_failures_are_reported_per_user() {
    let ctx = TestContext::new();
    ctx.calendar.reject_commits("Y");
    open(&ctx).await;

    for user in ["X", "Y", "Z"] {
        ctx.scheduler.process_vote(user, &key(), 0, option(9)).await.unwrap();
    }

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    let failed: Vec<_> = report.failed_commits().map(|c| c.user_id.as_str()).collect();
    assert_eq!(failed, vec!["Y"]);
    assert!(ctx.notifier.messages()[0].1.contains("2 of 3"));
    assert!(ctx.sessions.is_empty().await);
}

#[test(tokio::test)]
async fn notification_failure_does_not_keep_the_poll_open() {
    let ctx = TestContext::new();
    ctx.notifier.fail();
    open(&ctx).await;
    ctx.scheduler.process_vote("X", &key(), 2, option(14)).await.unwrap();

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    assert!(!report.notified);
    assert_eq!(ctx.calendar.created().len(), 1);
    assert!(ctx.sessions.is_empty().await);
}

#[test(tokio::test)]
async fn closing_without_ballots_commits_nothing() {
    let ctx = TestContext::new();
    open(&ctx).await;

    let report = ctx.scheduler.close_voting(&key()).await.unwrap();

    assert_eq!(report.winning_index, 0);
    assert!(report.commits.is_empty());
    assert!(ctx.calendar.created().is_empty());
}

#[test(tokio::test)]
async fn closed_polls_are_gone_for_good() {
    let ctx = TestContext::new();
    open(&ctx).await;
    let original = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();

    ctx.scheduler.close_voting(&key()).await.unwrap();

    assert!(matches!(
        ctx.scheduler.close_voting(&key()).await,
        Err(ScheduleError::NotFound(_))
    ));

    ctx.scheduler.process_vote("A", &key(), 0, option(15)).await.unwrap();
    let reborn = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_ne!(reborn.id, original.id);
    assert_eq!(reborn.options, vec![option(15)]);
    assert_eq!(reborn.ballots_cast, 1);
}

#[test(tokio::test)]
async fn concurrent_first_ballots_register_one_option() {
    let ctx = TestContext::new();

    let votes = (0..20).map(|n| {
        let scheduler = ctx.scheduler.clone();
        tokio::spawn(async move {
            scheduler
                .process_vote(&format!("user-{}", n), &key(), 0, option(9))
                .await
        })
    });
    for vote in futures::future::join_all(votes).await {
        vote.unwrap().unwrap();
    }

    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options, vec![option(9)]);
    assert_eq!(snapshot.counts, vec![20]);
}

#[test(tokio::test)]
async fn ballot_during_close_starts_a_new_poll() {
    let ctx = TestContext::new();
    ctx.calendar.delay_commits(Duration::from_millis(100));
    open(&ctx).await;
    ctx.scheduler.process_vote("A", &key(), 0, option(9)).await.unwrap();

    let closing = {
        let scheduler = ctx.scheduler.clone();
        tokio::spawn(async move { scheduler.close_voting(&key()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let late = ctx.scheduler.process_vote("B", &key(), 0, option(11)).await.unwrap();

    let report = closing.await.unwrap().unwrap();
    assert_eq!(report.counts, vec![1, 0, 0]);
    assert!(late.appended_option);
    let snapshot = ctx.scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options, vec![option(11)]);
}

#[test(tokio::test)]
async fn actions_dispatch_to_vote_and_close() {
    let ctx = TestContext::new();
    open(&ctx).await;

    let voted = ctx
        .scheduler
        .handle_action("A", PollAction::vote(&key(), 1, option(11)))
        .await
        .unwrap();
    assert!(matches!(voted, ActionOutcome::Voted { ref ballot, .. } if ballot.option_index == 1));

    let closed = ctx
        .scheduler
        .handle_action("A", PollAction::close(&key()))
        .await
        .unwrap();
    let ActionOutcome::Closed { report } = closed else {
        panic!("expected a close");
    };
    assert_eq!(report.winner, option(11));
}

#[test(tokio::test)]
async fn store_failures_surface_as_database_errors() {
    let mut sessions = MockSessions::new();
    sessions.expect_lock().returning(|_| Ok(uncontended_lock()));
    sessions
        .expect_get()
        .returning(|_| Err(eyre::eyre!("connection reset")));
    sessions.expect_upsert().never();
    let scheduler = GroupScheduler::new(
        Arc::new(MockCalendar::new()),
        Arc::new(MockNotifier::new()),
        Arc::new(sessions),
        settings(),
    );

    let result = scheduler.process_vote("A", &key(), 0, option(9)).await;

    assert!(matches!(result, Err(ScheduleError::Database(_))));
}

#[test(tokio::test)]
async fn failed_teardown_is_a_database_error_and_keeps_the_poll() {
    let mut sessions = MockSessions::new();
    sessions.expect_lock().returning(|_| Ok(uncontended_lock()));
    sessions.expect_get().returning(|key| {
        let mut session = VotingSession::with_options(key.clone(), vec![option(9), option(11)]);
        session.record_ballot("A", 0, option(9)).unwrap();
        Ok(Some(session))
    });
    sessions
        .expect_delete()
        .times(1)
        .returning(|_| Err(eyre::eyre!("connection reset")));
    let mut calendar = MockCalendar::new();
    calendar
        .expect_create_event()
        .times(1)
        .returning(|_, _| Ok("evt-1".to_string()));
    let mut notifier = MockNotifier::new();
    notifier.expect_send_group_message().times(1).returning(|_, _| Ok(()));
    let scheduler = GroupScheduler::new(Arc::new(calendar), Arc::new(notifier), Arc::new(sessions), settings());

    let result = scheduler.close_voting(&key()).await;

    assert!(matches!(result, Err(ScheduleError::Database(_))));
    let snapshot = scheduler.session_snapshot(&key()).await.unwrap();
    assert_eq!(snapshot.options, vec![option(9), option(11)]);
}

#[test(tokio::test)]
async fn a_poll_without_options_cannot_be_closed() {
    let mut sessions = MockSessions::new();
    sessions.expect_lock().returning(|_| Ok(uncontended_lock()));
    sessions
        .expect_get()
        .returning(|key| Ok(Some(VotingSession::new(key.clone()))));
    sessions.expect_delete().never();
    let scheduler = GroupScheduler::new(
        Arc::new(MockCalendar::new()),
        Arc::new(MockNotifier::new()),
        Arc::new(sessions),
        settings(),
    );

    let result = scheduler.close_voting(&key()).await;

    assert!(matches!(result, Err(ScheduleError::Validation(_))));
}

#[test(tokio::test)]
async fn keys_are_independent() {
    let ctx = TestContext::new();
    let other = SessionKey::new("C1", "Offsite");
    open(&ctx).await;
    ctx.scheduler.process_vote("A", &other, 0, option(9)).await.unwrap();

    ctx.scheduler.close_voting(&key()).await.unwrap();

    assert!(ctx.sessions.get(&other).await.unwrap().is_some());
}
