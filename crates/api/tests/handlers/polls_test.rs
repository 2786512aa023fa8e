use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use slotpoll_api::{
    handlers::polls::{CreatePollResponse, PollActionResponse},
    scheduler::{ActionOutcome, GroupPollRequest},
};
use slotpoll_core::models::{
    poll::PollAction,
    voting::{PollOption, SessionKey, SessionSnapshot},
};

use crate::test_utils::{monday, monday_request, TestContext};

fn key() -> SessionKey {
    SessionKey::new("C1", "Team sync")
}

fn poll_request() -> GroupPollRequest {
    GroupPollRequest {
        group_id: "C1".to_string(),
        event_title: "Team sync".to_string(),
        availability: monday_request(60),
    }
}

#[tokio::test]
async fn creating_a_poll_returns_options_and_a_reply() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.post("/api/polls").json(&poll_request()).await;

    response.assert_status_ok();
    let body: CreatePollResponse = response.json();
    let poll = body.poll.unwrap();
    assert_eq!(poll.options.len(), 5);
    assert_eq!(poll.options[0].start, monday(9, 0));
    assert_eq!(poll.close_action, PollAction::close(&key()));
    assert!(body.reply.contains("Team sync"));
}

#[tokio::test]
async fn creating_a_poll_without_common_time_replies_politely() {
    let ctx = TestContext::new();
    ctx.calendar.busy("U3", monday(8, 0), monday(19, 0));
    let server = ctx.server();

    let response = server.post("/api/polls").json(&poll_request()).await;

    response.assert_status_ok();
    let body: CreatePollResponse = response.json();
    assert!(body.poll.is_none());
    assert!(body.reply.starts_with("Sorry, there is no time when everyone is free"));
}

#[tokio::test]
async fn votes_and_close_round_trip_through_the_api() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let poll = server
        .post("/api/polls")
        .json(&poll_request())
        .await
        .json::<CreatePollResponse>()
        .poll
        .unwrap();

    for (user, index) in [("U1", 1), ("U2", 1), ("U3", 0)] {
        let response = server
            .post("/api/polls/actions")
            .json(&json!({ "user_id": user, "action": poll.options[index].action }))
            .await;
        response.assert_status_ok();
        let body: PollActionResponse = response.json();
        assert!(body.ok);
        assert!(body.reply.contains("has been recorded"));
    }

    let snapshot: SessionSnapshot = server.get("/api/polls/C1/Team%20sync").await.json();
    assert_eq!(snapshot.counts, vec![1, 2, 0, 0, 0]);
    assert_eq!(snapshot.leading_index, Some(1));

    let response = server
        .post("/api/polls/actions")
        .json(&json!({ "user_id": "U1", "action": poll.close_action }))
        .await;
    response.assert_status_ok();
    let body: PollActionResponse = response.json();
    assert!(body.reply.contains("2024-06-03 (Mon) 09:30-10:30"));
    let Some(ActionOutcome::Closed { report }) = body.outcome else {
        panic!("expected a close report");
    };
    assert_eq!(report.winning_index, 1);
    assert_eq!(report.commits.len(), 3);
    assert_eq!(ctx.calendar.created().len(), 3);
}

#[tokio::test]
async fn closing_an_unknown_poll_is_not_found_with_a_reply() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/polls/actions")
        .json(&json!({
            "user_id": "U1",
            "action": { "action": "close_vote", "group_id": "C1", "event_title": "Team sync" }
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: PollActionResponse = response.json();
    assert!(!body.ok);
    assert_eq!(body.reply, "There is no open poll for Team sync to close.");
}

#[tokio::test]
async fn mismatched_vote_is_a_bad_request() {
    let ctx = TestContext::new();
    let server = ctx.server();
    server.post("/api/polls").json(&poll_request()).await.assert_status_ok();

    let forged = PollAction::vote(
        &key(),
        0,
        PollOption {
            start: monday(15, 0),
            end: monday(16, 0),
        },
    );
    let response = server
        .post("/api/polls/actions")
        .json(&json!({ "user_id": "U1", "action": forged }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: PollActionResponse = response.json();
    assert!(body.reply.starts_with("Sorry, that did not work for Team sync"));
}

#[tokio::test]
async fn titles_with_underscores_survive_postback_data() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let key = SessionKey::new("C_1", "launch_review_v2");
    let action = PollAction::vote(
        &key,
        0,
        PollOption {
            start: monday(9, 0),
            end: monday(10, 0),
        },
    );
    let data = action.to_postback_data().unwrap();

    let response = server
        .post("/api/polls/actions")
        .json(&json!({ "user_id": "U1", "action": PollAction::from_postback_data(&data).unwrap() }))
        .await;

    response.assert_status_ok();
    let snapshot: SessionSnapshot = server.get("/api/polls/C_1/launch_review_v2").await.json();
    assert_eq!(snapshot.key, key);
}

#[tokio::test]
async fn unknown_poll_snapshot_is_not_found() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/api/polls/C1/Nothing").await;

    response.assert_status(StatusCode::NOT_FOUND);
}
