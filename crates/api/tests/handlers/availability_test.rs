use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use slotpoll_api::handlers::availability::AvailabilitySearchResponse;

use crate::test_utils::{monday, monday_request, TestContext};

#[tokio::test]
async fn search_returns_common_windows() {
    let ctx = TestContext::new();
    ctx.calendar.busy("U2", monday(10, 0), monday(11, 0));
    let server = ctx.server();

    let response = server
        .post("/api/availability/search")
        .json(&monday_request(60))
        .await;

    response.assert_status_ok();
    let body: AvailabilitySearchResponse = response.json();
    assert_eq!(body.count, 14);
    assert_eq!(body.windows[0].start, monday(9, 0));
    assert_eq!(body.windows[1].start, monday(11, 0));
}

#[tokio::test]
async fn duration_defaults_to_an_hour() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/availability/search")
        .json(&json!({
            "organizer_id": "U1",
            "start": monday(0, 0),
            "end": monday(23, 0),
        }))
        .await;

    response.assert_status_ok();
    let body: AvailabilitySearchResponse = response.json();
    assert_eq!(body.count, 17);
    assert_eq!(body.windows[0].end, monday(10, 0));
}

#[tokio::test]
async fn inverted_range_is_a_bad_request() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut request = monday_request(60);
    std::mem::swap(&mut request.start, &mut request.end);

    let response = server.post("/api/availability/search").json(&request).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Search range"));
}

#[tokio::test]
async fn health_reports_scheduler_settings() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "status": "ok",
        "timezone": "Asia/Tokyo",
        "availability_policy": "lenient",
    }));
}
