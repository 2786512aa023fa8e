use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/polls", post(handlers::polls::create_poll))
        .route("/api/polls/actions", post(handlers::polls::poll_action))
        .route(
            "/api/polls/:group_id/:event_title",
            get(handlers::polls::get_poll),
        )
}
