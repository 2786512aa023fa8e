//! # Slotpoll API
//!
//! The API crate runs the group scheduling service: it finds times when a whole
//! chat group is free, runs a poll over the candidates and writes the winner to
//! every voter's calendar.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into scheduler calls
//! - **Scheduler**: Coordinates availability search and the poll lifecycle
//! - **Clients**: Talk to the calendar provider and the messaging channel
//! - **Replies**: Render polite texts for the chat
//! - **Middleware**: Map errors to HTTP responses
//! - **Config**: Handle environment and application configuration
//!
//! The API uses Axum as the web framework; open polls live in memory or in
//! PostgreSQL through SQLx.

/// HTTP adapters for calendars and group messaging
pub mod clients;
/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for error handling
pub mod middleware;
/// User-facing chat texts
pub mod replies;
/// Route definitions and API endpoint structure
pub mod routes;
/// Group scheduling coordinator
pub mod scheduler;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use eyre::{Result, WrapErr};
use slotpoll_core::services::{CalendarClient, GroupNotifier, SessionStore, TokenStore};
use slotpoll_db::{
    stores::{MemorySessionStore, PgSessionStore, PgTokenStore},
    DbPool,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::{
    clients::{GoogleCalendarClient, LineGroupNotifier},
    config::{ApiConfig, SessionBackend},
    scheduler::GroupScheduler,
};

/// Shared application state that is accessible to all request handlers
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(ApiState { scheduler: Arc::new(scheduler) });
/// let app = build_router(state);
/// ```
pub struct ApiState {
    /// Coordinator of availability search and polls
    pub scheduler: Arc<GroupScheduler>,
}

/// Builds the router with every endpoint, bound to `state`
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Free time search
        .merge(routes::availability::routes())
        // Poll lifecycle
        .merge(routes::polls::routes())
        .with_state(state)
}

/// Wires the production collaborators into a scheduler
///
/// # Arguments
///
/// * `config` - Endpoints, tokens and scheduler settings
/// * `db_pool` - PostgreSQL pool for stored tokens and, if configured, polls
///
/// # Returns
///
/// * `Result<Arc<ApiState>>` - Shared state for the router
pub fn build_state(config: &ApiConfig, db_pool: DbPool) -> Result<Arc<ApiState>> {
    let http = reqwest::Client::builder()
        .timeout(config.scheduler.calendar_timeout)
        .build()
        .wrap_err("Failed to build HTTP client")?;

    let tokens: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(db_pool.clone()));
    let calendar: Arc<dyn CalendarClient> = Arc::new(GoogleCalendarClient::new(
        http.clone(),
        config.calendar_api_base_url.clone(),
        tokens,
        config.scheduler.timezone,
    ));
    let notifier: Arc<dyn GroupNotifier> = Arc::new(LineGroupNotifier::new(
        http,
        config.messaging_api_base_url.clone(),
        config.messaging_channel_token.clone(),
    ));
    let sessions: Arc<dyn SessionStore> = match config.session_store {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::Postgres => Arc::new(PgSessionStore::new(db_pool)),
    };

    let scheduler = GroupScheduler::new(calendar, notifier, sessions, config.scheduler.clone());
    Ok(Arc::new(ApiState {
        scheduler: Arc::new(scheduler),
    }))
}

/// Starts the API server with the provided configuration and database connection
///
/// This function initializes logging, wires the collaborators, configures
/// routes and layers, and serves HTTP until the process stops.
///
/// # Arguments
///
/// * `config` - API configuration including host, port, and scheduler settings
/// * `db_pool` - PostgreSQL connection pool for database operations
///
/// # Returns
///
/// * `Result<()>` - Success or error result
///
/// # Example
///
/// ```ignore
/// let config = ApiConfig::from_env()?;
/// let db_pool = slotpoll_db::create_pool(&config.database_url).await?;
/// start_server(config, db_pool).await?;
/// ```
pub async fn start_server(config: ApiConfig, db_pool: DbPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = build_state(&config, db_pool)?;
    info!(
        "Scheduling in {} with {:?} session store and {:?} availability policy",
        config.scheduler.timezone.name(),
        config.session_store,
        config.scheduler.policy
    );

    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let origins = origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Invalid API_CORS_ORIGINS entry")?;

        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_origin(origins);

        app.layer(cors)
    } else {
        app
    };

    // Request tracing and timeout
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
