//! # API Configuration Module
//!
//! Loads the server and scheduler configuration from environment variables,
//! with defaults where a sensible one exists.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per request timeout (default: 30)
//! - `SESSION_STORE`: `memory` or `postgres` (default: "memory")
//! - `SCHEDULER_TIMEZONE`: Civil time zone of the groups (default: "Asia/Tokyo")
//! - `CALENDAR_TIMEOUT_SECONDS`: Timeout of one calendar or messaging call (default: 10)
//! - `POLL_MAX_OPTIONS`: Candidate times offered in a poll (default: 5)
//! - `AVAILABILITY_POLICY`: `lenient` or `strict` (default: "lenient")
//! - `CALENDAR_API_BASE_URL`: Calendar REST base (default: Google Calendar v3)
//! - `MESSAGING_API_BASE_URL`: Messaging REST base (default: LINE Messaging API)
//! - `MESSAGING_CHANNEL_TOKEN`: Bearer token for group pushes (required)

use chrono_tz::Tz;
use eyre::{eyre, Report, Result, WrapErr};
use std::{env, str::FromStr, time::Duration};
use tracing::Level;

use crate::scheduler::{AvailabilityPolicy, SchedulerSettings};

pub const DEFAULT_CALENDAR_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_MESSAGING_API_BASE_URL: &str = "https://api.line.me/v2/bot";

/// Where open polls are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionBackend {
    /// Process memory; polls are lost on restart
    #[default]
    Memory,
    /// PostgreSQL tables next to the stored tokens
    Postgres,
}

impl FromStr for SessionBackend {
    type Err = Report;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(SessionBackend::Memory),
            "postgres" => Ok(SessionBackend::Postgres),
            other => Err(eyre!("Unknown session store '{}'", other)),
        }
    }
}

/// Configuration for the server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotpoll_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Backend owning the open polls
    pub session_store: SessionBackend,

    /// Time zone, timeouts, poll size and degradation policy
    pub scheduler: SchedulerSettings,

    /// Base URL of the calendar REST API
    pub calendar_api_base_url: String,

    /// Base URL of the messaging REST API
    pub messaging_api_base_url: String,

    /// Channel access token for group pushes
    pub messaging_channel_token: String,
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| eyre!("Invalid {} value '{}': {}", name, raw, err)),
        Err(_) => Ok(default),
    }
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - Configuration object or error
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `DATABASE_URL` or `MESSAGING_CHANNEL_TOKEN` is not set
    /// - A numeric setting cannot be parsed
    /// - `SESSION_STORE`, `AVAILABILITY_POLICY` or `SCHEDULER_TIMEZONE` holds an unknown value
    pub fn from_env() -> Result<Self> {
        // Network settings
        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("API_PORT", 3000u16)?;

        // Database settings
        let database_url = env::var("DATABASE_URL")
            .wrap_err("DATABASE_URL environment variable must be set")?;

        // Logging settings
        let log_level = match env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = env::var("API_CORS_ORIGINS").ok().map(|origins| {
            origins.split(',').map(|s| s.trim().to_string()).collect()
        });

        let request_timeout = parse_or("API_REQUEST_TIMEOUT_SECONDS", 30u64)?;

        // Scheduler settings
        let defaults = SchedulerSettings::default();
        let session_store = parse_or("SESSION_STORE", SessionBackend::Memory)?;
        let timezone = parse_or::<Tz>("SCHEDULER_TIMEZONE", defaults.timezone)?;
        let calendar_timeout = Duration::from_secs(parse_or(
            "CALENDAR_TIMEOUT_SECONDS",
            defaults.calendar_timeout.as_secs(),
        )?);
        let max_poll_options = parse_or("POLL_MAX_OPTIONS", defaults.max_poll_options)?;
        if max_poll_options == 0 {
            return Err(eyre!("POLL_MAX_OPTIONS must be at least 1"));
        }
        let policy = parse_or::<AvailabilityPolicy>("AVAILABILITY_POLICY", defaults.policy)?;

        // Collaborator endpoints
        let calendar_api_base_url = env::var("CALENDAR_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_CALENDAR_API_BASE_URL.to_string());
        let messaging_api_base_url = env::var("MESSAGING_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_MESSAGING_API_BASE_URL.to_string());
        let messaging_channel_token = env::var("MESSAGING_CHANNEL_TOKEN")
            .wrap_err("MESSAGING_CHANNEL_TOKEN environment variable must be set")?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            session_store,
            scheduler: SchedulerSettings {
                timezone,
                calendar_timeout,
                max_poll_options,
                policy,
            },
            calendar_api_base_url,
            messaging_api_base_url,
            messaging_channel_token,
        })
    }

    /// Returns the server address as a string
    ///
    /// # Returns
    ///
    /// * `String` - Formatted server address (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
