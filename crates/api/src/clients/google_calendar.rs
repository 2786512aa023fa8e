use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slotpoll_core::{
    models::calendar::{CalendarEvent, NewCalendarEvent},
    services::{CalendarClient, TokenStore},
};
use std::sync::Arc;
use tracing::debug;

/// Google Calendar v3 client acting on each user's primary calendar with the
/// access token kept in the [`TokenStore`].
pub struct GoogleCalendarClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    timezone: Tz,
}

impl GoogleCalendarClient {
    pub fn new(http: Client, base_url: impl Into<String>, tokens: Arc<dyn TokenStore>, timezone: Tz) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            timezone,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    async fn access_token(&self, user_id: &str) -> Result<String> {
        self.tokens
            .get_tokens(user_id)
            .await?
            .map(|tokens| tokens.access_token)
            .ok_or_else(|| eyre!("No calendar credentials stored for user {}", user_id))
    }

    /// Start of `date` in the calendar's time zone; all-day events are
    /// expressed as civil dates with an exclusive end date.
    fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| eyre!("Invalid date {}", date))?;
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .ok_or_else(|| eyre!("Midnight of {} does not exist in {}", date, self.timezone))
    }

    fn resolve(&self, time: &EventTime) -> Result<Option<DateTime<Utc>>> {
        match (time.date_time, time.date) {
            (Some(at), _) => Ok(Some(at.with_timezone(&Utc))),
            (None, Some(date)) => self.start_of_day(date).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<RemoteEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvent {
    id: Option<String>,
    summary: Option<String>,
    status: Option<String>,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn get_events(&self, user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let token = self.access_token(user_id).await?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(page_token) = &page_token {
                query.push(("pageToken", page_token.clone()));
            }

            let response = self
                .http
                .get(self.events_url())
                .bearer_auth(&token)
                .query(&query)
                .send()
                .await
                .wrap_err("Calendar list request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                return Err(eyre!("Calendar API error ({}): {}", status, error_text));
            }

            let page: EventsPage = response.json().await.wrap_err("Failed to parse calendar events")?;

            for event in page.items {
                if event.status.as_deref() == Some("cancelled") {
                    continue;
                }
                match (self.resolve(&event.start)?, self.resolve(&event.end)?) {
                    (Some(start), Some(end)) => events.push(CalendarEvent {
                        start,
                        end,
                        summary: event.summary,
                    }),
                    _ => debug!("Skipping event {:?} without start or end", event.id),
                }
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!("Read {} events for {}", events.len(), user_id);
        Ok(events)
    }

    async fn create_event(&self, user_id: &str, event: &NewCalendarEvent) -> Result<String> {
        let token = self.access_token(user_id).await?;
        let time_zone = Some(self.timezone.name().to_string());
        let body = EventBody {
            summary: &event.title,
            start: EventTime {
                date_time: Some(event.start.with_timezone(&self.timezone).fixed_offset()),
                time_zone: time_zone.clone(),
                ..EventTime::default()
            },
            end: EventTime {
                date_time: Some(event.end.with_timezone(&self.timezone).fixed_offset()),
                time_zone,
                ..EventTime::default()
            },
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .wrap_err("Calendar insert request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(eyre!("Calendar API error ({}): {}", status, error_text));
        }

        let created: CreatedEvent = response.json().await.wrap_err("Failed to parse created event")?;
        Ok(created.id)
    }
}
