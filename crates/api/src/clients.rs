//! HTTP adapters for the external collaborators: the calendar provider and the
//! group messaging channel.

pub mod google_calendar;
pub mod line_messaging;

pub use google_calendar::GoogleCalendarClient;
pub use line_messaging::LineGroupNotifier;
