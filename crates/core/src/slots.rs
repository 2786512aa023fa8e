//! The free/busy grid: each weekday's working window cut into fixed-width
//! slots, flagged busy wherever any participant has an event.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::models::{calendar::CalendarEvent, time_slot::TimeSlot};

/// Width of one slot in minutes.
pub const SLOT_MINUTES: i64 = 30;
/// First bookable hour of a working day, in the group's civil time.
pub const WORKDAY_START_HOUR: u32 = 9;
/// Hour at which the working day ends, in the group's civil time.
pub const WORKDAY_END_HOUR: u32 = 18;

pub fn slot_width() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Weekends never contribute slots.
pub fn is_working_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Generates the empty (all available) slot grid for `[range_start, range_end)`.
///
/// Days are visited by stepping the local start time one calendar day at a
/// time while it stays before the end of the range; every visited weekday
/// contributes its whole working window regardless of the time of day the
/// range starts at. Slots come out in chronological order.
pub fn generate_slots(range_start: DateTime<Utc>, range_end: DateTime<Utc>, tz: Tz) -> Vec<TimeSlot> {
    let start_local = range_start.with_timezone(&tz).naive_local();
    let end_local = range_end.with_timezone(&tz).naive_local();

    let mut slots = Vec::new();
    let mut cursor = start_local;
    while cursor < end_local {
        let date = cursor.date();
        if is_working_day(date.weekday()) {
            push_working_day(&mut slots, date, tz);
        }
        cursor += Duration::days(1);
    }
    slots
}

fn push_working_day(slots: &mut Vec<TimeSlot>, date: NaiveDate, tz: Tz) {
    let (Some(day_start), Some(day_end)) = (
        local_instant(date, WORKDAY_START_HOUR, tz),
        local_instant(date, WORKDAY_END_HOUR, tz),
    ) else {
        return;
    };

    let mut slot_start = day_start;
    while slot_start < day_end {
        let slot_end = slot_start + slot_width();
        slots.push(TimeSlot::new(slot_start, slot_end));
        slot_start = slot_end;
    }
}

fn local_instant(date: NaiveDate, hour: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Flags every slot that overlaps one of `events` as unavailable.
pub fn mark_busy<'a>(slots: &mut [TimeSlot], events: impl IntoIterator<Item = &'a CalendarEvent>) {
    for event in events {
        if event.start >= event.end {
            continue;
        }
        for slot in slots.iter_mut().filter(|s| s.available) {
            if slot.overlaps(event.start, event.end) {
                slot.available = false;
            }
        }
    }
}
