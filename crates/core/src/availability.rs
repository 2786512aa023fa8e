//! Turns a free/busy grid into candidate meeting windows.

use chrono::Duration;

use crate::models::time_slot::{AvailabilityWindow, TimeSlot};
use crate::slots::SLOT_MINUTES;

/// Number of consecutive slots a meeting of `duration` occupies, rounding
/// partial slots up.
pub fn required_slots(duration: Duration) -> usize {
    let minutes = duration.num_minutes();
    if minutes <= 0 {
        return 0;
    }
    ((minutes + SLOT_MINUTES - 1) / SLOT_MINUTES) as usize
}

/// Every start position at which `duration` fits into free, back-to-back
/// slots.
///
/// Overlapping windows are all reported in chronological order; trimming to
/// a presentable number of options is the caller's business. A run never
/// spans a gap between two working days.
pub fn find_windows(slots: &[TimeSlot], duration: Duration) -> Vec<AvailabilityWindow> {
    let width = required_slots(duration);
    if width == 0 || slots.len() < width {
        return Vec::new();
    }

    slots
        .windows(width)
        .filter(|run| is_free_run(run))
        .map(|run| AvailabilityWindow {
            start: run[0].start,
            end: run[0].start + duration,
        })
        .collect()
}

fn is_free_run(run: &[TimeSlot]) -> bool {
    run.iter().all(|slot| slot.available) && run.windows(2).all(|pair| pair[0].end == pair[1].start)
}
