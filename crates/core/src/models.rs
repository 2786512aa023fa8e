pub mod calendar;
pub mod poll;
pub mod time_slot;
pub mod voting;
