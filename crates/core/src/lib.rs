//! Domain types and scheduling algorithms shared by every slotpoll crate.
//!
//! Nothing in here performs I/O. Collaborators (calendars, group chats,
//! session storage) are reached through the traits in [`services`].

pub mod availability;
pub mod errors;
pub mod models;
pub mod services;
pub mod slots;
pub mod tally;
