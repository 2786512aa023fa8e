//! [`SessionStore`](slotpoll_core::services::SessionStore) and
//! [`TokenStore`](slotpoll_core::services::TokenStore) backends.

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::{PgSessionStore, PgTokenStore};
