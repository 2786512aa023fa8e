/// Free time search
pub mod availability;
/// Liveness and version
pub mod health;
/// Group polls
pub mod polls;
