/// Free time search across a group
pub mod availability;
/// Poll creation, actions and snapshots
pub mod polls;
