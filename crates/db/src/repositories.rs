pub mod tokens;
pub mod voting;
