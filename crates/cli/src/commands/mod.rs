//! Subcommand implementations

pub mod messages;
pub mod monitors;
pub mod overview;
