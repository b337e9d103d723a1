//! Full screens, each rendered to a string from the query layer.

pub mod dashboard;
pub mod leaderboard;
pub mod profile;
