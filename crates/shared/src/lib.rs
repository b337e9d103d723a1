//! Shared types and utilities for the xphub client and development server.

pub mod error;
pub mod leveling;
pub mod models;
pub mod protocol;
pub mod timestamp;

pub use error::*;
pub use leveling::*;
pub use models::*;
pub use protocol::*;
