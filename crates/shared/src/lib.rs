//! Shared wire protocol and entity models for pulseboard dashboards.

pub mod models;
pub mod protocol;
pub mod error;

pub use models::*;
pub use protocol::*;
pub use error::*;
