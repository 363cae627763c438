//! Entity state owned by one sync client.
//!
//! Unlike global stores, every [`EntityStore`] belongs to exactly one
//! connection manager and disappears with it. Consumers only ever see
//! [`DashboardSnapshot`] copies.

pub mod entities;
pub mod snapshot;

pub use entities::EntityStore;
pub use snapshot::DashboardSnapshot;
