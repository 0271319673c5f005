//! Clock port - source of the current time.
//!
//! Everything that compares against a TTL, cool-down or rate window reads
//! time through this trait so tests can drive it explicitly.

use crate::domain::foundation::Timestamp;

/// Port for reading the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
