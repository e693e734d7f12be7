//! Shared primitive types used across the crate.

/// Surrogate primary key for any stored entity.
pub type EntityId = i64;
