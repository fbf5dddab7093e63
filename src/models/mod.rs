//! Core data models for the fruit pantry service.
//!
//! These entities represent the logical structure of buckets and the
//! perishable fruits they hold. They map cleanly to database tables via
//! `sqlx::FromRow` and serialize naturally as JSON via `serde`.

pub mod bucket;
pub mod fruit;
