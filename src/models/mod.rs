//! Core data models for the portfolio media service.
//!
//! Stored entities map to SQLite tables via `sqlx::FromRow` and serialize
//! as camelCase JSON via `serde`.

pub mod advertisement;
pub mod media;
pub mod object;
