//! Core business logic for meshwork.
//!
//! The feed aggregation engine and the connection relationship machinery:
//! given a user, compute a reverse-chronological, deduplicated view of
//! everything relevant to them across the social graph, and gate which edges
//! that aggregation may use.

pub mod services;

pub use services::*;
