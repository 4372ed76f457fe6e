//! Database repositories.
//!
//! One repository per store-shaped collaborator. Repositories translate
//! store-agnostic query options into SQL and surface database failures as
//! [`meshwork_common::AppError::Database`] unchanged.

#![allow(missing_docs)]

mod connection;
mod event;
mod object;
mod user;

pub use connection::{ConnectionQueryOptions, ConnectionRepository};
pub use event::{EventQueryOptions, EventRepository};
pub use object::{ObjectQueryOptions, ObjectRepository};
pub use user::{UserQueryOptions, UserRepository};
