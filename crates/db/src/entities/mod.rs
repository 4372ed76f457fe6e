//! Database entities.

#![allow(missing_docs)]

pub mod connection;
pub mod event;
pub mod object;
pub mod user;
pub mod visibility;

pub use connection::Entity as Connection;
pub use event::Entity as Event;
pub use object::Entity as Object;
pub use user::Entity as User;
pub use visibility::Visibility;
