//! Business logic services.

#![allow(missing_docs)]

pub mod connection;
pub mod feed;
pub mod like;
pub mod user;

/// Queries only consider records that are not logically deleted.
pub const DEFAULT_ENABLED: bool = true;

/// Feed queries only consider first-party content.
pub const DEFAULT_OWNED: bool = true;

pub use connection::{
    ConnectedUser, ConnectionFeed, ConnectionListOptions, ConnectionService, Relation,
    query_relation, validate_transition,
};
pub use feed::{
    Affiliation, Affiliations, DEFAULT_LIMIT, Feed, FeedEvent, FeedOptions, FeedService, Post,
    PostMap, UserMap,
};
pub use like::{LikeFeed, LikeService};
pub use user::UserService;
