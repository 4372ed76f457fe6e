//! Feed service.
//!
//! Aggregates a user's activity feed across independent origins of the
//! social graph: connection activity, globally visible events, neighbour
//! activity, direct notifications, and comment/like activity on the user's
//! own posts. Every aggregation is request-local; nothing here holds state
//! across calls.

use std::collections::{BTreeMap, HashSet};

use meshwork_common::{AppResult, IdGenerator};
use meshwork_db::{
    entities::{
        Visibility,
        connection::{self, ConnectionState, ConnectionType},
        event::{self, TARGET_USER, TYPE_FOLLOW, TYPE_FRIEND, TYPE_LIKE},
        object::{self, TYPE_COMMENT, TYPE_POST},
        user,
    },
    repositories::{
        ConnectionQueryOptions, ConnectionRepository, EventQueryOptions, EventRepository,
        ObjectQueryOptions, ObjectRepository, UserQueryOptions, UserRepository,
    },
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::services::{DEFAULT_ENABLED, DEFAULT_OWNED};

/// Default number of feed entries returned when the caller gives no limit.
pub const DEFAULT_LIMIT: usize = 25;

/// Window and limit options for a feed request.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Lower bound (inclusive) on entry time.
    pub after: Option<DateTimeWithTimeZone>,
    /// Upper bound (exclusive) on entry time.
    pub before: Option<DateTimeWithTimeZone>,
    /// Maximum number of entries returned.
    pub limit: usize,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// An event as it appears in a feed.
///
/// Synthetic entries are materialized at read time from connection or
/// comment records. They carry a fresh identifier, are never persisted, and
/// are exempt from deduplication.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEvent {
    #[serde(flatten)]
    pub event: event::Model,
    pub synthetic: bool,
}

/// A post with its on-demand engagement enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub object: object::Model,
    pub comment_count: u64,
    pub like_count: u64,
    pub is_liked: bool,
}

impl Post {
    fn new(object: object::Model) -> Self {
        Self {
            object,
            comment_count: 0,
            like_count: 0,
            is_liked: false,
        }
    }
}

/// Posts keyed by id. Ordered so that enrichment queries run in a stable
/// order.
pub type PostMap = BTreeMap<i64, Post>;

/// Users keyed by id.
pub type UserMap = BTreeMap<i64, user::Model>;

/// Composite result of a feed aggregation.
#[derive(Debug, Default, Serialize)]
pub struct Feed {
    pub events: Vec<FeedEvent>,
    pub posts: Vec<Post>,
    pub post_map: PostMap,
    pub user_map: UserMap,
}

/// A connection edge resolved to the user at its far end, relative to some
/// origin.
#[derive(Debug, Clone)]
pub struct Affiliation {
    pub connection: connection::Model,
    pub user: user::Model,
}

/// The graph neighbourhood of an origin: every surviving edge paired with
/// its far-end user. Rebuilt per request, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Affiliations {
    entries: Vec<Affiliation>,
}

impl Affiliations {
    /// All edges.
    #[must_use]
    pub fn connections(&self) -> Vec<connection::Model> {
        self.entries.iter().map(|a| a.connection.clone()).collect()
    }

    /// Follow edges pointing at the origin.
    #[must_use]
    pub fn followers(&self, origin: i64) -> Vec<connection::Model> {
        self.entries
            .iter()
            .filter(|a| {
                a.connection.connection_type == ConnectionType::Follow
                    && a.connection.from_id != origin
            })
            .map(|a| a.connection.clone())
            .collect()
    }

    /// Follow edges originating from the origin.
    #[must_use]
    pub fn followings(&self, origin: i64) -> Vec<connection::Model> {
        self.entries
            .iter()
            .filter(|a| {
                a.connection.connection_type == ConnectionType::Follow
                    && a.connection.to_id != origin
            })
            .map(|a| a.connection.clone())
            .collect()
    }

    /// Friend edges touching the origin.
    #[must_use]
    pub fn friends(&self, origin: i64) -> Vec<connection::Model> {
        self.entries
            .iter()
            .filter(|a| {
                a.connection.connection_type == ConnectionType::Friend
                    && (a.connection.from_id == origin || a.connection.to_id == origin)
            })
            .map(|a| a.connection.clone())
            .collect()
    }

    /// Without the follow edges pointing at the origin.
    #[must_use]
    pub fn filter_followers(&self, origin: i64) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|a| {
                    !(a.connection.connection_type == ConnectionType::Follow
                        && a.connection.to_id == origin)
                })
                .cloned()
                .collect(),
        }
    }

    /// Without the follow edges originating from the origin.
    #[must_use]
    pub fn filter_followings(&self, origin: i64) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|a| {
                    !(a.connection.connection_type == ConnectionType::Follow
                        && a.connection.from_id == origin)
                })
                .cloned()
                .collect(),
        }
    }

    /// Without the friend edges.
    #[must_use]
    pub fn filter_friends(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|a| a.connection.connection_type != ConnectionType::Friend)
                .cloned()
                .collect(),
        }
    }

    /// Deduplicated far-end user ids, in first-seen order.
    #[must_use]
    pub fn user_ids(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for affiliation in &self.entries {
            if seen.insert(affiliation.user.id) {
                ids.push(affiliation.user.id);
            }
        }

        ids
    }

    /// Deduplicated far-end users, in first-seen order.
    #[must_use]
    pub fn users(&self) -> Vec<user::Model> {
        let mut seen = HashSet::new();
        let mut users = Vec::new();

        for affiliation in &self.entries {
            if seen.insert(affiliation.user.id) {
                users.push(affiliation.user.clone());
            }
        }

        users
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// One producer of candidate feed entries. Variants holding an empty id set
/// short-circuit without issuing a query.
#[derive(Debug, Clone)]
enum FeedSource {
    /// Synthesize one follow/friend event per confirmed edge.
    Connections { connections: Vec<connection::Model> },
    /// Events visible to everyone.
    Global,
    /// Events owned by the given users with connection/public visibility.
    Neighbours { user_ids: Vec<i64> },
    /// Events targeting the origin user directly.
    Target { origin: i64 },
    /// Synthesize one event per comment on the given posts.
    Comments { post_ids: Vec<i64> },
    /// Persisted like events on the given posts.
    Likes { post_ids: Vec<i64> },
}

/// Predicate deciding whether an event is dropped from a feed.
type Condition<'a> = Box<dyn FnMut(&FeedEvent) -> bool + 'a>;

/// Drops persisted events whose id has already been seen. First occurrence
/// wins; synthetic entries are always unique and pass through.
fn condition_duplicate<'a>() -> Condition<'a> {
    let mut seen = HashSet::new();

    Box::new(move |fe: &FeedEvent| {
        if fe.synthetic {
            return false;
        }

        !seen.insert(fe.event.id)
    })
}

/// Drops events referencing an object absent from the post map: the object
/// was deleted, is not a post, or failed resolution.
fn condition_post_missing<'a>(posts: &'a PostMap) -> Condition<'a> {
    Box::new(move |fe: &FeedEvent| {
        fe.event
            .object_id
            .is_some_and(|id| !posts.contains_key(&id))
    })
}

/// Keeps only events for which no condition holds.
fn filter_events(events: Vec<FeedEvent>, conditions: &mut [Condition<'_>]) -> Vec<FeedEvent> {
    events
        .into_iter()
        .filter(|fe| !conditions.iter_mut().any(|condition| condition(fe)))
        .collect()
}

/// Actor and targeted-user ids referenced by the given events.
fn event_user_ids(events: &[FeedEvent]) -> Vec<i64> {
    let mut ids = Vec::new();

    for fe in events {
        ids.push(fe.event.user_id);

        if fe.event.target_type.as_deref() == Some(TARGET_USER)
            && let Some(target_id) = &fe.event.target_id
            && let Ok(id) = target_id.parse::<i64>()
        {
            // Unparsable targets are skipped; the only effect is a missing
            // entry in the user map.
            ids.push(id);
        }
    }

    ids
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    connections: ConnectionRepository,
    events: EventRepository,
    objects: ObjectRepository,
    users: UserRepository,
    id_gen: IdGenerator,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        connections: ConnectionRepository,
        events: EventRepository,
        objects: ObjectRepository,
        users: UserRepository,
    ) -> Self {
        Self {
            connections,
            events,
            objects,
            users,
            id_gen: IdGenerator::new(),
        }
    }

    /// Events from the interest and social graph of the given user.
    pub async fn events(&self, app_id: i64, origin: i64, opts: FeedOptions) -> AppResult<Feed> {
        let (feed, _) = self.event_feed(app_id, origin, &opts).await?;

        Ok(feed)
    }

    /// Events and posts from the interest and social graph of the given
    /// user.
    pub async fn news(
        &self,
        app_id: i64,
        origin: i64,
        event_opts: FeedOptions,
        post_opts: FeedOptions,
    ) -> AppResult<Feed> {
        let (mut feed, neighbour_ids) = self.event_feed(app_id, origin, &event_opts).await?;

        let mut posts = self
            .connection_posts(app_id, &post_opts, neighbour_ids)
            .await?;
        posts.extend(self.global_posts(app_id, &post_opts).await?);

        posts.sort_by(|a, b| b.object.created_at.cmp(&a.object.created_at));
        posts.truncate(post_opts.limit);

        self.fill_users(
            app_id,
            &mut feed.user_map,
            posts.iter().map(|p| p.object.owner_id).collect(),
        )
        .await?;
        self.enrich_counts(app_id, posts.iter_mut()).await?;
        self.enrich_is_liked(app_id, origin, posts.iter_mut())
            .await?;

        feed.posts = posts;

        Ok(feed)
    }

    /// Events which target the origin user and their content: comments and
    /// likes on the user's posts, inbound connection activity, direct
    /// notifications.
    pub async fn notifications_self(
        &self,
        app_id: i64,
        origin: i64,
        opts: FeedOptions,
    ) -> AppResult<Feed> {
        let am = self.neighbours(app_id, origin, None, &opts).await?;
        let own_posts = self.user_posts(app_id, origin).await?;
        let post_ids: Vec<i64> = own_posts.iter().map(|p| p.object.id).collect();

        let inbound = am.filter_followings(origin);

        let sources = vec![
            FeedSource::Comments {
                post_ids: post_ids.clone(),
            },
            FeedSource::Connections {
                connections: inbound.connections(),
            },
            FeedSource::Likes { post_ids },
            FeedSource::Target { origin },
        ];

        let events = self.collect(app_id, sources, &opts).await?;

        // No missing-referent filter here: notifications may reference
        // content the post map does not carry.
        let mut events = {
            let mut conditions = [condition_duplicate()];
            filter_events(events, &mut conditions)
        };

        events.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));
        events.truncate(opts.limit);

        let mut user_map: UserMap = inbound.users().into_iter().map(|u| (u.id, u)).collect();
        self.fill_users(app_id, &mut user_map, event_user_ids(&events))
            .await?;
        self.fill_users(
            app_id,
            &mut user_map,
            own_posts.iter().map(|p| p.object.owner_id).collect(),
        )
        .await?;

        let post_map: PostMap = own_posts.into_iter().map(|p| (p.object.id, p)).collect();

        Ok(Feed {
            events,
            posts: Vec::new(),
            post_map,
            user_map,
        })
    }

    /// Posts from the interest and social graph of the given user.
    pub async fn posts(&self, app_id: i64, origin: i64, opts: FeedOptions) -> AppResult<Feed> {
        let am = self.neighbours(app_id, origin, None, &opts).await?;
        let neighbours = am.filter_followers(origin);

        let mut posts = self
            .connection_posts(app_id, &opts, neighbours.user_ids())
            .await?;
        posts.extend(self.global_posts(app_id, &opts).await?);

        posts.sort_by(|a, b| b.object.created_at.cmp(&a.object.created_at));
        posts.truncate(opts.limit);

        let mut user_map: UserMap = am.users().into_iter().map(|u| (u.id, u)).collect();
        self.fill_users(
            app_id,
            &mut user_map,
            posts.iter().map(|p| p.object.owner_id).collect(),
        )
        .await?;

        self.enrich_counts(app_id, posts.iter_mut()).await?;
        self.enrich_is_liked(app_id, origin, posts.iter_mut())
            .await?;

        Ok(Feed {
            events: Vec::new(),
            posts,
            post_map: PostMap::new(),
            user_map,
        })
    }

    /// The shared event aggregation pipeline: collect from all sources,
    /// resolve referenced posts, filter, enrich, sort, truncate, resolve
    /// users. Also returns the first-degree neighbour ids for callers that
    /// fetch posts on top.
    async fn event_feed(
        &self,
        app_id: i64,
        origin: i64,
        opts: &FeedOptions,
    ) -> AppResult<(Feed, Vec<i64>)> {
        let am = self.neighbours(app_id, origin, None, opts).await?;
        let neighbours = am.filter_followers(origin);
        let neighbour_ids = neighbours.user_ids();

        let mut sources = vec![
            FeedSource::Connections {
                connections: am.connections(),
            },
            FeedSource::Global,
            FeedSource::Neighbours {
                user_ids: neighbour_ids.clone(),
            },
            FeedSource::Target { origin },
        ];

        let mut seed_users = am.users();

        // Walk one hop further: connection activity of first-degree
        // neighbours, never crossing back over the edge that produced them.
        for user in neighbours.users() {
            let second = self.neighbours(app_id, user.id, Some(origin), opts).await?;

            let mut connections = second.followings(user.id);
            connections.extend(second.friends(user.id));

            sources.push(FeedSource::Connections { connections });
            seed_users.extend(second.users());
        }

        let events = self.collect(app_id, sources, opts).await?;

        tracing::debug!(
            origin = origin,
            candidates = events.len(),
            "Collected feed candidates"
        );

        let mut posts = self.extract_posts(app_id, &events).await?;

        let mut events = {
            let mut conditions = [condition_duplicate(), condition_post_missing(&posts)];
            filter_events(events, &mut conditions)
        };

        let referenced: HashSet<i64> = events.iter().filter_map(|fe| fe.event.object_id).collect();
        posts.retain(|id, _| referenced.contains(id));

        self.enrich_counts(app_id, posts.values_mut()).await?;
        self.enrich_is_liked(app_id, origin, posts.values_mut())
            .await?;

        events.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));
        events.truncate(opts.limit);

        let mut user_map: UserMap = seed_users.into_iter().map(|u| (u.id, u)).collect();
        self.fill_users(app_id, &mut user_map, event_user_ids(&events))
            .await?;
        self.fill_users(
            app_id,
            &mut user_map,
            posts.values().map(|p| p.object.owner_id).collect(),
        )
        .await?;

        let feed = Feed {
            events,
            posts: Vec::new(),
            post_map: posts,
            user_map,
        };

        Ok((feed, neighbour_ids))
    }

    /// Build the affiliation set of `origin`.
    ///
    /// Fetches the origin's outgoing follow edges and friend edges in both
    /// directions; when no exclusion root is given (first-degree build) the
    /// windowed inbound follow edges join as well. Edges touching `root` are
    /// dropped so a second-degree walk never crosses back over the edge that
    /// produced it. Far-end users that cannot be resolved drop their edge
    /// silently.
    async fn neighbours(
        &self,
        app_id: i64,
        origin: i64,
        root: Option<i64>,
        opts: &FeedOptions,
    ) -> AppResult<Affiliations> {
        let mut edges = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    from_ids: vec![origin],
                    states: vec![ConnectionState::Confirmed],
                    types: vec![ConnectionType::Follow],
                    ..Default::default()
                },
            )
            .await?;

        edges.extend(
            self.connections
                .query(
                    app_id,
                    ConnectionQueryOptions {
                        enabled: Some(DEFAULT_ENABLED),
                        from_ids: vec![origin],
                        states: vec![ConnectionState::Confirmed],
                        types: vec![ConnectionType::Friend],
                        ..Default::default()
                    },
                )
                .await?,
        );

        edges.extend(
            self.connections
                .query(
                    app_id,
                    ConnectionQueryOptions {
                        enabled: Some(DEFAULT_ENABLED),
                        to_ids: vec![origin],
                        states: vec![ConnectionState::Confirmed],
                        types: vec![ConnectionType::Friend],
                        ..Default::default()
                    },
                )
                .await?,
        );

        if root.is_none() {
            edges.extend(
                self.connections
                    .query(
                        app_id,
                        ConnectionQueryOptions {
                            after: opts.after,
                            before: opts.before,
                            enabled: Some(DEFAULT_ENABLED),
                            limit: Some(opts.limit as u64),
                            states: vec![ConnectionState::Confirmed],
                            to_ids: vec![origin],
                            types: vec![ConnectionType::Follow],
                            ..Default::default()
                        },
                    )
                    .await?,
            );
        }

        let mut kept = Vec::new();
        let mut ids = Vec::new();

        for con in edges {
            if root == Some(con.from_id) || root == Some(con.to_id) {
                continue;
            }

            let far = if con.to_id == origin {
                con.from_id
            } else {
                con.to_id
            };

            ids.push(far);
            kept.push(con);
        }

        if ids.is_empty() {
            return Ok(Affiliations::default());
        }

        let users = self
            .users
            .query(
                app_id,
                UserQueryOptions {
                    ids,
                    enabled: Some(DEFAULT_ENABLED),
                },
            )
            .await?;

        let user_map: BTreeMap<i64, user::Model> =
            users.into_iter().map(|u| (u.id, u)).collect();

        let entries = kept
            .into_iter()
            .filter_map(|con| {
                let far = if con.to_id == origin {
                    con.from_id
                } else {
                    con.to_id
                };

                user_map.get(&far).map(|user| Affiliation {
                    connection: con,
                    user: user.clone(),
                })
            })
            .collect();

        Ok(Affiliations { entries })
    }

    /// Run every source in order and concatenate the results.
    async fn collect(
        &self,
        app_id: i64,
        sources: Vec<FeedSource>,
        opts: &FeedOptions,
    ) -> AppResult<Vec<FeedEvent>> {
        let mut events = Vec::new();

        for source in sources {
            events.extend(self.run_source(app_id, source, opts).await?);
        }

        Ok(events)
    }

    async fn run_source(
        &self,
        app_id: i64,
        source: FeedSource,
        opts: &FeedOptions,
    ) -> AppResult<Vec<FeedEvent>> {
        match source {
            FeedSource::Connections { connections } => {
                Ok(self.connection_events(&connections, opts))
            }
            FeedSource::Global => {
                let es = self
                    .events
                    .query(
                        app_id,
                        EventQueryOptions {
                            enabled: Some(DEFAULT_ENABLED),
                            visibilities: vec![Visibility::Global],
                            after: opts.after,
                            before: opts.before,
                            limit: Some(opts.limit as u64),
                            ..Default::default()
                        },
                    )
                    .await?;

                Ok(persisted(es))
            }
            FeedSource::Neighbours { user_ids } => {
                if user_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let es = self
                    .events
                    .query(
                        app_id,
                        EventQueryOptions {
                            enabled: Some(DEFAULT_ENABLED),
                            user_ids,
                            visibilities: vec![Visibility::Connection, Visibility::Public],
                            after: opts.after,
                            before: opts.before,
                            limit: Some(opts.limit as u64),
                            ..Default::default()
                        },
                    )
                    .await?;

                Ok(persisted(es))
            }
            FeedSource::Target { origin } => {
                let es = self
                    .events
                    .query(
                        app_id,
                        EventQueryOptions {
                            enabled: Some(DEFAULT_ENABLED),
                            target_ids: vec![origin.to_string()],
                            target_types: vec![TARGET_USER.to_string()],
                            visibilities: vec![Visibility::Private],
                            after: opts.after,
                            before: opts.before,
                            limit: Some(opts.limit as u64),
                            ..Default::default()
                        },
                    )
                    .await?;

                Ok(persisted(es))
            }
            FeedSource::Comments { post_ids } => {
                if post_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let comments = self
                    .objects
                    .query(
                        app_id,
                        ObjectQueryOptions {
                            object_ids: post_ids,
                            owned: Some(DEFAULT_OWNED),
                            types: vec![TYPE_COMMENT.to_string()],
                            ..Default::default()
                        },
                    )
                    .await?;

                Ok(self.comment_events(&comments))
            }
            FeedSource::Likes { post_ids } => {
                if post_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let es = self
                    .events
                    .query(
                        app_id,
                        EventQueryOptions {
                            enabled: Some(DEFAULT_ENABLED),
                            object_ids: post_ids,
                            owned: Some(DEFAULT_OWNED),
                            types: vec![TYPE_LIKE.to_string()],
                            after: opts.after,
                            before: opts.before,
                            limit: Some(opts.limit as u64),
                            ..Default::default()
                        },
                    )
                    .await?;

                Ok(persisted(es))
            }
        }
    }

    /// Synthesize one follow/friend event per confirmed edge inside the
    /// `[after, before)` window on the edge's update time.
    fn connection_events(
        &self,
        connections: &[connection::Model],
        opts: &FeedOptions,
    ) -> Vec<FeedEvent> {
        let mut events = Vec::new();

        for con in connections {
            if con.state != ConnectionState::Confirmed {
                continue;
            }

            if let Some(after) = opts.after
                && con.updated_at < after
            {
                continue;
            }

            if let Some(before) = opts.before
                && con.updated_at >= before
            {
                continue;
            }

            let event_type = match con.connection_type {
                ConnectionType::Follow => TYPE_FOLLOW,
                ConnectionType::Friend => TYPE_FRIEND,
            };

            events.push(FeedEvent {
                event: event::Model {
                    id: self.id_gen.next(),
                    app_id: con.app_id,
                    user_id: con.from_id,
                    object_id: None,
                    target_id: Some(con.to_id.to_string()),
                    target_type: Some(TARGET_USER.to_string()),
                    event_type: event_type.to_string(),
                    visibility: Visibility::Private,
                    owned: true,
                    enabled: true,
                    created_at: con.created_at,
                    updated_at: con.updated_at,
                },
                synthetic: true,
            });
        }

        events.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));

        events
    }

    /// Synthesize one event per comment.
    fn comment_events(&self, comments: &[object::Model]) -> Vec<FeedEvent> {
        comments
            .iter()
            .map(|comment| FeedEvent {
                event: event::Model {
                    id: self.id_gen.next(),
                    app_id: comment.app_id,
                    user_id: comment.owner_id,
                    object_id: comment.object_id,
                    target_id: None,
                    target_type: None,
                    event_type: TYPE_COMMENT.to_string(),
                    visibility: Visibility::Private,
                    owned: true,
                    enabled: true,
                    created_at: comment.created_at,
                    updated_at: comment.updated_at,
                },
                synthetic: true,
            })
            .collect()
    }

    /// Resolve the objects referenced by the given events into a post map.
    /// Non-post and unresolvable references stay absent.
    async fn extract_posts(&self, app_id: i64, events: &[FeedEvent]) -> AppResult<PostMap> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for fe in events {
            if let Some(id) = fe.event.object_id
                && seen.insert(id)
            {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Ok(PostMap::new());
        }

        let os = self
            .objects
            .query(
                app_id,
                ObjectQueryOptions {
                    ids,
                    ..Default::default()
                },
            )
            .await?;

        let mut posts = PostMap::new();

        for object in os {
            if object.object_type == TYPE_POST && object.owned {
                posts.insert(object.id, Post::new(object));
            }
        }

        Ok(posts)
    }

    /// Posts owned by the given users with connection/public visibility.
    async fn connection_posts(
        &self,
        app_id: i64,
        opts: &FeedOptions,
        owner_ids: Vec<i64>,
    ) -> AppResult<Vec<Post>> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let os = self
            .objects
            .query(
                app_id,
                ObjectQueryOptions {
                    owner_ids,
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_POST.to_string()],
                    visibilities: vec![Visibility::Connection, Visibility::Public],
                    before: opts.before,
                    limit: Some(opts.limit as u64),
                    ..Default::default()
                },
            )
            .await?;

        Ok(os.into_iter().map(Post::new).collect())
    }

    /// Posts visible to everyone.
    async fn global_posts(&self, app_id: i64, opts: &FeedOptions) -> AppResult<Vec<Post>> {
        let os = self
            .objects
            .query(
                app_id,
                ObjectQueryOptions {
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_POST.to_string()],
                    visibilities: vec![Visibility::Global],
                    before: opts.before,
                    limit: Some(opts.limit as u64),
                    ..Default::default()
                },
            )
            .await?;

        Ok(os.into_iter().map(Post::new).collect())
    }

    /// All first-party posts owned by `origin`.
    async fn user_posts(&self, app_id: i64, origin: i64) -> AppResult<Vec<Post>> {
        let os = self
            .objects
            .query(
                app_id,
                ObjectQueryOptions {
                    owned: Some(DEFAULT_OWNED),
                    owner_ids: vec![origin],
                    types: vec![TYPE_POST.to_string()],
                    ..Default::default()
                },
            )
            .await?;

        Ok(os.into_iter().map(Post::new).collect())
    }

    /// Attach comment and like counts to every post.
    ///
    /// Runs strictly after filtering so dropped posts are never enriched.
    async fn enrich_counts<'a, I>(&self, app_id: i64, posts: I) -> AppResult<()>
    where
        I: Iterator<Item = &'a mut Post>,
    {
        for post in posts {
            let id = post.object.id;

            post.comment_count = self
                .objects
                .count(
                    app_id,
                    ObjectQueryOptions {
                        object_ids: vec![id],
                        owned: Some(DEFAULT_OWNED),
                        types: vec![TYPE_COMMENT.to_string()],
                        ..Default::default()
                    },
                )
                .await?;

            post.like_count = self
                .events
                .count(
                    app_id,
                    EventQueryOptions {
                        enabled: Some(DEFAULT_ENABLED),
                        object_ids: vec![id],
                        owned: Some(DEFAULT_OWNED),
                        types: vec![TYPE_LIKE.to_string()],
                        ..Default::default()
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Flag every post the origin has liked.
    async fn enrich_is_liked<'a, I>(&self, app_id: i64, origin: i64, posts: I) -> AppResult<()>
    where
        I: Iterator<Item = &'a mut Post>,
    {
        for post in posts {
            let likes = self
                .events
                .count(
                    app_id,
                    EventQueryOptions {
                        enabled: Some(DEFAULT_ENABLED),
                        object_ids: vec![post.object.id],
                        owned: Some(DEFAULT_OWNED),
                        types: vec![TYPE_LIKE.to_string()],
                        user_ids: vec![origin],
                        ..Default::default()
                    },
                )
                .await?;

            post.is_liked = likes > 0;
        }

        Ok(())
    }

    /// Batch-resolve every id not already present in the user map.
    async fn fill_users(
        &self,
        app_id: i64,
        user_map: &mut UserMap,
        ids: Vec<i64>,
    ) -> AppResult<()> {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();

        for id in ids {
            if !user_map.contains_key(&id) && seen.insert(id) {
                missing.push(id);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        let users = self
            .users
            .query(
                app_id,
                UserQueryOptions {
                    ids: missing,
                    enabled: Some(DEFAULT_ENABLED),
                },
            )
            .await?;

        for user in users {
            user_map.insert(user.id, user);
        }

        Ok(())
    }
}

fn persisted(events: Vec<event::Model>) -> Vec<FeedEvent> {
    events
        .into_iter()
        .map(|event| FeedEvent {
            event,
            synthetic: false,
        })
        .collect()
}
