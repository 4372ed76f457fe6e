//! Connection service.
//!
//! Owns the edge lifecycle: relationship listings, the relation evaluator,
//! and the state machine every edge write passes through.

use std::collections::BTreeMap;

use chrono::Utc;
use meshwork_common::{AppError, AppResult, IdGenerator};
use meshwork_db::{
    entities::{
        connection::{self, ConnectionState, ConnectionType},
        user,
    },
    repositories::{
        ConnectionQueryOptions, ConnectionRepository, UserQueryOptions, UserRepository,
    },
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveEnum, Set};
use serde::Serialize;

use crate::services::{DEFAULT_ENABLED, feed::UserMap};

/// Relationship facets between an origin and a target user.
///
/// Derived per pair on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub is_friend: bool,
    pub is_follower: bool,
    pub is_following: bool,
    pub is_self: bool,
}

/// A resolved user together with its relation to the origin.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedUser {
    #[serde(flatten)]
    pub user: user::Model,
    pub relation: Relation,
}

/// Composite result for connection listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionFeed {
    pub connections: Vec<connection::Model>,
    pub users: Vec<ConnectedUser>,
    pub user_map: UserMap,
}

/// Pagination options for connection listings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionListOptions {
    pub before: Option<DateTimeWithTimeZone>,
    pub limit: usize,
}

impl Default for ConnectionListOptions {
    fn default() -> Self {
        Self {
            before: None,
            limit: 25,
        }
    }
}

/// Evaluate the relation between `origin` and `user_id`.
///
/// `origin == user_id` short-circuits to a pure self relation without a
/// query. Otherwise every confirmed, enabled edge between the pair
/// contributes its facet; multiple edges may set multiple facets.
pub async fn query_relation(
    connections: &ConnectionRepository,
    app_id: i64,
    origin: i64,
    user_id: i64,
) -> AppResult<Relation> {
    if origin == user_id {
        return Ok(Relation {
            is_self: true,
            ..Relation::default()
        });
    }

    let cs = connections
        .query(
            app_id,
            ConnectionQueryOptions {
                enabled: Some(DEFAULT_ENABLED),
                from_ids: vec![origin, user_id],
                to_ids: vec![origin, user_id],
                states: vec![ConnectionState::Confirmed],
                ..Default::default()
            },
        )
        .await?;

    let mut relation = Relation::default();

    for con in &cs {
        if con.connection_type == ConnectionType::Friend {
            relation.is_friend = true;
        }

        if con.connection_type == ConnectionType::Follow && con.from_id == origin {
            relation.is_following = true;
        }

        if con.connection_type == ConnectionType::Follow && con.to_id == origin {
            relation.is_follower = true;
        }
    }

    Ok(relation)
}

/// Validate a connection state transition.
///
/// With no prior edge any initial state is accepted. Otherwise the edge
/// identity (`from_id`, `to_id`, type) is immutable, a self-transition is a
/// no-op success, and the remaining legal moves are
/// pending → confirmed/rejected and confirmed → rejected.
pub fn validate_transition(
    old: Option<&connection::Model>,
    new: &connection::Model,
) -> AppResult<()> {
    let Some(old) = old else {
        return Ok(());
    };

    if old.from_id != new.from_id {
        return Err(AppError::InvalidEntity(format!(
            "from id mismatch {} != {}",
            old.from_id, new.from_id
        )));
    }

    if old.to_id != new.to_id {
        return Err(AppError::InvalidEntity(format!(
            "to id mismatch {} != {}",
            old.to_id, new.to_id
        )));
    }

    if old.connection_type != new.connection_type {
        return Err(AppError::InvalidEntity(format!(
            "type mismatch {} != {}",
            old.connection_type.to_value(),
            new.connection_type.to_value()
        )));
    }

    if old.state == new.state {
        return Ok(());
    }

    let legal = matches!(
        (old.state, new.state),
        (
            ConnectionState::Pending,
            ConnectionState::Confirmed | ConnectionState::Rejected
        ) | (ConnectionState::Confirmed, ConnectionState::Rejected)
    );

    if legal {
        Ok(())
    } else {
        Err(AppError::InvalidEntity(format!(
            "invalid state transition from {} to {}",
            old.state.to_value(),
            new.state.to_value()
        )))
    }
}

/// Connection service for business logic.
#[derive(Clone)]
pub struct ConnectionService {
    connections: ConnectionRepository,
    users: UserRepository,
    id_gen: IdGenerator,
}

impl ConnectionService {
    /// Create a new connection service.
    #[must_use]
    pub const fn new(connections: ConnectionRepository, users: UserRepository) -> Self {
        Self {
            connections,
            users,
            id_gen: IdGenerator::new(),
        }
    }

    /// Evaluate the relation between `origin` and `user_id`.
    pub async fn relation(&self, app_id: i64, origin: i64, user_id: i64) -> AppResult<Relation> {
        query_relation(&self.connections, app_id, origin, user_id).await
    }

    /// Transition a connection edge to a new state, creating it if absent.
    ///
    /// The write only happens once the state machine accepts the move; a
    /// same-state update returns the stored edge untouched.
    pub async fn update(
        &self,
        app_id: i64,
        origin: i64,
        to_id: i64,
        connection_type: ConnectionType,
        state: ConnectionState,
    ) -> AppResult<connection::Model> {
        if origin == to_id {
            return Err(AppError::InvalidEntity(
                "self connections are not allowed".to_string(),
            ));
        }

        let us = self
            .users
            .query(
                app_id,
                UserQueryOptions {
                    ids: vec![to_id],
                    enabled: Some(DEFAULT_ENABLED),
                },
            )
            .await?;

        if us.len() != 1 {
            return Err(AppError::UserNotFound(to_id.to_string()));
        }

        let (from_ids, to_ids) = edge_endpoints(origin, to_id, connection_type);

        let cs = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    from_ids,
                    to_ids,
                    types: vec![connection_type],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;

        let now: DateTimeWithTimeZone = Utc::now().into();

        if let Some(old) = cs.first() {
            if old.state == state {
                return Ok(old.clone());
            }

            // Friend edges may be stored in either direction; the stored
            // endpoints win over the caller's.
            let candidate = connection::Model {
                id: old.id,
                app_id,
                from_id: old.from_id,
                to_id: old.to_id,
                connection_type,
                state,
                enabled: true,
                created_at: old.created_at,
                updated_at: now,
            };

            validate_transition(Some(old), &candidate)?;

            tracing::debug!(
                from_id = old.from_id,
                to_id = old.to_id,
                old_state = %old.state.to_value(),
                new_state = %state.to_value(),
                "Transitioning connection"
            );

            return self
                .connections
                .update(connection::ActiveModel {
                    id: Set(old.id),
                    state: Set(state),
                    enabled: Set(true),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .await;
        }

        self.connections
            .create(connection::ActiveModel {
                id: Set(self.id_gen.next()),
                app_id: Set(app_id),
                from_id: Set(origin),
                to_id: Set(to_id),
                connection_type: Set(connection_type),
                state: Set(state),
                enabled: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await
    }

    /// Disable the edge between `origin` and `to_id`, if it exists.
    ///
    /// Deleting a nonexistent edge is a no-op success.
    pub async fn delete(
        &self,
        app_id: i64,
        origin: i64,
        to_id: i64,
        connection_type: ConnectionType,
    ) -> AppResult<()> {
        let (from_ids, to_ids) = edge_endpoints(origin, to_id, connection_type);

        let cs = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    from_ids,
                    to_ids,
                    types: vec![connection_type],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;

        let Some(con) = cs.into_iter().next() else {
            return Ok(());
        };

        self.connections
            .update(connection::ActiveModel {
                id: Set(con.id),
                enabled: Set(false),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await?;

        Ok(())
    }

    /// All connections of `origin` in the given state, incoming and outgoing,
    /// with the far-end users resolved into the user map.
    pub async fn by_state(
        &self,
        app_id: i64,
        origin: i64,
        state: ConnectionState,
    ) -> AppResult<ConnectionFeed> {
        let outgoing = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    from_ids: vec![origin],
                    states: vec![state],
                    ..Default::default()
                },
            )
            .await?;

        let incoming = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    to_ids: vec![origin],
                    states: vec![state],
                    ..Default::default()
                },
            )
            .await?;

        let mut ids: Vec<i64> = Vec::new();

        for con in outgoing.iter().chain(incoming.iter()) {
            let far = if con.to_id == origin {
                con.from_id
            } else {
                con.to_id
            };

            if !ids.contains(&far) {
                ids.push(far);
            }
        }

        let user_map: UserMap = if ids.is_empty() {
            BTreeMap::new()
        } else {
            self.users
                .query(
                    app_id,
                    UserQueryOptions {
                        ids,
                        enabled: Some(DEFAULT_ENABLED),
                    },
                )
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        let mut connections = outgoing;
        connections.extend(incoming);

        Ok(ConnectionFeed {
            connections,
            users: Vec::new(),
            user_map,
        })
    }

    /// Users who follow `user_id`, with relations evaluated against `origin`.
    pub async fn followers(
        &self,
        app_id: i64,
        origin: i64,
        user_id: i64,
        opts: ConnectionListOptions,
    ) -> AppResult<ConnectionFeed> {
        let cs = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    before: opts.before,
                    enabled: Some(DEFAULT_ENABLED),
                    limit: Some(opts.limit as u64),
                    to_ids: vec![user_id],
                    states: vec![ConnectionState::Confirmed],
                    types: vec![ConnectionType::Follow],
                    ..Default::default()
                },
            )
            .await?;

        let ids = cs.iter().map(|c| c.from_id).collect();

        self.resolve_connected_users(app_id, origin, cs, ids).await
    }

    /// Users `user_id` follows, with relations evaluated against `origin`.
    pub async fn followings(
        &self,
        app_id: i64,
        origin: i64,
        user_id: i64,
        opts: ConnectionListOptions,
    ) -> AppResult<ConnectionFeed> {
        let cs = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    before: opts.before,
                    enabled: Some(DEFAULT_ENABLED),
                    limit: Some(opts.limit as u64),
                    from_ids: vec![user_id],
                    states: vec![ConnectionState::Confirmed],
                    types: vec![ConnectionType::Follow],
                    ..Default::default()
                },
            )
            .await?;

        let ids = cs.iter().map(|c| c.to_id).collect();

        self.resolve_connected_users(app_id, origin, cs, ids).await
    }

    /// Friends of `user_id`, with relations evaluated against `origin`.
    ///
    /// Friend edges are stored in either direction, so both are fetched and
    /// folded before truncating to the limit.
    pub async fn friends(
        &self,
        app_id: i64,
        origin: i64,
        user_id: i64,
        opts: ConnectionListOptions,
    ) -> AppResult<ConnectionFeed> {
        let outgoing = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    before: opts.before,
                    enabled: Some(DEFAULT_ENABLED),
                    limit: Some(opts.limit as u64),
                    from_ids: vec![user_id],
                    states: vec![ConnectionState::Confirmed],
                    types: vec![ConnectionType::Friend],
                    ..Default::default()
                },
            )
            .await?;

        let incoming = self
            .connections
            .query(
                app_id,
                ConnectionQueryOptions {
                    before: opts.before,
                    enabled: Some(DEFAULT_ENABLED),
                    limit: Some(opts.limit as u64),
                    to_ids: vec![user_id],
                    states: vec![ConnectionState::Confirmed],
                    types: vec![ConnectionType::Friend],
                    ..Default::default()
                },
            )
            .await?;

        let mut cs = outgoing;
        cs.extend(incoming);
        cs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cs.truncate(opts.limit);

        let ids = cs
            .iter()
            .map(|con| {
                if con.from_id == user_id {
                    con.to_id
                } else {
                    con.from_id
                }
            })
            .collect();

        self.resolve_connected_users(app_id, origin, cs, ids).await
    }

    async fn resolve_connected_users(
        &self,
        app_id: i64,
        origin: i64,
        connections: Vec<connection::Model>,
        ids: Vec<i64>,
    ) -> AppResult<ConnectionFeed> {
        let us = if ids.is_empty() {
            Vec::new()
        } else {
            self.users
                .query(
                    app_id,
                    UserQueryOptions {
                        ids,
                        enabled: Some(DEFAULT_ENABLED),
                    },
                )
                .await?
        };

        let mut users = Vec::with_capacity(us.len());

        for user in us {
            let relation = query_relation(&self.connections, app_id, origin, user.id).await?;
            users.push(ConnectedUser { user, relation });
        }

        Ok(ConnectionFeed {
            connections,
            users,
            user_map: BTreeMap::new(),
        })
    }
}

/// Endpoint sets used to locate an edge: friend edges match in either stored
/// direction.
fn edge_endpoints(origin: i64, to_id: i64, connection_type: ConnectionType) -> (Vec<i64>, Vec<i64>) {
    if connection_type == ConnectionType::Friend {
        (vec![origin, to_id], vec![origin, to_id])
    } else {
        (vec![origin], vec![to_id])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_connection(
        id: i64,
        from_id: i64,
        to_id: i64,
        connection_type: ConnectionType,
        state: ConnectionState,
    ) -> connection::Model {
        connection::Model {
            id,
            app_id: 1,
            from_id,
            to_id,
            connection_type,
            state,
            enabled: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn test_user(id: i64, username: &str) -> user::Model {
        user::Model {
            id,
            app_id: 1,
            username: username.to_string(),
            token: None,
            enabled: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn mock_repos(
        connection_results: Vec<Vec<connection::Model>>,
        user_results: Vec<Vec<user::Model>>,
    ) -> (ConnectionRepository, UserRepository) {
        let conn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(connection_results)
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(user_results)
                .into_connection(),
        );

        (
            ConnectionRepository::new(conn_db),
            UserRepository::new(user_db),
        )
    }

    // === State machine ===

    #[test]
    fn test_transition_table() {
        use ConnectionState::{Confirmed, Pending, Rejected};

        let legal = [
            (Pending, Pending),
            (Pending, Confirmed),
            (Pending, Rejected),
            (Confirmed, Confirmed),
            (Confirmed, Rejected),
            (Rejected, Rejected),
        ];

        for old_state in [Pending, Confirmed, Rejected] {
            for new_state in [Pending, Confirmed, Rejected] {
                let old = test_connection(1, 10, 20, ConnectionType::Friend, old_state);
                let new = test_connection(1, 10, 20, ConnectionType::Friend, new_state);
                let result = validate_transition(Some(&old), &new);

                if legal.contains(&(old_state, new_state)) {
                    assert!(result.is_ok(), "{old_state:?} -> {new_state:?} must succeed");
                } else {
                    assert!(
                        matches!(result, Err(AppError::InvalidEntity(_))),
                        "{old_state:?} -> {new_state:?} must fail"
                    );
                }
            }
        }
    }

    #[test]
    fn test_transition_without_old_accepts_any_state() {
        for state in [
            ConnectionState::Pending,
            ConnectionState::Confirmed,
            ConnectionState::Rejected,
        ] {
            let new = test_connection(1, 10, 20, ConnectionType::Follow, state);
            assert!(validate_transition(None, &new).is_ok());
        }
    }

    #[test]
    fn test_transition_rejects_identity_changes() {
        let old = test_connection(1, 10, 20, ConnectionType::Follow, ConnectionState::Pending);

        let mut new = old.clone();
        new.from_id = 30;
        assert!(matches!(
            validate_transition(Some(&old), &new),
            Err(AppError::InvalidEntity(msg)) if msg.contains("from id")
        ));

        let mut new = old.clone();
        new.to_id = 30;
        assert!(matches!(
            validate_transition(Some(&old), &new),
            Err(AppError::InvalidEntity(msg)) if msg.contains("to id")
        ));

        let mut new = old.clone();
        new.connection_type = ConnectionType::Friend;
        assert!(matches!(
            validate_transition(Some(&old), &new),
            Err(AppError::InvalidEntity(msg)) if msg.contains("type")
        ));
    }

    // === Relation evaluator ===

    #[tokio::test]
    async fn test_relation_self_short_circuits() {
        // No query results appended: a query would error out.
        let (connections, _) = mock_repos(vec![], vec![]);
        let relation = query_relation(&connections, 1, 10, 10).await.unwrap();

        assert_eq!(
            relation,
            Relation {
                is_self: true,
                is_friend: false,
                is_follower: false,
                is_following: false,
            }
        );
    }

    #[tokio::test]
    async fn test_relation_classifies_edges() {
        let edges = vec![
            test_connection(1, 10, 20, ConnectionType::Follow, ConnectionState::Confirmed),
            test_connection(2, 20, 10, ConnectionType::Follow, ConnectionState::Confirmed),
            test_connection(3, 20, 10, ConnectionType::Friend, ConnectionState::Confirmed),
        ];
        let (connections, _) = mock_repos(vec![edges], vec![]);

        let relation = query_relation(&connections, 1, 10, 20).await.unwrap();

        assert!(relation.is_following);
        assert!(relation.is_follower);
        assert!(relation.is_friend);
        assert!(!relation.is_self);
    }

    // === Update path ===

    #[tokio::test]
    async fn test_update_rejects_self_connection() {
        let (connections, users) = mock_repos(vec![], vec![]);
        let service = ConnectionService::new(connections, users);

        let result = service
            .update(
                1,
                10,
                10,
                ConnectionType::Follow,
                ConnectionState::Confirmed,
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidEntity(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_target() {
        let (connections, users) = mock_repos(vec![], vec![vec![]]);
        let service = ConnectionService::new(connections, users);

        let result = service
            .update(
                1,
                10,
                20,
                ConnectionType::Follow,
                ConnectionState::Confirmed,
            )
            .await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_same_state_is_noop() {
        let existing = test_connection(
            1,
            10,
            20,
            ConnectionType::Friend,
            ConnectionState::Confirmed,
        );
        let (connections, users) =
            mock_repos(vec![vec![existing.clone()]], vec![vec![test_user(20, "g")]]);
        let service = ConnectionService::new(connections, users);

        let result = service
            .update(
                1,
                10,
                20,
                ConnectionType::Friend,
                ConnectionState::Confirmed,
            )
            .await
            .unwrap();

        assert_eq!(result, existing);
    }

    #[tokio::test]
    async fn test_update_rejects_confirmed_to_pending() {
        let existing = test_connection(
            1,
            10,
            20,
            ConnectionType::Friend,
            ConnectionState::Confirmed,
        );
        let (connections, users) = mock_repos(vec![vec![existing]], vec![vec![test_user(20, "g")]]);
        let service = ConnectionService::new(connections, users);

        let result = service
            .update(1, 10, 20, ConnectionType::Friend, ConnectionState::Pending)
            .await;

        assert!(matches!(
            result,
            Err(AppError::InvalidEntity(msg)) if msg.contains("confirmed") && msg.contains("pending")
        ));
    }

    #[tokio::test]
    async fn test_update_confirms_pending_connection() {
        let existing = test_connection(1, 10, 20, ConnectionType::Friend, ConnectionState::Pending);
        let mut confirmed = existing.clone();
        confirmed.state = ConnectionState::Confirmed;

        let conn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![existing]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                }])
                .append_query_results([vec![confirmed.clone()]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![test_user(20, "g")]])
                .into_connection(),
        );

        let service = ConnectionService::new(
            ConnectionRepository::new(conn_db),
            UserRepository::new(user_db),
        );

        let result = service
            .update(
                1,
                10,
                20,
                ConnectionType::Friend,
                ConnectionState::Confirmed,
            )
            .await
            .unwrap();

        assert_eq!(result.state, ConnectionState::Confirmed);
    }

    #[tokio::test]
    async fn test_delete_missing_edge_is_noop() {
        let (connections, users) = mock_repos(vec![vec![]], vec![]);
        let service = ConnectionService::new(connections, users);

        let result = service.delete(1, 10, 20, ConnectionType::Follow).await;

        assert!(result.is_ok());
    }

    // === Listings ===

    #[tokio::test]
    async fn test_by_state_merges_directions() {
        let outgoing = test_connection(1, 10, 20, ConnectionType::Friend, ConnectionState::Pending);
        let incoming = test_connection(2, 30, 10, ConnectionType::Friend, ConnectionState::Pending);

        let (connections, users) = mock_repos(
            vec![vec![outgoing], vec![incoming]],
            vec![vec![test_user(20, "g"), test_user(30, "h")]],
        );
        let service = ConnectionService::new(connections, users);

        let feed = service
            .by_state(1, 10, ConnectionState::Pending)
            .await
            .unwrap();

        assert_eq!(feed.connections.len(), 2);
        assert_eq!(feed.user_map.len(), 2);
        assert!(feed.user_map.contains_key(&20));
        assert!(feed.user_map.contains_key(&30));
    }

    #[tokio::test]
    async fn test_friends_truncates_to_exact_limit() {
        let mut edges = Vec::new();
        for i in 0..3 {
            edges.push(test_connection(
                i,
                10,
                20 + i,
                ConnectionType::Friend,
                ConnectionState::Confirmed,
            ));
        }

        let conn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([edges, Vec::<connection::Model>::new()])
                // Relation queries for the two surviving far-end users.
                .append_query_results([
                    Vec::<connection::Model>::new(),
                    Vec::<connection::Model>::new(),
                ])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![test_user(20, "g"), test_user(21, "h")]])
                .into_connection(),
        );

        let service = ConnectionService::new(
            ConnectionRepository::new(conn_db),
            UserRepository::new(user_db),
        );

        let feed = service
            .friends(
                1,
                10,
                10,
                ConnectionListOptions {
                    before: None,
                    limit: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(feed.connections.len(), 2);
    }
}
