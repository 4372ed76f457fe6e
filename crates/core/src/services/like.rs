//! Like service.
//!
//! Likes are persisted events of type `tg_like` referencing a post. Creation
//! is idempotent and deletion is a soft disable, so a re-like resurrects the
//! original event.

use chrono::Utc;
use meshwork_common::{AppError, AppResult, IdGenerator};
use meshwork_db::{
    entities::{
        Visibility,
        event::{self, TYPE_LIKE},
        object::{self, TYPE_POST},
    },
    repositories::{
        ConnectionRepository, EventQueryOptions, EventRepository, ObjectQueryOptions,
        ObjectRepository, UserQueryOptions, UserRepository,
    },
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{
    DEFAULT_ENABLED, DEFAULT_OWNED,
    connection::query_relation,
    feed::UserMap,
};

/// A collection of likes with their referenced users.
#[derive(Debug, Default, Serialize)]
pub struct LikeFeed {
    pub likes: Vec<event::Model>,
    pub user_map: UserMap,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    connections: ConnectionRepository,
    events: EventRepository,
    objects: ObjectRepository,
    users: UserRepository,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
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

    /// Like a post on behalf of `origin`.
    ///
    /// Liking an already-liked post returns the existing event; a previously
    /// deleted like is re-enabled instead of duplicated.
    pub async fn create(&self, app_id: i64, origin: i64, post_id: i64) -> AppResult<event::Model> {
        let post = self.find_post(app_id, post_id).await?;
        self.ensure_visible(app_id, origin, &post).await?;

        let es = self
            .events
            .query(
                app_id,
                EventQueryOptions {
                    object_ids: vec![post_id],
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_LIKE.to_string()],
                    user_ids: vec![origin],
                    ..Default::default()
                },
            )
            .await?;

        if let Some(existing) = es.first()
            && existing.enabled
        {
            return Ok(existing.clone());
        }

        let now = Utc::now().into();

        if let Some(existing) = es.into_iter().next() {
            return self
                .events
                .update(event::ActiveModel {
                    id: Set(existing.id),
                    enabled: Set(true),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .await;
        }

        self.events
            .create(event::ActiveModel {
                id: Set(self.id_gen.next()),
                app_id: Set(app_id),
                user_id: Set(origin),
                object_id: Set(Some(post_id)),
                target_id: Set(None),
                target_type: Set(None),
                event_type: Set(TYPE_LIKE.to_string()),
                visibility: Set(post.visibility),
                owned: Set(true),
                enabled: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await
    }

    /// Remove the like of `origin` on a post, if it exists.
    pub async fn delete(&self, app_id: i64, origin: i64, post_id: i64) -> AppResult<()> {
        let post = self.find_post(app_id, post_id).await?;
        self.ensure_visible(app_id, origin, &post).await?;

        let es = self
            .events
            .query(
                app_id,
                EventQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    object_ids: vec![post_id],
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_LIKE.to_string()],
                    user_ids: vec![origin],
                    ..Default::default()
                },
            )
            .await?;

        let Some(like) = es.into_iter().next() else {
            return Ok(());
        };

        self.events
            .update(event::ActiveModel {
                id: Set(like.id),
                enabled: Set(false),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await?;

        Ok(())
    }

    /// All likes on a post, with the liking users resolved.
    pub async fn list(&self, app_id: i64, origin: i64, post_id: i64) -> AppResult<LikeFeed> {
        let post = self.find_post(app_id, post_id).await?;
        self.ensure_visible(app_id, origin, &post).await?;

        let likes = self
            .events
            .query(
                app_id,
                EventQueryOptions {
                    enabled: Some(DEFAULT_ENABLED),
                    object_ids: vec![post_id],
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_LIKE.to_string()],
                    ..Default::default()
                },
            )
            .await?;

        let mut ids: Vec<i64> = Vec::new();

        for like in &likes {
            if !ids.contains(&like.user_id) {
                ids.push(like.user_id);
            }
        }

        let user_map: UserMap = if ids.is_empty() {
            UserMap::new()
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

        Ok(LikeFeed { likes, user_map })
    }

    async fn find_post(&self, app_id: i64, post_id: i64) -> AppResult<object::Model> {
        let ps = self
            .objects
            .query(
                app_id,
                ObjectQueryOptions {
                    id: Some(post_id),
                    owned: Some(DEFAULT_OWNED),
                    types: vec![TYPE_POST.to_string()],
                    ..Default::default()
                },
            )
            .await?;

        ps.into_iter()
            .next()
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))
    }

    /// A post is readable by `origin` iff they own it, it is public/global,
    /// or it has connection visibility and origin is a friend of or follows
    /// the owner. Invisible posts read as not found so their existence does
    /// not leak.
    async fn ensure_visible(
        &self,
        app_id: i64,
        origin: i64,
        post: &object::Model,
    ) -> AppResult<()> {
        if post.owner_id == origin {
            return Ok(());
        }

        match post.visibility {
            Visibility::Public | Visibility::Global => Ok(()),
            Visibility::Connection => {
                let relation =
                    query_relation(&self.connections, app_id, origin, post.owner_id).await?;

                if relation.is_friend || relation.is_following {
                    Ok(())
                } else {
                    Err(AppError::PostNotFound(post.id.to_string()))
                }
            }
            Visibility::Private => Err(AppError::PostNotFound(post.id.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use meshwork_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_post(id: i64, owner_id: i64, visibility: Visibility) -> object::Model {
        object::Model {
            id,
            app_id: 1,
            owner_id,
            object_id: None,
            object_type: TYPE_POST.to_string(),
            visibility,
            owned: true,
            deleted: false,
            attachments: serde_json::json!([]),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn test_like(id: i64, user_id: i64, post_id: i64, enabled: bool) -> event::Model {
        event::Model {
            id,
            app_id: 1,
            user_id,
            object_id: Some(post_id),
            target_id: None,
            target_type: None,
            event_type: TYPE_LIKE.to_string(),
            visibility: Visibility::Connection,
            owned: true,
            enabled,
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

    fn mock_service(
        connection_results: Vec<Vec<meshwork_db::entities::connection::Model>>,
        event_results: Vec<Vec<event::Model>>,
        object_results: Vec<Vec<object::Model>>,
        user_results: Vec<Vec<user::Model>>,
    ) -> LikeService {
        let conn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(connection_results)
                .into_connection(),
        );
        let event_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(event_results)
                .into_connection(),
        );
        let object_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(object_results)
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(user_results)
                .into_connection(),
        );

        LikeService::new(
            ConnectionRepository::new(conn_db),
            EventRepository::new(event_db),
            ObjectRepository::new(object_db),
            UserRepository::new(user_db),
        )
    }

    #[tokio::test]
    async fn test_create_on_missing_post_fails() {
        let service = mock_service(vec![], vec![], vec![Vec::new()], vec![]);

        let result = service.create(1, 10, 999).await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_on_invisible_post_fails() {
        // Connection-visibility post owned by a stranger: no confirmed edge.
        let post = test_post(100, 20, Visibility::Connection);
        let service = mock_service(
            vec![Vec::new()], // relation query finds no edges
            vec![],
            vec![vec![post]],
            vec![],
        );

        let result = service.create(1, 10, 100).await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let post = test_post(100, 10, Visibility::Connection);
        let like = test_like(5, 10, 100, true);

        // Origin owns the post, so no relation query happens.
        let service = mock_service(vec![], vec![vec![like.clone()]], vec![vec![post]], vec![]);

        let result = service.create(1, 10, 100).await.unwrap();

        assert_eq!(result.id, 5);
    }

    #[tokio::test]
    async fn test_delete_without_like_is_noop() {
        let post = test_post(100, 10, Visibility::Connection);
        let service = mock_service(vec![], vec![Vec::new()], vec![vec![post]], vec![]);

        let result = service.delete(1, 10, 100).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_list_resolves_liking_users() {
        let post = test_post(100, 10, Visibility::Global);
        let likes = vec![test_like(5, 20, 100, true), test_like(6, 30, 100, true)];

        let service = mock_service(
            vec![],
            vec![likes],
            vec![vec![post]],
            vec![vec![test_user(20, "g"), test_user(30, "h")]],
        );

        let feed = service.list(1, 10, 100).await.unwrap();

        assert_eq!(feed.likes.len(), 2);
        assert_eq!(feed.user_map.len(), 2);
    }
}
