//! User repository.

use std::sync::Arc;

use meshwork_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{User, user};

/// Narrow down user queries.
#[derive(Clone, Debug, Default)]
pub struct UserQueryOptions {
    pub ids: Vec<i64>,
    pub enabled: Option<bool>,
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Query users matching the given options.
    pub async fn query(&self, app_id: i64, opts: UserQueryOptions) -> AppResult<Vec<user::Model>> {
        let mut query = User::find().filter(user::Column::AppId.eq(app_id));

        if !opts.ids.is_empty() {
            query = query.filter(user::Column::Id.is_in(opts.ids));
        }

        if let Some(enabled) = opts.enabled {
            query = query.filter(user::Column::Enabled.eq(enabled));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, app_id: i64, id: i64) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::AppId.eq(app_id))
            .filter(user::Column::Id.eq(id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an enabled user by access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .filter(user::Column::Enabled.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

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

    #[tokio::test]
    async fn test_query_by_ids() {
        let u1 = test_user(10, "ada");
        let u2 = test_user(20, "grace");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![u1.clone(), u2.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo
            .query(
                1,
                UserQueryOptions {
                    ids: vec![10, 20],
                    enabled: Some(true),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].username, "ada");
    }

    #[tokio::test]
    async fn test_find_by_token_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("missing").await.unwrap();

        assert!(result.is_none());
    }
}
