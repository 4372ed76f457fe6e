//! User service.

use meshwork_common::{AppError, AppResult};
use meshwork_db::{entities::user, repositories::UserRepository};

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.users
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Fetch a user by id.
    pub async fn get(&self, app_id: i64, id: i64) -> AppResult<user::Model> {
        self.users
            .find_by_id(app_id, id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: i64, token: Option<&str>) -> user::Model {
        user::Model {
            id,
            app_id: 1,
            username: "ada".to_string(),
            token: token.map(ToString::to_string),
            enabled: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_by_token() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![test_user(10, Some("secret"))]])
                .into_connection(),
        );

        let service = UserService::new(UserRepository::new(db));
        let user = service.authenticate_by_token("secret").await.unwrap();

        assert_eq!(user.id, 10);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token_is_unauthorized() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = UserService::new(UserRepository::new(db));
        let result = service.authenticate_by_token("missing").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
