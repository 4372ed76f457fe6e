//! Connection repository.

use std::sync::Arc;

use meshwork_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{
    Connection,
    connection::{self, ConnectionState, ConnectionType},
};

/// Narrow down connection queries.
///
/// Unset fields do not constrain the query. Time bounds apply to the edge's
/// update time as a `[after, before)` window.
#[derive(Clone, Debug, Default)]
pub struct ConnectionQueryOptions {
    pub from_ids: Vec<i64>,
    pub to_ids: Vec<i64>,
    pub types: Vec<ConnectionType>,
    pub states: Vec<ConnectionState>,
    pub enabled: Option<bool>,
    pub after: Option<DateTimeWithTimeZone>,
    pub before: Option<DateTimeWithTimeZone>,
    pub limit: Option<u64>,
}

/// Connection repository for database operations.
#[derive(Clone)]
pub struct ConnectionRepository {
    db: Arc<DatabaseConnection>,
}

impl ConnectionRepository {
    /// Create a new connection repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Query connections matching the given options, newest first.
    pub async fn query(
        &self,
        app_id: i64,
        opts: ConnectionQueryOptions,
    ) -> AppResult<Vec<connection::Model>> {
        let mut query = Connection::find().filter(connection::Column::AppId.eq(app_id));

        if !opts.from_ids.is_empty() {
            query = query.filter(connection::Column::FromId.is_in(opts.from_ids));
        }

        if !opts.to_ids.is_empty() {
            query = query.filter(connection::Column::ToId.is_in(opts.to_ids));
        }

        if !opts.types.is_empty() {
            query = query.filter(connection::Column::ConnectionType.is_in(opts.types));
        }

        if !opts.states.is_empty() {
            query = query.filter(connection::Column::State.is_in(opts.states));
        }

        if let Some(enabled) = opts.enabled {
            query = query.filter(connection::Column::Enabled.eq(enabled));
        }

        if let Some(after) = opts.after {
            query = query.filter(connection::Column::UpdatedAt.gte(after));
        }

        if let Some(before) = opts.before {
            query = query.filter(connection::Column::UpdatedAt.lt(before));
        }

        query = query.order_by_desc(connection::Column::CreatedAt);

        if let Some(limit) = opts.limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new connection edge.
    pub async fn create(&self, model: connection::ActiveModel) -> AppResult<connection::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing connection edge.
    pub async fn update(&self, model: connection::ActiveModel) -> AppResult<connection::Model> {
        model
            .update(self.db.as_ref())
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

    fn test_connection(id: i64, from_id: i64, to_id: i64) -> connection::Model {
        connection::Model {
            id,
            app_id: 1,
            from_id,
            to_id,
            connection_type: ConnectionType::Follow,
            state: ConnectionState::Confirmed,
            enabled: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_query_returns_matches() {
        let c1 = test_connection(1, 10, 20);
        let c2 = test_connection(2, 10, 30);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![c1.clone(), c2.clone()]])
                .into_connection(),
        );

        let repo = ConnectionRepository::new(db);
        let result = repo
            .query(
                1,
                ConnectionQueryOptions {
                    from_ids: vec![10],
                    states: vec![ConnectionState::Confirmed],
                    enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 1);
        assert_eq!(result[1].id, 2);
    }

    #[tokio::test]
    async fn test_query_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<connection::Model>::new()])
                .into_connection(),
        );

        let repo = ConnectionRepository::new(db);
        let result = repo
            .query(1, ConnectionQueryOptions::default())
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
