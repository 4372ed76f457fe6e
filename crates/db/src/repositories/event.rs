//! Event repository.

use std::sync::Arc;

use meshwork_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use crate::entities::{Event, Visibility, event};

/// Narrow down event queries.
///
/// Unset fields do not constrain the query. Time bounds apply to the event's
/// creation time.
#[derive(Clone, Debug, Default)]
pub struct EventQueryOptions {
    pub ids: Vec<i64>,
    pub user_ids: Vec<i64>,
    pub object_ids: Vec<i64>,
    pub target_ids: Vec<String>,
    pub target_types: Vec<String>,
    pub types: Vec<String>,
    pub visibilities: Vec<Visibility>,
    pub owned: Option<bool>,
    pub enabled: Option<bool>,
    pub after: Option<DateTimeWithTimeZone>,
    pub before: Option<DateTimeWithTimeZone>,
    pub limit: Option<u64>,
}

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn select(app_id: i64, opts: EventQueryOptions) -> Select<Event> {
        let mut query = Event::find().filter(event::Column::AppId.eq(app_id));

        if !opts.ids.is_empty() {
            query = query.filter(event::Column::Id.is_in(opts.ids));
        }

        if !opts.user_ids.is_empty() {
            query = query.filter(event::Column::UserId.is_in(opts.user_ids));
        }

        if !opts.object_ids.is_empty() {
            query = query.filter(event::Column::ObjectId.is_in(opts.object_ids));
        }

        if !opts.target_ids.is_empty() {
            query = query.filter(event::Column::TargetId.is_in(opts.target_ids));
        }

        if !opts.target_types.is_empty() {
            query = query.filter(event::Column::TargetType.is_in(opts.target_types));
        }

        if !opts.types.is_empty() {
            query = query.filter(event::Column::EventType.is_in(opts.types));
        }

        if !opts.visibilities.is_empty() {
            query = query.filter(event::Column::Visibility.is_in(opts.visibilities));
        }

        if let Some(owned) = opts.owned {
            query = query.filter(event::Column::Owned.eq(owned));
        }

        if let Some(enabled) = opts.enabled {
            query = query.filter(event::Column::Enabled.eq(enabled));
        }

        if let Some(after) = opts.after {
            query = query.filter(event::Column::CreatedAt.gt(after));
        }

        if let Some(before) = opts.before {
            query = query.filter(event::Column::CreatedAt.lt(before));
        }

        query
    }

    /// Query events matching the given options, newest first.
    pub async fn query(
        &self,
        app_id: i64,
        opts: EventQueryOptions,
    ) -> AppResult<Vec<event::Model>> {
        let limit = opts.limit;
        let mut query = Self::select(app_id, opts).order_by_desc(event::Column::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count events matching the given options.
    pub async fn count(&self, app_id: i64, opts: EventQueryOptions) -> AppResult<u64> {
        Self::select(app_id, opts)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new event.
    pub async fn create(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing event.
    pub async fn update(&self, model: event::ActiveModel) -> AppResult<event::Model> {
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
    use crate::entities::event::TYPE_LIKE;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_event(id: i64, user_id: i64, object_id: Option<i64>) -> event::Model {
        event::Model {
            id,
            app_id: 1,
            user_id,
            object_id,
            target_id: None,
            target_type: None,
            event_type: TYPE_LIKE.to_string(),
            visibility: Visibility::Connection,
            owned: true,
            enabled: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_query_returns_matches() {
        let e1 = test_event(1, 10, Some(100));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![e1.clone()]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo
            .query(
                1,
                EventQueryOptions {
                    object_ids: vec![100],
                    types: vec![TYPE_LIKE.to_string()],
                    enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 1);
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo
            .count(
                1,
                EventQueryOptions {
                    object_ids: vec![100],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result, 3);
    }
}
