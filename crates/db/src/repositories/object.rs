//! Object repository.

use std::sync::Arc;

use meshwork_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entities::{Object, Visibility, object};

/// Narrow down object queries.
///
/// Unset fields do not constrain the query; deleted objects are never
/// returned. `object_ids` matches the parent reference, so a comment is found
/// through the post it hangs off.
#[derive(Clone, Debug, Default)]
pub struct ObjectQueryOptions {
    pub id: Option<i64>,
    pub ids: Vec<i64>,
    pub object_ids: Vec<i64>,
    pub owner_ids: Vec<i64>,
    pub types: Vec<String>,
    pub visibilities: Vec<Visibility>,
    pub owned: Option<bool>,
    pub before: Option<DateTimeWithTimeZone>,
    pub limit: Option<u64>,
}

/// Object repository for database operations.
#[derive(Clone)]
pub struct ObjectRepository {
    db: Arc<DatabaseConnection>,
}

impl ObjectRepository {
    /// Create a new object repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn select(app_id: i64, opts: ObjectQueryOptions) -> Select<Object> {
        let mut query = Object::find()
            .filter(object::Column::AppId.eq(app_id))
            .filter(object::Column::Deleted.eq(false));

        if let Some(id) = opts.id {
            query = query.filter(object::Column::Id.eq(id));
        }

        if !opts.ids.is_empty() {
            query = query.filter(object::Column::Id.is_in(opts.ids));
        }

        if !opts.object_ids.is_empty() {
            query = query.filter(object::Column::ObjectId.is_in(opts.object_ids));
        }

        if !opts.owner_ids.is_empty() {
            query = query.filter(object::Column::OwnerId.is_in(opts.owner_ids));
        }

        if !opts.types.is_empty() {
            query = query.filter(object::Column::ObjectType.is_in(opts.types));
        }

        if !opts.visibilities.is_empty() {
            query = query.filter(object::Column::Visibility.is_in(opts.visibilities));
        }

        if let Some(owned) = opts.owned {
            query = query.filter(object::Column::Owned.eq(owned));
        }

        if let Some(before) = opts.before {
            query = query.filter(object::Column::CreatedAt.lt(before));
        }

        query
    }

    /// Query objects matching the given options, newest first.
    pub async fn query(
        &self,
        app_id: i64,
        opts: ObjectQueryOptions,
    ) -> AppResult<Vec<object::Model>> {
        let limit = opts.limit;
        let mut query = Self::select(app_id, opts).order_by_desc(object::Column::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count objects matching the given options.
    pub async fn count(&self, app_id: i64, opts: ObjectQueryOptions) -> AppResult<u64> {
        Self::select(app_id, opts)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::object::TYPE_POST;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_post(id: i64, owner_id: i64) -> object::Model {
        object::Model {
            id,
            app_id: 1,
            owner_id,
            object_id: None,
            object_type: TYPE_POST.to_string(),
            visibility: Visibility::Connection,
            owned: true,
            deleted: false,
            attachments: serde_json::json!([]),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_query_returns_matches() {
        let p1 = test_post(100, 10);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![p1.clone()]])
                .into_connection(),
        );

        let repo = ObjectRepository::new(db);
        let result = repo
            .query(
                1,
                ObjectQueryOptions {
                    ids: vec![100],
                    types: vec![TYPE_POST.to_string()],
                    owned: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 100);
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let repo = ObjectRepository::new(db);
        let result = repo
            .count(1, ObjectQueryOptions::default())
            .await
            .unwrap();

        assert_eq!(result, 2);
    }
}
