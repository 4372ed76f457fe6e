//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Application (tenant) the user belongs to.
    pub app_id: i64,

    pub username: String,

    /// Access token for API authentication.
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing, default)]
    pub token: Option<String>,

    /// Disabled users are invisible to every query that resolves users.
    #[sea_orm(default_value = true)]
    pub enabled: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
