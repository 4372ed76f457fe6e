//! Event entity (interaction records: likes, follows, app-defined activity).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::visibility::Visibility;

/// Target type tag for events pointing at a user.
pub const TARGET_USER: &str = "tg_user";

/// Reserved event type tag for follow activity.
pub const TYPE_FOLLOW: &str = "tg_follow";

/// Reserved event type tag for friend activity.
pub const TYPE_FRIEND: &str = "tg_friend";

/// Reserved event type tag for likes.
pub const TYPE_LIKE: &str = "tg_like";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Application (tenant) the event belongs to.
    pub app_id: i64,

    /// Owner/actor of the event.
    pub user_id: i64,

    /// Referenced object (e.g. the post a like applies to).
    #[sea_orm(nullable)]
    pub object_id: Option<i64>,

    /// Identifier of the targeted entity, when the event addresses one.
    /// Kept as text since targets may reference external entities.
    #[sea_orm(nullable)]
    pub target_id: Option<String>,

    /// Type tag of the targeted entity (e.g. [`TARGET_USER`]).
    #[sea_orm(nullable)]
    pub target_type: Option<String>,

    /// Type tag; reserved `tg_*` tags or app-defined.
    pub event_type: String,

    pub visibility: Visibility,

    /// First-party events originate from this platform; external ones are
    /// imported.
    #[sea_orm(default_value = true)]
    pub owned: bool,

    /// Disabled events are logically deleted but kept on record.
    #[sea_orm(default_value = true)]
    pub enabled: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
