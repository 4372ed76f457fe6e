//! Object entity (generic content items: posts, comments).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::visibility::Visibility;

/// Object type tag for posts.
pub const TYPE_POST: &str = "tg_post";

/// Object type tag for comments.
pub const TYPE_COMMENT: &str = "tg_comment";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "object")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Application (tenant) the object belongs to.
    pub app_id: i64,

    pub owner_id: i64,

    /// Parent object, when this object hangs off another one (a comment
    /// references its post here).
    #[sea_orm(nullable)]
    pub object_id: Option<i64>,

    /// Type tag; reserved `tg_*` tags or app-defined.
    pub object_type: String,

    pub visibility: Visibility,

    /// First-party objects originate from this platform; external ones are
    /// imported.
    #[sea_orm(default_value = true)]
    pub owned: bool,

    /// Deleted objects are invisible to every read path.
    #[sea_orm(default_value = false)]
    pub deleted: bool,

    /// Media and link attachments.
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl ActiveModelBehavior for ActiveModel {}
