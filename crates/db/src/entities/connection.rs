//! Connection entity (typed social edges between users).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Connection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Directed interest edge.
    #[sea_orm(string_value = "follow")]
    Follow,
    /// Mutual edge; either stored direction represents the same relationship.
    #[sea_orm(string_value = "friend")]
    Friend,
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl std::str::FromStr for ConnectionType {
    type Err = meshwork_common::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(Self::Follow),
            "friend" => Ok(Self::Friend),
            other => Err(meshwork_common::AppError::InvalidEntity(format!(
                "unsupported connection type {other}"
            ))),
        }
    }
}

impl std::str::FromStr for ConnectionState {
    type Err = meshwork_common::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(meshwork_common::AppError::InvalidEntity(format!(
                "unsupported connection state {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Application (tenant) the edge belongs to.
    pub app_id: i64,

    /// The user the edge originates from.
    pub from_id: i64,

    /// The user the edge points at. Never equal to `from_id`.
    pub to_id: i64,

    pub connection_type: ConnectionType,

    pub state: ConnectionState,

    /// Disabled edges are logically deleted but kept on record.
    #[sea_orm(default_value = true)]
    pub enabled: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FromId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    From,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ToId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    To,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_str() {
        assert_eq!(
            "pending".parse::<ConnectionState>().unwrap(),
            ConnectionState::Pending
        );
        assert_eq!(
            "confirmed".parse::<ConnectionState>().unwrap(),
            ConnectionState::Confirmed
        );
        assert_eq!(
            "rejected".parse::<ConnectionState>().unwrap(),
            ConnectionState::Rejected
        );
        assert!("deleted".parse::<ConnectionState>().is_err());
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!(
            "follow".parse::<ConnectionType>().unwrap(),
            ConnectionType::Follow
        );
        assert_eq!(
            "friend".parse::<ConnectionType>().unwrap(),
            ConnectionType::Friend
        );
        assert!("block".parse::<ConnectionType>().is_err());
    }
}
