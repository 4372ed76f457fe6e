//! Visibility levels shared by events and objects.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who may see an event or object.
///
/// Stored as the numeric tiers of the wire protocol (10–40) so that range
/// queries (`visibility >= Public`) stay cheap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, DeriveActiveEnum,
    Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to the owner and direct addressees only.
    #[sea_orm(num_value = 10)]
    Private,
    /// Visible to the owner's confirmed connections.
    #[sea_orm(num_value = 20)]
    Connection,
    /// Visible to every user of the application.
    #[sea_orm(num_value = 30)]
    Public,
    /// Surfaced to every user regardless of graph distance.
    #[sea_orm(num_value = 40)]
    Global,
}
