//! Push token entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A device's push-delivery registration, keyed by the owning user.
///
/// Written by the device registration flow; the fan-out pipeline only reads it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_token")]
pub struct Model {
    /// Owning user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Gateway registration token
    #[sea_orm(column_type = "Text")]
    pub token: String,

    /// Timestamp of the last registration
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
