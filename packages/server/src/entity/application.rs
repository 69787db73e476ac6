use common::ApplicationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An internship application. At most one per (user, internship), enforced
/// by a unique index.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "application")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub status: ApplicationStatus,

    /// Answers as a JSON array of `{field_id, value}` pairs; empty when the
    /// internship has no custom form.
    #[sea_orm(column_type = "JsonBinary")]
    pub responses: Json,

    pub feedback: Option<String>,

    pub internship_id: i32,
    #[sea_orm(belongs_to, from = "internship_id", to = "id")]
    pub internship: HasOne<super::internship::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub applied_at: DateTimeUtc,
    pub reviewed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
