use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One submission per (task, user). A submission sent back for changes is
/// resubmitted in place rather than superseded by a new row.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub status: SubmissionStatus,

    /// Response payload keyed by requirement tag, stored as a JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,

    pub grade: Option<i32>,
    pub feedback: Option<String>,

    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::task::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub submitted_at: DateTimeUtc,
    pub reviewed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
