use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown

    /// 1-based position within the learning path; contiguous per internship.
    pub position: i32,

    /// Days from the internship start date to the deadline. NULL means no
    /// deadline.
    pub deadline_offset_days: Option<i32>,

    /// Content blocks stored as a JSON array.
    #[sea_orm(column_type = "JsonBinary")]
    pub content: Json,

    /// Response requirement tags (github, text, image, pdf) stored as a JSON
    /// array.
    #[sea_orm(column_type = "JsonBinary")]
    pub response_requirements: Json,

    pub internship_id: i32,
    #[sea_orm(belongs_to, from = "internship_id", to = "id")]
    pub internship: HasOne<super::internship::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
