use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "internship")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown
    pub start_date: DateTimeUtc,

    /// Application form schema stored as a JSON array of content blocks.
    /// NULL until an admin publishes a form.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub form: Option<Json>,

    #[sea_orm(has_many)]
    pub tasks: HasMany<super::task::Entity>,

    #[sea_orm(has_many)]
    pub applications: HasMany<super::application::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
