use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{application, submission};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite unique indexes, so we
/// create them manually on startup. Both back invariants the handlers also
/// check: at most one application per (internship, user) and one submission
/// row per (task, user).
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_application_internship_user")
        .table(application::Entity)
        .col(application::Column::InternshipId)
        .col(application::Column::UserId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index uq_application_internship_user exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index uq_application_internship_user: {}", e);
        }
    }

    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_submission_task_user")
        .table(submission::Entity)
        .col(submission::Column::TaskId)
        .col(submission::Column::UserId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index uq_submission_task_user exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index uq_submission_task_user: {}", e);
        }
    }

    Ok(())
}
