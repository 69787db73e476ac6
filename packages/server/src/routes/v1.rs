use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/internships", internship_routes())
        .nest("/applications", application_routes())
        .nest("/tasks", task_submission_routes())
        .nest("/submissions", submission_routes())
}

fn internship_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::internship::list_internships,
            handlers::internship::create_internship
        ))
        .routes(routes!(
            handlers::internship::get_internship,
            handlers::internship::update_internship,
            handlers::internship::delete_internship
        ))
        .routes(routes!(
            handlers::internship::get_application_form,
            handlers::internship::put_application_form
        ))
        .routes(routes!(handlers::application::submit_application))
        .routes(routes!(handlers::progress::get_progress))
        .nest("/{id}/tasks", task_routes())
}

fn task_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::task::list_tasks,
            handlers::task::create_task
        ))
        .routes(routes!(handlers::task::reorder_tasks))
        .routes(routes!(
            handlers::task::get_task,
            handlers::task::update_task,
            handlers::task::delete_task
        ))
}

fn application_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::application::list_applications))
        .routes(routes!(handlers::application::get_application))
        .routes(routes!(handlers::application::review_application))
}

fn task_submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::submission::create_submission))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::list_submissions))
        .routes(routes!(
            handlers::submission::get_submission,
            handlers::submission::resubmit_submission
        ))
        .routes(routes!(handlers::review::review_submission))
}
