use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn tasks_are_appended_with_contiguous_positions() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Positions").await;

    let first = app.create_task(internship_id, &token, "First").await;
    let second = app.create_task(internship_id, &token, "Second").await;

    let res = app
        .get_with_token(&routes::task(internship_id, first), &token)
        .await;
    assert_eq!(res.body["position"], 1);
    let res = app
        .get_with_token(&routes::task(internship_id, second), &token)
        .await;
    assert_eq!(res.body["position"], 2);
}

#[tokio::test]
async fn task_requires_title_and_description() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Strict").await;

    let res = app
        .post_with_token(
            &routes::tasks(internship_id),
            &json!({"title": "Has title", "description": "   "}),
            &token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn task_content_blocks_are_validated_like_forms() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Content Checks").await;

    let res = app
        .post_with_token(
            &routes::tasks(internship_id),
            &json!({
                "title": "Watch and answer",
                "description": "Intro video plus a quiz.",
                "content": [
                    {"id": "v", "label": "Intro", "type": "video",
                     "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"},
                    {"id": "q", "label": "", "type": "text"},
                ],
            }),
            &token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn reorder_assigns_positions_by_array_index() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Reorder").await;
    let a = app.create_task(internship_id, &token, "A").await;
    let b = app.create_task(internship_id, &token, "B").await;
    let c = app.create_task(internship_id, &token, "C").await;

    let res = app
        .put_with_token(
            &routes::tasks_reorder(internship_id),
            &json!({"task_ids": [c, a, b]}),
            &token,
        )
        .await;
    assert_eq!(res.status, 204, "reorder failed: {}", res.text);

    let res = app.get_with_token(&routes::tasks(internship_id), &token).await;
    let tasks = res.body.as_array().unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
    let positions: Vec<i64> = tasks.iter().map(|t| t["position"].as_i64().unwrap()).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn reorder_must_cover_exactly_the_current_tasks() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Exact Set").await;
    let a = app.create_task(internship_id, &token, "A").await;
    app.create_task(internship_id, &token, "B").await;

    let res = app
        .put_with_token(
            &routes::tasks_reorder(internship_id),
            &json!({"task_ids": [a]}),
            &token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let res = app
        .put_with_token(
            &routes::tasks_reorder(internship_id),
            &json!({"task_ids": [a, a]}),
            &token,
        )
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn delete_closes_the_position_gap() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Gaps").await;
    let a = app.create_task(internship_id, &token, "A").await;
    let b = app.create_task(internship_id, &token, "B").await;
    let c = app.create_task(internship_id, &token, "C").await;

    let res = app
        .delete_with_token(&routes::task(internship_id, b), &token)
        .await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::task(internship_id, a), &token).await;
    assert_eq!(res.body["position"], 1);
    let res = app.get_with_token(&routes::task(internship_id, c), &token).await;
    assert_eq!(res.body["position"], 2);
}

#[tokio::test]
async fn delete_is_blocked_while_submissions_exist() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(4, "dave");
    let internship_id = app.create_internship(&admin, "In Use").await;
    let task_id = app.create_task(internship_id, &admin, "Submitted").await;
    app.create_submission(task_id, &intern).await;

    let res = app
        .delete_with_token(&routes::task(internship_id, task_id), &admin)
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn patch_can_clear_the_deadline() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let internship_id = app.create_internship(&token, "Deadlines").await;
    let task_id = app.create_task(internship_id, &token, "Flexible").await;

    let res = app
        .patch_with_token(
            &routes::task(internship_id, task_id),
            &json!({"deadline_offset_days": null}),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "patch failed: {}", res.text);
    assert!(res.body["deadline_offset_days"].is_null());
}

#[tokio::test]
async fn task_from_another_internship_is_not_found() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let first = app.create_internship(&token, "First").await;
    let second = app.create_internship(&token, "Second").await;
    let task_id = app.create_task(first, &token, "Belongs to first").await;

    let res = app.get_with_token(&routes::task(second, task_id), &token).await;
    assert_eq!(res.status, 404);
}
