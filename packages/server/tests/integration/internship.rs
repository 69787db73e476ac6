use serde_json::json;

use crate::common::{TestApp, routes};

mod internship_crud {
    use super::*;

    #[tokio::test]
    async fn admin_can_create_an_internship() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();

        let res = app
            .post_with_token(
                routes::INTERNSHIPS,
                &json!({
                    "title": "Backend Engineering Internship",
                    "description": "Work on the platform backend.",
                    "start_date": "2026-09-01T00:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["title"], "Backend Engineering Internship");
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["has_form"], false);
        assert!(res.body["created_at"].is_string());
    }

    #[tokio::test]
    async fn intern_cannot_create_an_internship() {
        let app = TestApp::spawn().await;
        let token = app.intern_token(1, "alice");

        let res = app
            .post_with_token(
                routes::INTERNSHIPS,
                &json!({
                    "title": "Nope",
                    "description": "Should fail.",
                    "start_date": "2026-09-01T00:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::INTERNSHIPS, &json!({"title": "x"}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();

        let res = app
            .post_with_token(
                routes::INTERNSHIPS,
                &json!({
                    "title": "   ",
                    "description": "Desc",
                    "start_date": "2026-09-01T00:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn get_includes_learning_path_in_position_order() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "With Tasks").await;
        app.create_task(id, &token, "First").await;
        app.create_task(id, &token, "Second").await;

        let res = app.get_with_token(&routes::internship(id), &token).await;

        assert_eq!(res.status, 200);
        let tasks = res.body["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["title"], "First");
        assert_eq!(tasks[0]["position"], 1);
        assert_eq!(tasks[1]["title"], "Second");
        assert_eq!(tasks[1]["position"], 2);
    }

    #[tokio::test]
    async fn patch_updates_only_provided_fields() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "Old Title").await;

        let res = app
            .patch_with_token(
                &routes::internship(id),
                &json!({"title": "New Title"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "New Title");
        assert_eq!(res.body["description"], "## About\nBuild things with us.");
    }

    #[tokio::test]
    async fn list_search_finds_by_title() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        app.create_internship(&token, "Rust Backend").await;
        app.create_internship(&token, "Frontend").await;

        let res = app
            .get_with_token(&format!("{}?search=rust", routes::INTERNSHIPS), &token)
            .await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Rust Backend");
    }

    #[tokio::test]
    async fn delete_is_blocked_while_applications_exist() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(2, "bob");
        let id = app.create_internship(&admin, "Popular").await;

        let res = app
            .post_with_token(
                &routes::internship_applications(id),
                &json!({"answers": []}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 201, "apply failed: {}", res.text);

        let res = app.delete_with_token(&routes::internship(id), &admin).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn delete_removes_internship_and_tasks() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "Short Lived").await;
        app.create_task(id, &token, "Task").await;

        let res = app.delete_with_token(&routes::internship(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::internship(id), &token).await;
        assert_eq!(res.status, 404);
    }
}

mod application_form {
    use super::*;

    fn sample_form() -> serde_json::Value {
        json!([
            {
                "id": "name",
                "label": "Full name",
                "required": true,
                "order": 0,
                "type": "text",
            },
            {
                "id": "stack",
                "label": "Preferred stack",
                "required": false,
                "order": 1,
                "type": "checkbox-group",
                "options": ["Rust", "Go"],
            },
        ])
    }

    #[tokio::test]
    async fn form_is_not_found_until_published() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "No Form Yet").await;

        let res = app.get_with_token(&routes::form(id), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn published_form_round_trips() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "With Form").await;

        let res = app.put_with_token(&routes::form(id), &sample_form(), &token).await;
        assert_eq!(res.status, 200, "put form failed: {}", res.text);

        let res = app.get_with_token(&routes::form(id), &token).await;
        assert_eq!(res.status, 200);
        let blocks = res.body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["id"], "name");
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[0]["order"], 0);
        assert_eq!(blocks[1]["id"], "stack");
        assert_eq!(blocks[1]["options"], json!(["Rust", "Go"]));
    }

    #[tokio::test]
    async fn sparse_order_is_densified_on_save() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "Sparse Order").await;

        let form = json!([
            {"id": "b", "label": "Second", "order": 9, "type": "text"},
            {"id": "a", "label": "First", "order": 3, "type": "text"},
        ]);
        let res = app.put_with_token(&routes::form(id), &form, &token).await;
        assert_eq!(res.status, 200);

        let blocks = res.body["blocks"].as_array().unwrap();
        assert_eq!(blocks[0]["id"], "a");
        assert_eq!(blocks[0]["order"], 0);
        assert_eq!(blocks[1]["id"], "b");
        assert_eq!(blocks[1]["order"], 1);
    }

    #[tokio::test]
    async fn choice_block_without_options_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "Bad Form").await;

        let form = json!([
            {"id": "pick", "label": "Pick one", "type": "radio", "options": []},
        ]);
        let res = app.put_with_token(&routes::form(id), &form, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_block_ids_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_internship(&token, "Dup Ids").await;

        let form = json!([
            {"id": "x", "label": "One", "type": "text"},
            {"id": "x", "label": "Two", "type": "text"},
        ]);
        let res = app.put_with_token(&routes::form(id), &form, &token).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn intern_cannot_publish_a_form() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(3, "carol");
        let id = app.create_internship(&admin, "Locked Down").await;

        let res = app.put_with_token(&routes::form(id), &sample_form(), &intern).await;
        assert_eq!(res.status, 403);
    }
}
