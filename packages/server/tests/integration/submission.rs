use serde_json::json;

use crate::common::{TestApp, routes};

/// Internship with two sequential tasks; returns (internship, first, second).
async fn learning_path(app: &TestApp, admin: &str) -> (i32, i32, i32) {
    let internship_id = app.create_internship(admin, "Sequential Path").await;
    let first = app.create_task(internship_id, admin, "Environment setup").await;
    let second = app.create_task(internship_id, admin, "First feature").await;
    (internship_id, first, second)
}

mod submitting {
    use super::*;

    #[tokio::test]
    async fn first_task_accepts_a_submission() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(30, "alice");
        let (_, first, _) = learning_path(&app, &admin).await;

        let res = app
            .post_with_token(
                &routes::task_submissions(first),
                &json!({"payload": {"text": "All set up."}}),
                &intern,
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["status"], "Pending");
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["payload"]["text"], "All set up.");
    }

    #[tokio::test]
    async fn second_task_is_locked_until_predecessor_approved() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(31, "bob");
        let (_, first, second) = learning_path(&app, &admin).await;

        let res = app
            .post_with_token(
                &routes::task_submissions(second),
                &json!({"payload": {"text": "Skipping ahead."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "TASK_LOCKED");

        // Pending is not enough to unlock.
        let submission_id = app.create_submission(first, &intern).await;
        let res = app
            .post_with_token(
                &routes::task_submissions(second),
                &json!({"payload": {"text": "Still skipping."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .review_submission(submission_id, &admin, "Approved", None)
            .await;
        assert_eq!(res.status, 200, "approve failed: {}", res.text);

        let res = app
            .post_with_token(
                &routes::task_submissions(second),
                &json!({"payload": {"text": "Now unlocked."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 201);
    }

    #[tokio::test]
    async fn payload_must_match_response_requirements() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(32, "carol");
        let internship_id = app.create_internship(&admin, "Requirements").await;
        let res = app
            .post_with_token(
                &routes::tasks(internship_id),
                &json!({
                    "title": "Ship a repo",
                    "description": "Push your work and summarize it.",
                    "response_requirements": ["github", "text"],
                }),
                &admin,
            )
            .await;
        let task_id = res.id();

        // Missing declared key.
        let res = app
            .post_with_token(
                &routes::task_submissions(task_id),
                &json!({"payload": {"text": "No repo link."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        // Undeclared key.
        let res = app
            .post_with_token(
                &routes::task_submissions(task_id),
                &json!({"payload": {
                    "github": "https://github.com/acme/work",
                    "text": "Done.",
                    "pdf": "https://cdn.example.com/report.pdf",
                }}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 400);

        // Exact coverage passes.
        let res = app
            .post_with_token(
                &routes::task_submissions(task_id),
                &json!({"payload": {
                    "github": "https://github.com/acme/work",
                    "text": "Done.",
                }}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 201, "submit failed: {}", res.text);
    }

    #[tokio::test]
    async fn one_submission_per_task_and_user() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(33, "dave");
        let (_, first, _) = learning_path(&app, &admin).await;
        app.create_submission(first, &intern).await;

        let res = app
            .post_with_token(
                &routes::task_submissions(first),
                &json!({"payload": {"text": "Again."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn owner_sees_own_submission_but_not_others() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let alice = app.intern_token(34, "alice");
        let bob = app.intern_token(35, "bob");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &alice).await;

        let res = app.get_with_token(&routes::submission(submission_id), &alice).await;
        assert_eq!(res.status, 200);

        let res = app.get_with_token(&routes::submission(submission_id), &bob).await;
        assert_eq!(res.status, 404);

        // view_all sees everything.
        let res = app.get_with_token(&routes::submission(submission_id), &admin).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_without_view_all() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let alice = app.intern_token(36, "alice");
        let bob = app.intern_token(37, "bob");
        let (_, first, _) = learning_path(&app, &admin).await;
        app.create_submission(first, &alice).await;

        let res = app.get_with_token(routes::SUBMISSIONS, &bob).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);

        let res = app.get_with_token(routes::SUBMISSIONS, &admin).await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }
}

mod reviewing {
    use super::*;

    #[tokio::test]
    async fn review_requires_permission() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(40, "alice");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .review_submission(submission_id, &intern, "Approved", None)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn requesting_changes_requires_feedback() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(41, "bob");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .review_submission(submission_id, &admin, "RequiresChanges", None)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .review_submission(submission_id, &admin, "RequiresChanges", Some("Add tests."))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submission"]["status"], "RequiresChanges");
        assert_eq!(res.body["submission"]["feedback"], "Add tests.");
    }

    #[tokio::test]
    async fn approval_reports_recomputed_progress() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(42, "carol");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .review_submission(submission_id, &admin, "Approved", None)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submission"]["status"], "Approved");
        assert_eq!(res.body["progress"]["completed_tasks"], 1);
        assert_eq!(res.body["progress"]["total_tasks"], 2);
        assert_eq!(res.body["progress"]["progress_percentage"], 50);
    }

    #[tokio::test]
    async fn grade_is_recorded_and_bounded() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(43, "dave");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .post_with_token(
                &routes::submission_review(submission_id),
                &json!({"status": "Approved", "grade": 150}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .post_with_token(
                &routes::submission_review(submission_id),
                &json!({"status": "Approved", "grade": 92}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submission"]["grade"], 92);
    }

    #[tokio::test]
    async fn decided_submissions_are_final() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(44, "erin");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .review_submission(submission_id, &admin, "Rejected", Some("Off topic."))
            .await;
        assert_eq!(res.status, 200);

        let res = app
            .review_submission(submission_id, &admin, "Approved", None)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn keep_pending_is_a_no_op() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(45, "frank");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .review_submission(submission_id, &admin, "Pending", None)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submission"]["status"], "Pending");
        assert!(res.body["submission"]["reviewed_at"].is_null());
    }
}

mod resubmitting {
    use super::*;

    #[tokio::test]
    async fn requires_changes_permits_one_resubmission_in_place() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(50, "alice");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        app.review_submission(submission_id, &admin, "RequiresChanges", Some("Add tests."))
            .await;

        let res = app
            .put_with_token(
                &routes::submission(submission_id),
                &json!({"payload": {"text": "Tests added."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 200, "resubmit failed: {}", res.text);
        assert_eq!(res.body["id"], submission_id);
        assert_eq!(res.body["status"], "Pending");
        assert_eq!(res.body["payload"]["text"], "Tests added.");
        // Prior feedback stays visible until the next review.
        assert_eq!(res.body["feedback"], "Add tests.");
        assert!(res.body["reviewed_at"].is_null());

        // Back to pending: a second resubmission is rejected.
        let res = app
            .put_with_token(
                &routes::submission(submission_id),
                &json!({"payload": {"text": "Once more."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn only_the_owner_can_resubmit() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let alice = app.intern_token(51, "alice");
        let bob = app.intern_token(52, "bob");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &alice).await;

        app.review_submission(submission_id, &admin, "RequiresChanges", Some("Rework."))
            .await;

        let res = app
            .put_with_token(
                &routes::submission(submission_id),
                &json!({"payload": {"text": "Not mine."}}),
                &bob,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn pending_submissions_cannot_be_resubmitted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(53, "carol");
        let (_, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &intern).await;

        let res = app
            .put_with_token(
                &routes::submission(submission_id),
                &json!({"payload": {"text": "Too eager."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }
}

mod progress {
    use super::*;

    #[tokio::test]
    async fn states_flow_from_available_through_completed() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(60, "alice");
        let (internship_id, first, _) = learning_path(&app, &admin).await;

        let res = app.get_with_token(&routes::progress(internship_id), &intern).await;
        assert_eq!(res.status, 200);
        let tasks = res.body["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["availability"], "available");
        assert_eq!(tasks[1]["availability"], "locked");
        assert_eq!(res.body["progress_percentage"], 0);

        let submission_id = app.create_submission(first, &intern).await;
        let res = app.get_with_token(&routes::progress(internship_id), &intern).await;
        assert_eq!(res.body["tasks"][0]["availability"], "pending");

        app.review_submission(submission_id, &admin, "Approved", None).await;
        let res = app.get_with_token(&routes::progress(internship_id), &intern).await;
        assert_eq!(res.body["tasks"][0]["availability"], "completed");
        assert_eq!(res.body["tasks"][1]["availability"], "available");
        assert_eq!(res.body["completed_tasks"], 1);
        assert_eq!(res.body["progress_percentage"], 50);
    }

    #[tokio::test]
    async fn past_deadline_without_approval_is_overdue() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(61, "bob");
        // Start date long past; the 7-day offsets have expired.
        let internship_id = app
            .create_internship_starting(&admin, "Started Long Ago", "2020-01-01T00:00:00Z")
            .await;
        app.create_task(internship_id, &admin, "Late task").await;

        let res = app.get_with_token(&routes::progress(internship_id), &intern).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["tasks"][0]["availability"], "overdue");

        // Overdue tasks remain submittable.
        let tasks = app.get_with_token(&routes::tasks(internship_id), &admin).await;
        let task_id = tasks.body[0]["id"].as_i64().unwrap() as i32;
        let res = app
            .post_with_token(
                &routes::task_submissions(task_id),
                &json!({"payload": {"text": "Better late."}}),
                &intern,
            )
            .await;
        assert_eq!(res.status, 201);
    }

    #[tokio::test]
    async fn empty_learning_path_reports_zero_percent() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let intern = app.intern_token(62, "carol");
        let internship_id = app.create_internship(&admin, "No Tasks Yet").await;

        let res = app.get_with_token(&routes::progress(internship_id), &intern).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total_tasks"], 0);
        assert_eq!(res.body["progress_percentage"], 0);
    }

    #[tokio::test]
    async fn viewing_another_users_progress_requires_view_all() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token();
        let alice = app.intern_token(63, "alice");
        let (internship_id, first, _) = learning_path(&app, &admin).await;
        let submission_id = app.create_submission(first, &alice).await;
        app.review_submission(submission_id, &admin, "Approved", None).await;

        let res = app
            .get_with_token(
                &format!("{}?user_id=63", routes::progress(internship_id)),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["completed_tasks"], 1);

        let bob = app.intern_token(64, "bob");
        let res = app
            .get_with_token(
                &format!("{}?user_id=63", routes::progress(internship_id)),
                &bob,
            )
            .await;
        assert_eq!(res.status, 403);
    }
}
