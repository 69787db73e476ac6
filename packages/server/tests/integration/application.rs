use serde_json::json;

use crate::common::{TestApp, routes};

async fn internship_with_form(app: &TestApp, admin: &str) -> i32 {
    let id = app.create_internship(admin, "Backend Internship").await;
    let form = json!([
        {"id": "name", "label": "Full name", "required": true, "order": 0, "type": "text"},
        {"id": "why", "label": "Motivation", "required": false, "order": 1, "type": "long-text"},
    ]);
    let res = app.put_with_token(&routes::form(id), &form, admin).await;
    assert_eq!(res.status, 200, "put form failed: {}", res.text);
    id
}

#[tokio::test]
async fn applicant_can_apply_with_answers() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(10, "alice");
    let id = internship_with_form(&app, &admin).await;

    let res = app
        .post_with_token(
            &routes::internship_applications(id),
            &json!({"answers": [
                {"field_id": "name", "value": "Alice Example"},
            ]}),
            &intern,
        )
        .await;

    assert_eq!(res.status, 201, "apply failed: {}", res.text);
    assert_eq!(res.body["status"], "Pending");
    assert_eq!(res.body["username"], "alice");
    assert_eq!(res.body["answers"][0]["field_id"], "name");
}

#[tokio::test]
async fn missing_required_answer_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(11, "bob");
    let id = internship_with_form(&app, &admin).await;

    let res = app
        .post_with_token(
            &routes::internship_applications(id),
            &json!({"answers": [
                {"field_id": "why", "value": "Because."},
            ]}),
            &intern,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(res.body["message"].as_str().unwrap().contains("Full name"));
}

#[tokio::test]
async fn second_application_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(12, "carol");
    let id = app.create_internship(&admin, "No Form Needed").await;

    let body = json!({"answers": []});
    let res = app
        .post_with_token(&routes::internship_applications(id), &body, &intern)
        .await;
    assert_eq!(res.status, 201);

    let res = app
        .post_with_token(&routes::internship_applications(id), &body, &intern)
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn listing_requires_review_permission() {
    let app = TestApp::spawn().await;
    let intern = app.intern_token(13, "dave");

    let res = app.get_with_token(routes::APPLICATIONS, &intern).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn admin_can_filter_applications_by_status() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let alice = app.intern_token(14, "alice");
    let bob = app.intern_token(15, "bob");
    let id = app.create_internship(&admin, "Filters").await;

    let body = json!({"answers": []});
    let first = app
        .post_with_token(&routes::internship_applications(id), &body, &alice)
        .await
        .id();
    app.post_with_token(&routes::internship_applications(id), &body, &bob)
        .await;

    let res = app
        .post_with_token(
            &routes::application_review(first),
            &json!({"status": "Accepted"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "review failed: {}", res.text);

    let res = app
        .get_with_token(&format!("{}?status=Pending", routes::APPLICATIONS), &admin)
        .await;
    assert_eq!(res.status, 200);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["username"], "bob");
}

#[tokio::test]
async fn applicant_sees_own_application_but_not_others() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let alice = app.intern_token(16, "alice");
    let bob = app.intern_token(17, "bob");
    let id = app.create_internship(&admin, "Privacy").await;

    let application_id = app
        .post_with_token(&routes::internship_applications(id), &json!({"answers": []}), &alice)
        .await
        .id();

    let res = app
        .get_with_token(&routes::application(application_id), &alice)
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .get_with_token(&routes::application(application_id), &bob)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn rejection_requires_feedback() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(18, "erin");
    let id = app.create_internship(&admin, "Feedback Rules").await;
    let application_id = app
        .post_with_token(&routes::internship_applications(id), &json!({"answers": []}), &intern)
        .await
        .id();

    let res = app
        .post_with_token(
            &routes::application_review(application_id),
            &json!({"status": "Rejected"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let res = app
        .post_with_token(
            &routes::application_review(application_id),
            &json!({"status": "Rejected", "feedback": "Position filled."}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "Rejected");
    assert_eq!(res.body["feedback"], "Position filled.");
    assert!(res.body["reviewed_at"].is_string());
}

#[tokio::test]
async fn keep_pending_leaves_the_application_unchanged() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(19, "frank");
    let id = app.create_internship(&admin, "Quick Actions").await;
    let application_id = app
        .post_with_token(&routes::internship_applications(id), &json!({"answers": []}), &intern)
        .await
        .id();

    let res = app
        .post_with_token(
            &routes::application_review(application_id),
            &json!({"status": "Pending"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "Pending");
    assert!(res.body["reviewed_at"].is_null());
}

#[tokio::test]
async fn decided_application_cannot_be_re_reviewed() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token();
    let intern = app.intern_token(20, "grace");
    let id = app.create_internship(&admin, "Final Decisions").await;
    let application_id = app
        .post_with_token(&routes::internship_applications(id), &json!({"answers": []}), &intern)
        .await
        .id();

    let res = app
        .post_with_token(
            &routes::application_review(application_id),
            &json!({"status": "Accepted"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .post_with_token(
            &routes::application_review(application_id),
            &json!({"status": "Rejected", "feedback": "Changed my mind."}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}
