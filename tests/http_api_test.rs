mod common;

use common::*;
use medcircle::models::UserRole;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn write_routes_require_a_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/forums"))
        .json(&json!({ "name": "No auth", "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .post(app.url("/forums"))
        .bearer_auth("not-a-jwt")
        .json(&json!({ "name": "Bad auth", "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forum_can_be_created_and_read() {
    let app = spawn_app().await;
    let doctor = create_user(&app.db, "doctor", UserRole::Doctor).await;

    let response = app
        .client
        .post(app.url("/forums"))
        .bearer_auth(app.token(doctor.id))
        .json(&json!({
            "name": "Diabetes Support",
            "description": "Living with type 2",
            "requires_approval": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let forum_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["owner_id"], doctor.id);
    assert_eq!(body["data"]["member_count"], 1);
    assert_eq!(body["data"]["requires_approval"], true);

    let response = app
        .client
        .get(app.url(&format!("/forums/{}", forum_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Diabetes Support");
}

#[tokio::test]
async fn patients_cannot_create_forums() {
    let app = spawn_app().await;
    let patient = create_user(&app.db, "patient", UserRole::User).await;

    let response = app
        .client
        .post(app.url("/forums"))
        .bearer_auth(app.token(patient.id))
        .json(&json!({ "name": "My forum", "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ban_flow_over_http() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let patient = create_user(&app.db, "patient", UserRole::User).await;
    let forum = create_forum(&app.db, owner.id, false, false).await;

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/join", forum.id)))
        .bearer_auth(app.token(patient.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["requires_approval"], false);
    assert_eq!(body["message"], "Joined forum");

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/bans", forum.id)))
        .bearer_auth(app.token(owner.id))
        .json(&json!({ "user_id": patient.id, "reason": "spam", "duration": "7d" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/bans", forum.id)))
        .bearer_auth(app.token(owner.id))
        .json(&json!({ "user_id": patient.id, "reason": "Selling fake medication", "duration": "forever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/bans", forum.id)))
        .bearer_auth(app.token(owner.id))
        .json(&json!({ "user_id": patient.id, "reason": "Selling fake medication", "duration": "7d" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["duration"], "7d");
    assert_eq!(body["data"]["is_active"], true);
    assert!(body["data"]["expires_at"].is_string());

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/join", forum.id)))
        .bearer_auth(app.token(patient.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User is banned from this forum");

    let response = app
        .client
        .get(app.url(&format!("/forums/{}/bans", forum.id)))
        .bearer_auth(app.token(patient.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn comments_come_back_as_a_tree() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let patient = create_user(&app.db, "patient", UserRole::User).await;
    let forum = create_forum(&app.db, owner.id, false, false).await;
    join(&app.db, forum.id, patient.id).await;
    let post = submit_post(&app.db, forum.id, patient.id, "Blood test results").await;

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post.id)))
        .bearer_auth(app.token(patient.id))
        .json(&json!({ "content": "What does high ferritin mean?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let root_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post.id)))
        .bearer_auth(app.token(owner.id))
        .json(&json!({ "parent_id": root_id, "content": "Usually iron overload; ask your GP." }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post.id)))
        .bearer_auth(app.token(patient.id))
        .json(&json!({ "parent_id": root_id, "content": "Thanks" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .get(app.url(&format!("/posts/{}/comments", post.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let roots = body["data"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"].as_i64(), Some(root_id));
    let children = roots[0]["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["depth"], 1);
    assert_eq!(children[0]["author_id"], owner.id);
}

#[tokio::test]
async fn pending_posts_go_through_the_queue() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let patient = create_user(&app.db, "patient", UserRole::User).await;
    let forum = create_forum(&app.db, owner.id, false, true).await;
    join(&app.db, forum.id, patient.id).await;

    let response = app
        .client
        .post(app.url(&format!("/forums/{}/posts", forum.id)))
        .bearer_auth(app.token(patient.id))
        .json(&json!({ "title": "Knee pain", "content": "Running makes it worse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    let post_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .client
        .get(app.url(&format!("/forums/{}/posts", forum.id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/validate", post_id)))
        .bearer_auth(app.token(owner.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url(&format!("/forums/{}/posts", forum.id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"].as_i64(), Some(post_id));
}

#[tokio::test]
async fn deleted_forum_is_gone() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&app.db, owner.id, false, false).await;
    submit_post(&app.db, forum.id, owner.id, "Farewell").await;

    let response = app
        .client
        .delete(app.url(&format!("/forums/{}", forum.id)))
        .bearer_auth(app.token(owner.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["deleted_posts"], 1);
    assert_eq!(body["data"]["updated_users"], 1);

    let response = app
        .client
        .get(app.url(&format!("/forums/{}", forum.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Repeating the delete is still a success.
    let response = app
        .client
        .delete(app.url(&format!("/forums/{}", forum.id)))
        .bearer_auth(app.token(owner.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["deleted_posts"], 0);
}

#[tokio::test]
async fn audit_trail_is_admin_only() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let admin = create_user(&app.db, "admin", UserRole::Admin).await;

    let response = app
        .client
        .get(app.url("/admin/moderation-reports"))
        .bearer_auth(app.token(owner.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .get(app.url("/admin/moderation-reports"))
        .bearer_auth(app.token(admin.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn pending_post_is_hidden_from_the_public() {
    let app = spawn_app().await;
    let owner = create_user(&app.db, "owner", UserRole::Doctor).await;
    let patient = create_user(&app.db, "patient", UserRole::User).await;
    let stranger = create_user(&app.db, "stranger", UserRole::User).await;
    let forum = create_forum(&app.db, owner.id, false, true).await;
    join(&app.db, forum.id, patient.id).await;
    let post = submit_post(&app.db, forum.id, patient.id, "Rash after new medication").await;
    let path = format!("/posts/{}", post.id);

    let response = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .get(app.url(&path))
        .bearer_auth(app.token(stranger.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // An unusable token is treated as anonymous on public reads.
    let response = app
        .client
        .get(app.url(&path))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for viewer in [patient.id, owner.id] {
        let response = app
            .client
            .get(app.url(&path))
            .bearer_auth(app.token(viewer))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["status"], "pending");
    }
}
