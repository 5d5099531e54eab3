use chrono::{Duration, Utc};
use rocket::http::Status;
use serde_json::json;

use crate::auth::{ADMIN_SESSION_COOKIE, create_admin_session, verify_admin_session};
use crate::db::{count_admin_sessions, find_admin_session, insert_admin_session, set_user_admin};

use super::test_utils::{
    STANDARD_PASSWORD, TestDbBuilder, get_json, login_admin, post_json, setup_test_client,
};

#[rocket::async_test]
async fn test_admin_login_sets_cookie_and_single_session() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("admin@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    let response = client
        .post("/api/admin/auth")
        .header(rocket::http::ContentType::JSON)
        .body(json!({ "email": "admin@example.com", "password": STANDARD_PASSWORD }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get(ADMIN_SESSION_COOKIE).is_some());

    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], admin_id.as_str());
    assert_eq!(body["user"]["role"], "admin");

    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 1);

    // Logging in again replaces the previous session.
    login_admin(&client, "admin@example.com").await;
    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 1);

    let (status, body) = post_json(&client, "/api/admin/verify", json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["userId"], admin_id.as_str());
    assert_eq!(body["isAdmin"], true);
}

#[rocket::async_test]
async fn test_non_admin_login_is_forbidden_without_session() {
    let test_db = TestDbBuilder::new()
        .member("member@example.com")
        .owner("owner@example.com", None)
        .build()
        .await
        .unwrap();
    let member_id = test_db.user_id("member@example.com").unwrap();
    let owner_id = test_db.user_id("owner@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    for (email, user_id) in [("member@example.com", &member_id), ("owner@example.com", &owner_id)] {
        let response = client
            .post("/api/admin/auth")
            .header(rocket::http::ContentType::JSON)
            .body(json!({ "email": email, "password": STANDARD_PASSWORD }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
        assert!(response.cookies().get(ADMIN_SESSION_COOKIE).is_none());

        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "Access denied. Admin privileges required.");

        assert_eq!(count_admin_sessions(&pool, user_id).await.unwrap(), 0);
    }
}

#[rocket::async_test]
async fn test_admin_login_rejects_bad_credentials() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let (client, _) = setup_test_client(test_db).await;

    let (status, body) = post_json(
        &client,
        "/api/admin/auth",
        json!({ "email": "admin@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = post_json(&client, "/api/admin/auth", json!({ "email": "admin@example.com" })).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Email and password are required");
}

#[rocket::async_test]
async fn test_admin_routes_require_session() {
    let test_db = TestDbBuilder::new().build().await.unwrap();
    let (client, _) = setup_test_client(test_db).await;

    let (status, body) = get_json(&client, "/api/admin/analytics").await;
    assert_eq!(status, Status::Unauthorized);
    assert!(body["error"].is_string());

    let (status, _) = get_json(&client, "/api/contact").await;
    assert_eq!(status, Status::Unauthorized);

    let (status, body) = post_json(&client, "/api/admin/verify", json!({})).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Invalid or expired admin session");
}

#[rocket::async_test]
async fn test_admin_logout_destroys_session() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("admin@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    login_admin(&client, "admin@example.com").await;
    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 1);

    let response = client.delete("/api/admin/auth").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 0);

    let (status, _) = get_json(&client, "/api/admin/analytics").await;
    assert_eq!(status, Status::Unauthorized);
}

#[rocket::async_test]
async fn test_revoked_admin_loses_session_on_next_check() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("admin@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    login_admin(&client, "admin@example.com").await;
    set_user_admin(&pool, &admin_id, false).await.unwrap();

    let (status, _) = post_json(&client, "/api/admin/verify", json!({})).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_expired_admin_session_is_deleted_on_verify() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("admin@example.com").unwrap();
    let pool = test_db.pool;

    let expired_at = (Utc::now() - Duration::seconds(1)).naive_utc();
    insert_admin_session(&pool, &admin_id, "expired-token", expired_at)
        .await
        .unwrap();

    assert_eq!(verify_admin_session(&pool, "expired-token").await, None);
    assert!(find_admin_session(&pool, "expired-token").await.unwrap().is_none());

    // Still unreachable on every later call.
    assert_eq!(verify_admin_session(&pool, "expired-token").await, None);
}

#[tokio::test]
async fn test_verified_session_expires_in_the_future() {
    let test_db = TestDbBuilder::new().admin("admin@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("admin@example.com").unwrap();
    let pool = test_db.pool;

    let token = create_admin_session(&pool, &admin_id).await.unwrap();
    assert_eq!(token.len(), 64);

    assert_eq!(verify_admin_session(&pool, &token).await, Some(admin_id));

    let session = find_admin_session(&pool, &token).await.unwrap().unwrap();
    assert!(session.expires_at > Utc::now().naive_utc());
    assert!(session.expires_at <= (Utc::now() + Duration::hours(2)).naive_utc());
}

#[tokio::test]
async fn test_unknown_token_is_not_verified() {
    let test_db = TestDbBuilder::new().build().await.unwrap();
    assert_eq!(verify_admin_session(&test_db.pool, "nope").await, None);
}

#[tokio::test]
async fn test_no_admin_session_for_non_admin() {
    let test_db = TestDbBuilder::new().member("member@example.com").build().await.unwrap();
    let member_id = test_db.user_id("member@example.com").unwrap();

    assert_eq!(create_admin_session(&test_db.pool, &member_id).await, None);
    assert_eq!(count_admin_sessions(&test_db.pool, &member_id).await.unwrap(), 0);
}

#[rocket::async_test]
async fn test_admin_login_ignores_email_case_and_padding() {
    let test_db = TestDbBuilder::new().admin("boss@example.com").build().await.unwrap();
    let admin_id = test_db.user_id("boss@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    let (status, body) = post_json(
        &client,
        "/api/admin/auth",
        json!({ "email": "  Boss@Example.COM ", "password": STANDARD_PASSWORD }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["id"], admin_id.as_str());
    assert_eq!(count_admin_sessions(&pool, &admin_id).await.unwrap(), 1);
}
