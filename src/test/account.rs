use rocket::http::Status;
use serde_json::json;

use crate::auth::USER_SESSION_COOKIE;
use crate::env::AppConfig;

use super::test_utils::{STANDARD_PASSWORD, TestDbBuilder, get_json, post_json, setup_test_client};

#[rocket::async_test]
async fn test_register_starts_session() {
    let test_db = TestDbBuilder::new().build().await.unwrap();
    let (client, _) = setup_test_client(test_db).await;

    let response = client
        .post("/api/auth/register")
        .header(rocket::http::ContentType::JSON)
        .body(
            json!({ "email": "  New@Example.com ", "password": "longenough", "name": "Nia" })
                .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get_private(USER_SESSION_COOKIE).is_some());

    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["name"], "Nia");

    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = get_json(&client, "/api/auth/me").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(
        body["collectionLink"],
        AppConfig::for_tests().collection_link(&user_id)
    );
}

#[rocket::async_test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let test_db = TestDbBuilder::new().owner("taken@example.com", None).build().await.unwrap();
    let (client, _) = setup_test_client(test_db).await;

    let (status, _) = post_json(
        &client,
        "/api/auth/register",
        json!({ "email": "taken@example.com", "password": "longenough" }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    let (status, body) = post_json(
        &client,
        "/api/auth/register",
        json!({ "email": "fresh@example.com", "password": "short" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Password must be at least 8 characters");
}

#[rocket::async_test]
async fn test_login_and_logout() {
    let test_db = TestDbBuilder::new().owner("owner@example.com", None).build().await.unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    let (status, body) = post_json(
        &client,
        "/api/auth/login",
        json!({ "email": "owner@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = post_json(
        &client,
        "/api/auth/login",
        json!({ "email": "OWNER@example.com", "password": STANDARD_PASSWORD }),
    )
    .await;
    assert_eq!(status, Status::Ok);

    let (status, _) = get_json(&client, "/api/auth/me").await;
    assert_eq!(status, Status::Ok);

    let (status, _) = post_json(&client, "/api/auth/logout", json!({})).await;
    assert_eq!(status, Status::Ok);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let (status, body) = get_json(&client, "/api/auth/me").await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Authentication required");
}
