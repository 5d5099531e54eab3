use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};

use crate::env::AppConfig;
use crate::init_rocket;

pub use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder};

pub async fn setup_test_client(test_db: TestDb) -> (Client, Pool<Sqlite>) {
    let pool = test_db.pool.clone();
    let rocket = init_rocket(test_db.pool, AppConfig::for_tests());

    let client = Client::tracked(rocket)
        .await
        .expect("Failed to create test client");

    (client, pool)
}

pub async fn post_json(client: &Client, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(uri)
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;

    let status = response.status();
    let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

pub async fn get_json(client: &Client, uri: &str) -> (Status, Value) {
    let response = client.get(uri).dispatch().await;

    let status = response.status();
    let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

pub async fn login_owner(client: &Client, email: &str) {
    let (status, _) = post_json(
        client,
        "/api/auth/login",
        json!({ "email": email, "password": STANDARD_PASSWORD }),
    )
    .await;
    assert_eq!(status, Status::Ok, "Owner login failed for {}", email);
}

pub async fn login_admin(client: &Client, email: &str) {
    let (status, _) = post_json(
        client,
        "/api/admin/auth",
        json!({ "email": email, "password": STANDARD_PASSWORD }),
    )
    .await;
    assert_eq!(status, Status::Ok, "Admin login failed for {}", email);
}

pub fn testimonial_body(user_id: &str, rating: i64) -> Value {
    json!({
        "customerName": "Jane Customer",
        "customerEmail": "jane@example.com",
        "message": "Fantastic experience from start to finish.",
        "rating": rating,
        "userId": user_id,
    })
}
