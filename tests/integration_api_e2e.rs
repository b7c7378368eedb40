//! End-to-end smoke tests against a locally running server.
//!
//! These need `chatter` listening on 127.0.0.1:3000 with its database
//! migrated, so they are ignored by default:
//!
//!     cargo test -- --ignored

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| reqwest::Client::new());

const BASE_URL: &str = "http://127.0.0.1:3000";

fn unique_email() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("testuser_{}@example.com", timestamp)
}

#[tokio::test]
#[ignore = "requires a running server with a migrated database"]
async fn register_then_wrong_otp_then_login_is_refused() {
    let email = unique_email();

    let reg_response = CLIENT
        .post(format!("{}/api/auth/register", BASE_URL))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": "SecurePass123!"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(reg_response.status().as_u16(), 201, "Registration failed");
    let reg_body: Value = reg_response.json().await.unwrap();
    assert_eq!(reg_body["data"]["email"], email.as_str());

    // A wrong code must not verify the account.
    let verify_response = CLIENT
        .post(format!("{}/api/auth/verify-otp", BASE_URL))
        .json(&json!({ "email": email, "otp": "000000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(verify_response.status().as_u16(), 400);

    // And without verification there is no account to log into.
    let login_response = CLIENT
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "SecurePass123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login_response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running server with a migrated database"]
async fn duplicate_register_conflicts() {
    let email = unique_email();
    let payload = json!({
        "name": "Test User",
        "email": email,
        "password": "SecurePass123!"
    });

    let first = CLIENT
        .post(format!("{}/api/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = CLIENT
        .post(format!("{}/api/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
#[ignore = "requires a running server and a seeded verified user (E2E_EMAIL / E2E_PASSWORD)"]
async fn like_toggle_is_its_own_inverse() {
    let email = std::env::var("E2E_EMAIL").expect("E2E_EMAIL not set");
    let password = std::env::var("E2E_PASSWORD").expect("E2E_PASSWORD not set");

    let login = CLIENT
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200, "Login failed");
    let login_body: Value = login.json().await.unwrap();
    let token = login_body["token"].as_str().unwrap().to_string();

    let form = reqwest::multipart::Form::new().text("content", "toggle fixture");
    let created = CLIENT
        .post(format!("{}/api/auth/create-post", BASE_URL))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201, "Post creation failed");
    let created_body: Value = created.json().await.unwrap();
    let post_id = created_body["data"]["id"].as_i64().unwrap();

    let toggle = || async {
        let response = CLIENT
            .post(format!("{}/api/auth/like-post", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "post_id": post_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json::<Value>().await.unwrap()
    };

    // Fresh post: like, unlike, like again. After N toggles the count is
    // N mod 2, and the reported state flips every time.
    let first = toggle().await;
    assert_eq!(first["liked"], true);
    assert_eq!(first["like_count"], 1);

    let second = toggle().await;
    assert_eq!(second["liked"], false);
    assert_eq!(second["like_count"], 0);

    let third = toggle().await;
    assert_eq!(third["liked"], true);
    assert_eq!(third["like_count"], 1);
}

#[tokio::test]
#[ignore = "requires a running server with a migrated database"]
async fn protected_routes_reject_anonymous_callers() {
    let response = CLIENT
        .get(format!("{}/api/auth/notifications", BASE_URL))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = CLIENT
        .get(format!("{}/api/auth/notifications", BASE_URL))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
