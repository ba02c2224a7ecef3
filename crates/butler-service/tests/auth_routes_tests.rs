//! Signup, signin and account verification route tests against the mock
//! identity provider.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use butler_service::services::identity_provider::mock::MockIdentityProvider;
use butler_test_utils::TestButlerServer;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;

fn signup_body() -> Value {
    json!({
        "username": "chef_anna",
        "password": "tiramisu-2024",
        "email": "Anna.Rossi@Example.com",
        "gender": "female",
        "birthdate": "1990-04-12",
        "name": "Anna",
        "family_name": "Rossi",
    })
}

async fn post(server: &TestButlerServer, path: &str, body: &Value) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(format!("{}{}", server.url(), path))
        .json(body)
        .send()
        .await?)
}

fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signup_succeeds(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let response = post(&server, "/auth/signup", &signup_body()).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert!(body["message"].as_str().unwrap().starts_with("User registered"));
    assert_eq!(provider.calls(), vec!["sign_up:chef_anna".to_string()]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signup_validation_never_reaches_provider(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let body = json!({
        "username": "ann",
        "password": "short",
        "email": "not-an-email",
        "gender": "",
        "birthdate": "12/04/1990",
        "name": "Anna",
    });
    let response = post(&server, "/auth/signup", &body).await?;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await?;
    let fields = error_fields(&body);
    for field in ["username", "password", "email", "gender", "birthdate", "family_name"] {
        assert!(fields.contains(&field.to_string()), "missing error for {field}");
    }
    assert!(!fields.contains(&"name".to_string()));
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signup_rejected_by_provider_is_bad_request(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::rejecting("UsernameExistsException"));
    let server = TestButlerServer::spawn_with_provider(pool, provider).await?;

    let response = post(&server, "/auth/signup", &signup_body()).await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Username already exists");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signup_provider_unavailable_is_503(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::unavailable());
    let server = TestButlerServer::spawn_with_provider(pool, provider).await?;

    let response = post(&server, "/auth/signup", &signup_body()).await?;

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signin_returns_tokens(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let response = post(
        &server,
        "/auth/signin",
        &json!({ "username": "chef_anna", "password": "tiramisu-2024" }),
    )
    .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["access_token"], "mock-access-token");
    assert_eq!(body["id_token"], "mock-id-token");
    assert_eq!(body["refresh_token"], "mock-refresh-token");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(provider.calls(), vec!["sign_in:chef_anna".to_string()]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signin_wrong_password_is_generic(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::rejecting("NotAuthorizedException"));
    let server = TestButlerServer::spawn_with_provider(pool, provider).await?;

    let response = post(
        &server,
        "/auth/signin",
        &json!({ "username": "chef_anna", "password": "wrong-password" }),
    )
    .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["message"], "Incorrect username or password");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_signin_short_password_is_422(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let response = post(
        &server,
        "/auth/signin",
        &json!({ "username": "chef_anna", "password": "1234567" }),
    )
    .await?;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await?;
    assert_eq!(error_fields(&body), vec!["password".to_string()]);
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_verify_account_succeeds(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let response = post(
        &server,
        "/auth/verify-account",
        &json!({ "username": "chef_anna", "code": "123456" }),
    )
    .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Account verified");
    assert_eq!(provider.calls(), vec!["confirm_sign_up:chef_anna".to_string()]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_verify_account_code_must_be_six_characters(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    for code in ["12345", "1234567"] {
        let response = post(
            &server,
            "/auth/verify-account",
            &json!({ "username": "chef_anna", "code": code }),
        )
        .await?;
        assert_eq!(response.status(), 422);
    }
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_verify_account_username_too_short(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::accepting());
    let server = TestButlerServer::spawn_with_provider(pool, provider.clone()).await?;

    let response = post(
        &server,
        "/auth/verify-account",
        &json!({ "username": "anna", "code": "123456" }),
    )
    .await?;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await?;
    assert_eq!(body["errors"][0]["field"], "username");
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_verify_account_code_mismatch_is_bad_request(pool: PgPool) -> Result<()> {
    let provider = Arc::new(MockIdentityProvider::rejecting("CodeMismatchException"));
    let server = TestButlerServer::spawn_with_provider(pool, provider).await?;

    let response = post(
        &server,
        "/auth/verify-account",
        &json!({ "username": "chef_anna", "code": "000000" }),
    )
    .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["message"], "Invalid verification code");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_invalid_json_is_bad_request(pool: PgPool) -> Result<()> {
    let server = TestButlerServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/auth/signin", server.url()))
        .header("Content-Type", "application/json")
        .body("{\"username\": ")
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}
