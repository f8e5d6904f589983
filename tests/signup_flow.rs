use axum::http::StatusCode;
use exchange_accounts::identities::config::AccountsConfig;

mod common;

use common::{TestApp, CODE};

const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn signup_and_verify_lands_on_profile_setup() {
    let app = TestApp::new();

    let signup = app.signup("Alice@Uni.edu", PASSWORD).await;

    assert_eq!(StatusCode::CREATED, signup.status);
    assert_eq!(Some("/accounts/verify-email"), signup.next());
    assert!(app.has_cookie("pending_verification"));
    assert!(!app.user("alice@uni.edu").await.email_verified);

    let pending = app.get("/accounts/verify-email").await;
    assert_eq!(StatusCode::OK, pending.status);
    assert_eq!("alice@uni.edu", pending.body["email"]);

    let verified = app.verify(CODE).await;

    assert_eq!(StatusCode::OK, verified.status);
    assert_eq!(Some("/accounts/profile/setup"), verified.next());
    assert!(app.user("alice@uni.edu").await.email_verified);
    assert!(!app.profile("alice@uni.edu").await.is_completed);
    assert!(app.has_cookie("session"));
    assert!(!app.has_cookie("pending_verification"));
}

#[tokio::test]
async fn wrong_code_keeps_verification_pending() {
    let app = TestApp::new();
    app.signup("alice@uni.edu", PASSWORD).await;

    let rejected = app.verify("000000").await;

    assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    assert!(rejected.body["code"].is_array());
    assert!(!app.user("alice@uni.edu").await.email_verified);
    assert!(app.has_cookie("pending_verification"));
    assert!(!app.has_cookie("session"));

    let retried = app.verify(CODE).await;

    assert_eq!(StatusCode::OK, retried.status);
    assert!(app.user("alice@uni.edu").await.email_verified);
}

#[tokio::test]
async fn malformed_code_is_rejected_before_the_provider() {
    let app = TestApp::new();
    app.signup("alice@uni.edu", PASSWORD).await;

    let rejected = app.verify("12ab").await;

    assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    assert_eq!(2, rejected.body["code"].as_array().unwrap().len());
    assert!(app.has_cookie("pending_verification"));
}

#[tokio::test]
async fn disallowed_domain_creates_no_user() {
    let app = TestApp::new();

    let rejected = app.signup("bob@gmail.com", PASSWORD).await;

    assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    assert!(rejected.body["email"].is_array());
    assert_eq!(0, app.store.user_count().unwrap());
    assert_eq!(0, app.provider.sent_count());
    assert!(!app.has_cookie("pending_verification"));
}

#[tokio::test]
async fn empty_allow_list_accepts_any_domain() {
    let app = TestApp::with_config(AccountsConfig::default());

    let signup = app.signup("bob@gmail.com", PASSWORD).await;

    assert_eq!(StatusCode::CREATED, signup.status);
    assert_eq!(1, app.store.user_count().unwrap());
}

#[tokio::test]
async fn invalid_signup_reports_fields() {
    let app = TestApp::new();

    let rejected = app
        .post(
            "/accounts/signup",
            serde_json::json!({
                "email": "alice-at-uni.edu",
                "password": "short",
                "password_confirmation": "shorter",
            }),
        )
        .await;

    assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    assert!(rejected.body["email"].is_array());
    assert!(rejected.body["password"].is_array());
    assert!(rejected.body["password_confirmation"].is_array());
    assert_eq!(0, app.store.user_count().unwrap());
}

#[tokio::test]
async fn duplicate_email_is_a_field_error() {
    let app = TestApp::new();
    app.signup("alice@uni.edu", PASSWORD).await;
    app.forget_cookies();

    let duplicate = app.signup("ALICE@uni.edu", PASSWORD).await;

    assert_eq!(StatusCode::BAD_REQUEST, duplicate.status);
    assert!(duplicate.body["email"].is_array());
    assert_eq!(1, app.store.user_count().unwrap());
}

#[tokio::test]
async fn verify_without_pending_state_has_expired() {
    let app = TestApp::new();

    let expired = app.verify(CODE).await;

    assert_eq!(StatusCode::UNAUTHORIZED, expired.status);
    assert_eq!(Some("/accounts/login"), expired.next());
    assert_eq!(0, app.store.user_count().unwrap());
    assert_eq!(0, app.provider.sent_count());

    let pending = app.get("/accounts/verify-email").await;
    assert_eq!(StatusCode::UNAUTHORIZED, pending.status);
}

#[tokio::test]
async fn resend_replaces_the_handle() {
    let app = TestApp::new();
    app.signup("alice@uni.edu", PASSWORD).await;

    let resent = app
        .post("/accounts/resend-email", serde_json::json!({}))
        .await;

    assert_eq!(StatusCode::OK, resent.status);
    assert_eq!(Some("/accounts/verify-email"), resent.next());
    assert_eq!(2, app.provider.sent_count());

    // Only the latest handle is accepted, so this passes only if the pending
    // state now holds the new one.
    let verified = app.verify(CODE).await;
    assert_eq!(StatusCode::OK, verified.status);
}

#[tokio::test]
async fn resend_without_pending_state_is_rejected() {
    let app = TestApp::new();

    let rejected = app
        .post("/accounts/resend-email", serde_json::json!({}))
        .await;

    assert_eq!(StatusCode::UNAUTHORIZED, rejected.status);
    assert_eq!(Some("/accounts/login"), rejected.next());
    assert_eq!(0, app.provider.sent_count());
}

#[tokio::test]
async fn provider_failure_is_not_an_invalid_code() {
    let app = TestApp::new();
    app.provider.set_failing(true);

    let signup = app.signup("alice@uni.edu", PASSWORD).await;

    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, signup.status);
    assert!(!app.has_cookie("pending_verification"));
    // The account remains, and logging in sends a new code.
    assert_eq!(1, app.store.user_count().unwrap());

    app.provider.set_failing(false);
    let login = app.login("alice@uni.edu", PASSWORD).await;

    assert_eq!(StatusCode::OK, login.status);
    assert_eq!(Some("/accounts/verify-email"), login.next());
    assert_eq!(StatusCode::OK, app.verify(CODE).await.status);
}

#[tokio::test]
async fn provider_failure_during_verification_keeps_pending_state() {
    let app = TestApp::new();
    app.signup("alice@uni.edu", PASSWORD).await;
    app.provider.set_failing(true);

    let unavailable = app.verify(CODE).await;

    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, unavailable.status);
    assert!(app.has_cookie("pending_verification"));
    assert!(!app.user("alice@uni.edu").await.email_verified);

    app.provider.set_failing(false);
    let verified = app.verify(CODE).await;

    assert_eq!(StatusCode::OK, verified.status);
    assert!(app.user("alice@uni.edu").await.email_verified);
}

#[tokio::test]
async fn signup_attempts_are_rate_limited() {
    let app = TestApp::new();

    for _ in 0..10 {
        let rejected = app.signup("not-an-email", PASSWORD).await;
        assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    }

    let limited = app.signup("alice@uni.edu", PASSWORD).await;

    assert_eq!(StatusCode::TOO_MANY_REQUESTS, limited.status);
    assert_eq!(0, app.store.user_count().unwrap());
}
