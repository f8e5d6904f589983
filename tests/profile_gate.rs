use axum::http::StatusCode;

mod common;

use common::{TestApp, CODE};

const EMAIL: &str = "alice@uni.edu";
const PASSWORD: &str = "correct horse battery";

/// An app with a verified, logged in user whose profile is incomplete.
async fn logged_in_app() -> TestApp {
    let app = TestApp::new();
    app.signup(EMAIL, PASSWORD).await;
    assert_eq!(StatusCode::OK, app.verify(CODE).await.status);

    app
}

#[tokio::test]
async fn incomplete_profile_is_redirected_to_setup() {
    let app = logged_in_app().await;

    for path in ["/", "/marketplace", "/accounts/me"] {
        let response = app.get(path).await;

        assert_eq!(StatusCode::SEE_OTHER, response.status, "{}", path);
        assert_eq!(Some("/accounts/profile/setup"), response.location(), "{}", path);
    }
}

#[tokio::test]
async fn exempt_paths_are_reachable() {
    let app = logged_in_app().await;

    let setup = app.get("/accounts/profile/setup").await;
    assert_eq!(StatusCode::OK, setup.status);
    assert_eq!(false, setup.body["is_completed"]);

    let asset = app.get("/static/app.css").await;
    assert_eq!(StatusCode::NOT_FOUND, asset.status);

    let logout = app
        .post("/accounts/logout", serde_json::json!({}))
        .await;
    assert_eq!(StatusCode::OK, logout.status);
}

#[tokio::test]
async fn completing_the_profile_opens_the_site() {
    let app = logged_in_app().await;

    let completed = app.complete_profile().await;

    assert_eq!(StatusCode::OK, completed.status);
    assert_eq!(Some("/"), completed.next());

    let profile = app.profile(EMAIL).await;
    assert!(profile.is_completed);
    assert_eq!("Alice Liddell", profile.full_name);
    assert_eq!("rust, sql", profile.skills);

    let home = app.get("/").await;
    assert_eq!(StatusCode::OK, home.status);
    assert_eq!("You are logged in.", home.body["message"]);

    let setup = app.get("/accounts/profile/setup").await;
    assert_eq!(Some("/"), setup.next());
}

#[tokio::test]
async fn completing_twice_changes_nothing() {
    let app = logged_in_app().await;
    app.complete_profile().await;

    let again = app
        .post(
            "/accounts/profile/setup",
            serde_json::json!({
                "full_name": "Someone Else",
                "university": "Elsewhere",
                "course": "History",
                "year_of_study": "4",
            }),
        )
        .await;

    assert_eq!(StatusCode::OK, again.status);
    assert_eq!(Some("/"), again.next());
    assert_eq!("Alice Liddell", app.profile(EMAIL).await.full_name);
}

#[tokio::test]
async fn invalid_profile_reports_fields() {
    let app = logged_in_app().await;

    let rejected = app
        .post(
            "/accounts/profile/setup",
            serde_json::json!({
                "full_name": "Alice Liddell",
                "phone": "0".repeat(31),
            }),
        )
        .await;

    assert_eq!(StatusCode::BAD_REQUEST, rejected.status);
    assert!(rejected.body.get("full_name").is_none());
    assert!(rejected.body["university"].is_array());
    assert!(rejected.body["phone"].is_array());
    assert!(!app.profile(EMAIL).await.is_completed);
}

#[tokio::test]
async fn anonymous_callers_are_not_redirected() {
    let app = TestApp::new();

    let home = app.get("/").await;

    assert_eq!(StatusCode::UNAUTHORIZED, home.status);
    assert_eq!(Some("/accounts/login"), home.next());
}

#[tokio::test]
async fn profile_setup_requires_a_session() {
    let app = TestApp::new();

    let setup = app.get("/accounts/profile/setup").await;

    assert_eq!(StatusCode::UNAUTHORIZED, setup.status);
}
