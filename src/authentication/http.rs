use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    client_ip::ClientIp,
    http_err::{ApiError, ApiResponse, NextStepRep},
    identities::services::{AccountService, LoginOutcome, ProfileService},
    paths::{self, under_accounts},
    server::AppState,
};

use super::domain::{
    pending,
    session::{self, Session},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(under_accounts(paths::LOGIN), post(login))
        .route(under_accounts(paths::LOGOUT), post(logout))
        .route(under_accounts(paths::ME), get(get_user_info))
}

#[derive(Deserialize)]
struct EmailPasswordPair {
    email: String,
    password: String,
}

async fn login(
    State(accounts): State<AccountService>,
    ClientIp(client_ip): ClientIp,
    cookies: PrivateCookieJar,
    Json(credentials): Json<EmailPasswordPair>,
) -> ApiResponse<(PrivateCookieJar, Json<NextStepRep>)> {
    let outcome = accounts
        .login(
            &client_ip.to_string(),
            &credentials.email,
            &credentials.password,
        )
        .await?;

    match outcome {
        LoginOutcome::Authenticated(authenticated) => {
            let cookies = session::establish(pending::clear(cookies), authenticated.user_id)?;

            Ok((cookies, Json(authenticated.landing.into())))
        }
        LoginOutcome::VerificationRequired(pending_verification) => {
            debug!(user_id = %pending_verification.user_id, "Login requires email verification.");

            let cookies = pending::store(cookies, &pending_verification)?;

            Ok((
                cookies,
                Json(NextStepRep::new(
                    "Please verify your email. We sent you a code.",
                    paths::VERIFY_EMAIL,
                )),
            ))
        }
    }
}

async fn logout(cookies: PrivateCookieJar) -> (PrivateCookieJar, Json<NextStepRep>) {
    let cookies = pending::clear(session::destroy(cookies));

    (
        cookies,
        Json(NextStepRep::new("You have been logged out.", paths::LOGIN)),
    )
}

#[derive(Serialize)]
pub struct UserInfo {
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
    pub profile_completed: bool,
}

async fn get_user_info(
    session: Session,
    State(accounts): State<AccountService>,
    State(profiles): State<ProfileService>,
) -> ApiResponse<Json<UserInfo>> {
    let user = match accounts.get_user(session.user_id()).await? {
        Some(user) => user,
        None => {
            warn!(user_id = %session.user_id(), "Session refers to a missing user.");

            return Err(ApiError::login_required("Please log in."));
        }
    };

    let profile_completed = profiles
        .get(user.id)
        .await?
        .map_or(false, |profile| profile.is_completed);

    Ok(Json(UserInfo {
        user_id: user.id,
        email: user.email,
        email_verified: user.email_verified,
        profile_completed,
    }))
}

#[derive(Serialize)]
pub struct HomeRep {
    pub message: String,
    pub user_id: Uuid,
}

/// The landing page for logged in users.
pub async fn home(session: Session) -> Json<HomeRep> {
    Json(HomeRep {
        message: "You are logged in.".to_owned(),
        user_id: session.user_id(),
    })
}
