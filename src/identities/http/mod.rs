use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use tracing::debug;

use crate::{
    authentication::domain::{
        pending,
        session::{self, Session},
    },
    client_ip::ClientIp,
    http_err::{ApiResponse, NextStepRep},
    identities::{
        domain::profiles::Profile,
        services::{AccountError, AccountService, ProfileCompletion, ProfileService},
    },
    paths::{self, under_accounts},
    server::AppState,
};

pub mod reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(under_accounts(paths::SIGNUP), post(signup))
        .route(
            under_accounts(paths::VERIFY_EMAIL),
            get(get_pending_verification).post(verify_email),
        )
        .route(under_accounts(paths::RESEND_EMAIL), post(resend_email))
        .route(
            under_accounts(paths::PROFILE_SETUP),
            get(get_profile_setup).post(complete_profile),
        )
}

fn code_sent() -> Json<NextStepRep> {
    Json(NextStepRep::new(
        "We sent a verification code to your email.",
        paths::VERIFY_EMAIL,
    ))
}

async fn signup(
    State(accounts): State<AccountService>,
    ClientIp(client_ip): ClientIp,
    cookies: PrivateCookieJar,
    Json(new_user): Json<reps::SignupRequest>,
) -> ApiResponse<(StatusCode, PrivateCookieJar, Json<NextStepRep>)> {
    let pending = accounts
        .signup(&client_ip.to_string(), new_user.into())
        .await?;

    let cookies = pending::store(cookies, &pending)?;

    Ok((StatusCode::CREATED, cookies, code_sent()))
}

async fn get_pending_verification(
    cookies: PrivateCookieJar,
) -> ApiResponse<Json<reps::PendingVerificationRep>> {
    let pending = pending::load(&cookies).ok_or(AccountError::SessionExpired)?;

    Ok(Json(reps::PendingVerificationRep {
        email: pending.email,
    }))
}

async fn verify_email(
    State(accounts): State<AccountService>,
    ClientIp(client_ip): ClientIp,
    cookies: PrivateCookieJar,
    Json(request): Json<reps::VerifyEmailRequest>,
) -> ApiResponse<(PrivateCookieJar, Json<NextStepRep>)> {
    let pending = pending::load(&cookies);

    let authenticated = accounts
        .verify(&client_ip.to_string(), pending.as_ref(), &request.code)
        .await?;

    let cookies = session::establish(pending::clear(cookies), authenticated.user_id)?;

    Ok((cookies, Json(authenticated.landing.into())))
}

async fn resend_email(
    State(accounts): State<AccountService>,
    ClientIp(client_ip): ClientIp,
    cookies: PrivateCookieJar,
) -> ApiResponse<(PrivateCookieJar, Json<NextStepRep>)> {
    let pending = pending::load(&cookies);

    let refreshed = accounts
        .resend(&client_ip.to_string(), pending.as_ref())
        .await?;

    let cookies = pending::store(cookies, &refreshed)?;

    Ok((cookies, code_sent()))
}

pub enum ProfileSetupResponse {
    /// The profile still needs to be completed.
    Pending(reps::ProfileRep),
    Completed(NextStepRep),
}

impl IntoResponse for ProfileSetupResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Pending(profile) => Json(profile).into_response(),
            Self::Completed(next) => Json(next).into_response(),
        }
    }
}

fn already_completed() -> NextStepRep {
    NextStepRep::new("Your profile is already complete.", paths::HOME)
}

async fn get_profile_setup(
    session: Session,
    State(profiles): State<ProfileService>,
) -> ApiResponse<ProfileSetupResponse> {
    let profile = profiles
        .get(session.user_id())
        .await?
        .unwrap_or_else(|| Profile::empty_for(session.user_id()));

    if profile.is_completed {
        return Ok(ProfileSetupResponse::Completed(already_completed()));
    }

    Ok(ProfileSetupResponse::Pending(profile.into()))
}

async fn complete_profile(
    session: Session,
    State(profiles): State<ProfileService>,
    Json(profile): Json<reps::ProfileSetupRequest>,
) -> ApiResponse<Json<NextStepRep>> {
    match profiles.complete(session.user_id(), profile.into()).await? {
        ProfileCompletion::Completed => Ok(Json(NextStepRep::new(
            "Your profile is complete.",
            paths::HOME,
        ))),
        ProfileCompletion::AlreadyCompleted => {
            debug!(user_id = %session.user_id(), "Ignored completion of a completed profile.");

            Ok(Json(already_completed()))
        }
    }
}
