use std::collections::HashSet;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use tracing::{debug, error, warn};

use crate::{http_err::InternalServerError, paths, server::AppState};

use super::domain::session::Session;

#[derive(Debug, Eq, PartialEq)]
pub enum GateDecision {
    Pass,
    /// Send the caller to the contained path instead.
    Redirect(String),
}

/// Keeps logged in users with an incomplete profile on the profile setup
/// flow.
#[derive(Clone, Debug)]
pub struct ProfileGate {
    setup_path: String,
    allowed: HashSet<String>,
}

impl ProfileGate {
    /// Create a gate redirecting to `setup_path`.
    ///
    /// A path that is not absolute is replaced with the default profile setup
    /// path.
    pub fn new(setup_path: &str) -> Self {
        let setup_path = if setup_path.starts_with('/') {
            setup_path.trim_end_matches('/').to_owned()
        } else {
            warn!(setup_path, "Invalid profile setup path, using the default.");

            paths::PROFILE_SETUP.to_owned()
        };

        let allowed = [
            paths::LOGOUT,
            paths::VERIFY_EMAIL,
            paths::RESEND_EMAIL,
            paths::LOGIN,
            paths::SIGNUP,
            paths::ADMIN,
        ]
        .iter()
        .map(|path| path.to_string())
        .chain(std::iter::once(setup_path.clone()))
        .collect();

        Self {
            setup_path,
            allowed,
        }
    }

    pub fn setup_path(&self) -> &str {
        &self.setup_path
    }

    /// Whether `path` is reachable regardless of profile state.
    pub fn is_exempt(&self, path: &str) -> bool {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        self.allowed.contains(trimmed)
            || path.starts_with(&format!("{}/", paths::ADMIN))
            || paths::ASSET_PREFIXES
                .iter()
                .any(|prefix| path.starts_with(prefix))
    }

    /// Decide what happens to a request for `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - The requested path.
    /// * `profile_completed` - The completion flag of the caller's profile, or
    ///   [None] if the caller is anonymous or has no profile.
    pub fn decide(&self, path: &str, profile_completed: Option<bool>) -> GateDecision {
        match profile_completed {
            Some(false) if !self.is_exempt(path) => GateDecision::Redirect(self.setup_path.clone()),
            _ => GateDecision::Pass,
        }
    }
}

impl Default for ProfileGate {
    fn default() -> Self {
        Self::new(paths::PROFILE_SETUP)
    }
}

/// Middleware applying the [`ProfileGate`] to every request.
pub async fn require_completed_profile<B>(
    State(state): State<AppState>,
    cookies: PrivateCookieJar,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let gate = state.gate();
    let path = request.uri().path().to_owned();

    let session = match Session::from_jar(&cookies) {
        Some(session) if !gate.is_exempt(&path) => session,
        _ => return next.run(request).await,
    };

    let profile_completed = match state.profiles().get(session.user_id()).await {
        Ok(profile) => profile.map(|profile| profile.is_completed),
        Err(error) => {
            error!(?error, user_id = %session.user_id(), "Failed to load profile for gate.");

            return InternalServerError::default().into_response();
        }
    };

    match gate.decide(&path, profile_completed) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Redirect(to) => {
            debug!(user_id = %session.user_id(), %path, "Redirecting to profile setup.");

            Redirect::to(&to).into_response()
        }
    }
}
