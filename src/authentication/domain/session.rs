use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use cookie::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::http_err::ApiError;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Deserialize, Serialize)]
pub struct Session {
    id: Uuid,
    user_id: Uuid,
}

impl Session {
    /// Create a new session for a specific user.
    ///
    /// # Example
    ///
    /// ```
    /// # use uuid::Uuid;
    /// # use exchange_accounts::authentication::domain::session::Session;
    ///
    /// let user_id = Uuid::new_v4();
    /// let session = Session::new_for_user(user_id);
    ///
    /// assert_eq!(user_id, session.user_id());
    /// ```
    pub fn new_for_user(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
        }
    }

    /// Read the session out of a request's cookies. A missing or malformed
    /// cookie means there is no session.
    pub fn from_jar(cookies: &PrivateCookieJar) -> Option<Self> {
        let session_cookie = cookies.get(SESSION_COOKIE)?;

        match serde_json::from_str::<Session>(session_cookie.value()) {
            Ok(session) => {
                debug!(user_id = %session.user_id(), session_id = %session.id(), "Parsed cookie session.");

                Some(session)
            }
            Err(error) => {
                warn!(?error, "Received malformed session value.");

                None
            }
        }
    }

    pub fn serialized(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn cookie(&self) -> Result<Cookie<'static>> {
        Ok(Cookie::build(SESSION_COOKIE, self.serialized()?)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::days(7))
            .finish())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// Start a fresh session for `user_id`, replacing any existing one.
pub fn establish(cookies: PrivateCookieJar, user_id: Uuid) -> Result<PrivateCookieJar> {
    let session = Session::new_for_user(user_id);
    debug!(%user_id, session_id = %session.id(), "Established session.");

    Ok(cookies.add(session.cookie()?))
}

pub fn destroy(cookies: PrivateCookieJar) -> PrivateCookieJar {
    cookies.remove(removal_cookie(SESSION_COOKIE))
}

/// A cookie that, once sent back, clears the named cookie.
pub(crate) fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::named(name);
    cookie.set_path("/");

    cookie
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(cookies) => cookies,
            Err(never) => match never {},
        };

        Session::from_jar(&cookies).ok_or_else(|| ApiError::login_required("Please log in."))
    }
}
