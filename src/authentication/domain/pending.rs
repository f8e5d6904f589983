//! The verification a caller has in flight, carried in its own private
//! cookie so that it is scoped to that caller.

use anyhow::Result;
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    PrivateCookieJar,
};
use cookie::time::Duration;
use tracing::warn;

use crate::identities::domain::verification::PendingVerification;

use super::session::removal_cookie;

pub const PENDING_VERIFICATION_COOKIE: &str = "pending_verification";

pub fn load(cookies: &PrivateCookieJar) -> Option<PendingVerification> {
    let cookie = cookies.get(PENDING_VERIFICATION_COOKIE)?;

    serde_json::from_str(cookie.value())
        .map_err(|error| warn!(?error, "Received malformed pending verification."))
        .ok()
}

pub fn store(cookies: PrivateCookieJar, pending: &PendingVerification) -> Result<PrivateCookieJar> {
    let cookie = Cookie::build(PENDING_VERIFICATION_COOKIE, serde_json::to_string(pending)?)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(1))
        .finish();

    Ok(cookies.add(cookie))
}

pub fn clear(cookies: PrivateCookieJar) -> PrivateCookieJar {
    cookies.remove(removal_cookie(PENDING_VERIFICATION_COOKIE))
}

#[cfg(test)]
mod test {
    use axum_extra::extract::cookie::Key;
    use uuid::Uuid;

    use crate::identities::provider::VerificationHandle;

    use super::*;

    #[test]
    fn stored_verification_loads() -> Result<()> {
        let pending = PendingVerification {
            user_id: Uuid::new_v4(),
            email: "alice@uni.edu".to_owned(),
            handle: Some(VerificationHandle::new("email-test-1")),
        };

        let cookies = store(PrivateCookieJar::new(Key::generate()), &pending)?;

        assert_eq!(Some(pending), load(&cookies));

        Ok(())
    }

    #[test]
    fn missing_cookie_loads_nothing() {
        assert_eq!(None, load(&PrivateCookieJar::new(Key::generate())));
    }
}
