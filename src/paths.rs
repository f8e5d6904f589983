//! Route paths shared by the router, the profile gate and flow responses.

pub const ACCOUNTS_PREFIX: &str = "/accounts";

pub const HOME: &str = "/";
pub const ADMIN: &str = "/admin";

pub const SIGNUP: &str = "/accounts/signup";
pub const LOGIN: &str = "/accounts/login";
pub const LOGOUT: &str = "/accounts/logout";
pub const VERIFY_EMAIL: &str = "/accounts/verify-email";
pub const RESEND_EMAIL: &str = "/accounts/resend-email";
pub const PROFILE_SETUP: &str = "/accounts/profile/setup";
pub const ME: &str = "/accounts/me";

/// Prefixes for asset paths that never reach a handler of ours.
pub const ASSET_PREFIXES: [&str; 2] = ["/static/", "/media/"];

/// The part of an account path below [`ACCOUNTS_PREFIX`], for use when
/// registering routes on the nested router.
///
/// ```
/// use exchange_accounts::paths;
///
/// assert_eq!("/signup", paths::under_accounts(paths::SIGNUP));
/// assert_eq!("/", paths::under_accounts(paths::HOME));
/// ```
pub fn under_accounts(path: &'static str) -> &'static str {
    path.strip_prefix(ACCOUNTS_PREFIX)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(path)
}
