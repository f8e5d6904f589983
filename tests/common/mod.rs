#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::{Cookie, Key};
use exchange_accounts::{
    authentication::gate::ProfileGate,
    identities::{
        config::AccountsConfig,
        domain::{email::EmailDomainPolicy, profiles::Profile, users::User},
        provider::{DynOtpProvider, OtpProvider, ProviderError, VerificationHandle},
        services::{AccountService, ProfileService},
    },
    rate_limit::MemoryRateLimiter,
    repos::{MemoryStore, ProfileRepo, UserRepo},
    server::{self, AppState},
};
use serde_json::Value;
use tower::ServiceExt;

/// The only code [`FixedCodeProvider`] accepts.
pub const CODE: &str = "123456";

/// A provider that "sends" the same code every time and only accepts it
/// together with the most recent handle issued for an email.
#[derive(Default)]
pub struct FixedCodeProvider {
    latest_handles: Mutex<HashMap<String, String>>,
    sent: AtomicUsize,
    failing: AtomicBool,
}

impl FixedCodeProvider {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpProvider for FixedCodeProvider {
    async fn send_code(&self, email: &str) -> Result<VerificationHandle, ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(anyhow!("provider is down")));
        }

        let handle = format!("email-test-{}", self.sent.fetch_add(1, Ordering::SeqCst));
        self.latest_handles
            .lock()
            .unwrap()
            .insert(email.to_owned(), handle.clone());

        Ok(VerificationHandle::new(handle))
    }

    async fn verify_code(
        &self,
        submitted_code: &str,
        handle: Option<&VerificationHandle>,
        email: &str,
    ) -> Result<bool, ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(anyhow!("provider is down")));
        }

        let latest_handles = self.latest_handles.lock().unwrap();

        Ok(submitted_code == CODE
            && handle.map_or(false, |handle| {
                latest_handles.get(email).map(String::as_str) == Some(handle.as_str())
            }))
    }

    fn code_length(&self) -> usize {
        CODE.len()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn next(&self) -> Option<&str> {
        self.body["next"].as_str()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// The full router over in-memory backends, with a cookie jar that persists
/// across requests like a browser's would.
pub struct TestApp {
    router: Router,
    pub store: MemoryStore,
    pub provider: Arc<FixedCodeProvider>,
    cookies: Mutex<HashMap<String, String>>,
    client_ip: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AccountsConfig {
            email_policy: EmailDomainPolicy::new(["uni.edu"]),
            ..AccountsConfig::default()
        })
    }

    pub fn with_config(config: AccountsConfig) -> Self {
        let store = MemoryStore::new();
        let provider = Arc::new(FixedCodeProvider::default());
        let dyn_provider: DynOtpProvider = provider.clone();

        let accounts = AccountService::new(
            config,
            dyn_provider,
            Arc::new(store.clone()),
            Arc::new(MemoryRateLimiter::new()),
            Arc::new(store.clone()),
        );
        let profiles = ProfileService::new(Arc::new(store.clone()));
        let state = AppState::new(accounts, profiles, Key::generate(), ProfileGate::default());

        Self {
            router: server::router(state),
            store,
            provider,
            cookies: Mutex::new(HashMap::new()),
            client_ip: "203.0.113.7".to_owned(),
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.lock().unwrap().contains_key(name)
    }

    pub fn forget_cookies(&self) {
        self.cookies.lock().unwrap().clear();
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let cookie_header = self
            .cookies
            .lock()
            .unwrap()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", &self.client_ip);
        if !cookie_header.is_empty() {
            builder = builder.header(header::COOKIE, cookie_header);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        self.store_cookies(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn store_cookies(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.lock().unwrap();

        for value in headers.get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_owned()).unwrap();
            let removed = cookie.value().is_empty()
                || cookie
                    .max_age()
                    .map_or(false, |max_age| max_age.is_zero());

            if removed {
                cookies.remove(cookie.name());
            } else {
                cookies.insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/accounts/signup",
            serde_json::json!({
                "email": email,
                "password": password,
                "password_confirmation": password,
            }),
        )
        .await
    }

    pub async fn verify(&self, code: &str) -> TestResponse {
        self.post("/accounts/verify-email", serde_json::json!({ "code": code }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/accounts/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn complete_profile(&self) -> TestResponse {
        self.post(
            "/accounts/profile/setup",
            serde_json::json!({
                "full_name": "Alice Liddell",
                "university": "University of Oxford",
                "course": "Mathematics",
                "year_of_study": "2",
                "skills": "rust,  sql ,,",
            }),
        )
        .await
    }

    pub async fn user(&self, email: &str) -> User {
        self.store
            .get_user_by_email(email)
            .await
            .unwrap()
            .expect("user should exist")
    }

    pub async fn profile(&self, email: &str) -> Profile {
        let user = self.user(email).await;

        self.store
            .get_profile(user.id)
            .await
            .unwrap()
            .expect("profile should exist")
    }
}
