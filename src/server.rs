use std::{net::SocketAddr, sync::Arc};

use anyhow::{bail, Context};
use axum::{
    extract::FromRef, http::StatusCode, middleware, response::IntoResponse, routing::get, Json,
    Router,
};
use axum_extra::extract::cookie::Key;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    authentication::{
        self,
        gate::{require_completed_profile, ProfileGate},
    },
    cors::cors_layer,
    database::PostgresConnection,
    email::clients::{ConsoleMailer, DynEmailClient, Mailbox, SendgridMailer},
    http_err::ErrorRep,
    identities::{
        self,
        config::AccountsConfig,
        ledger::OtpLedger,
        provider::{DynOtpProvider, LocalProvider, StytchEnvironment, StytchProvider},
        services::{AccountService, DynRateLimiter, ProfileService},
    },
    paths,
    rate_limit::{MemoryRateLimiter, RedisRateLimiter},
    repos::{DynOtpRepo, DynProfileRepo, DynUserRepo, MemoryStore},
};

pub struct DatabaseOptions {
    pub pool_size: u32,
    pub timeout_seconds: u8,
    pub url: String,
}

pub enum ProviderOptions {
    /// Codes come from the local ledger and are sent by email.
    Local,
    Stytch {
        environment: StytchEnvironment,
        project_id: String,
        secret: String,
    },
}

pub struct Options {
    pub accounts: AccountsConfig,
    pub bind_address: SocketAddr,

    /// Without a database, everything is kept in memory.
    pub database: Option<DatabaseOptions>,

    pub email_from_address: String,
    pub email_from_name: String,
    pub otp_provider: ProviderOptions,
    pub redis_url: Option<String>,
    pub secret_key: String,
    pub sendgrid_key: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    accounts: AccountService,
    cookie_key: Key,
    gate: ProfileGate,
    profiles: ProfileService,
}

impl AppState {
    pub fn new(
        accounts: AccountService,
        profiles: ProfileService,
        cookie_key: Key,
        gate: ProfileGate,
    ) -> Self {
        Self {
            accounts,
            cookie_key,
            gate,
            profiles,
        }
    }

    pub fn gate(&self) -> &ProfileGate {
        &self.gate
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }
}

/// The repositories backing the application.
#[derive(Clone)]
pub struct Repos {
    pub otp_repo: DynOtpRepo,
    pub profile_repo: DynProfileRepo,
    pub user_repo: DynUserRepo,
}

impl From<PostgresConnection> for Repos {
    fn from(db: PostgresConnection) -> Self {
        Self {
            otp_repo: Arc::new(db.clone()),
            profile_repo: Arc::new(db.clone()),
            user_repo: Arc::new(db),
        }
    }
}

impl From<MemoryStore> for Repos {
    fn from(store: MemoryStore) -> Self {
        Self {
            otp_repo: Arc::new(store.clone()),
            profile_repo: Arc::new(store.clone()),
            user_repo: Arc::new(store),
        }
    }
}

/// Derive the cookie encryption key from a base64 encoded secret.
pub fn cookie_key(secret_key: &str) -> anyhow::Result<Key> {
    let master_key = base64::decode(secret_key).context("Secret key is not valid base64.")?;
    if master_key.len() < 32 {
        bail!("Secret key must decode to at least 32 bytes.");
    }

    Ok(Key::derive_from(&master_key))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorRep {
            message: "Not found.".to_owned(),
        }),
    )
}

pub fn router(state: AppState) -> Router {
    let accounts = authentication::http::routes().merge(identities::http::routes());

    Router::new()
        .route(paths::HOME, get(authentication::http::home))
        .nest(paths::ACCOUNTS_PREFIX, accounts)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_completed_profile,
        ))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(opts: Options) -> anyhow::Result<()> {
    let cookie_key = cookie_key(&opts.secret_key)?;

    let repos: Repos = match &opts.database {
        Some(database) => {
            PostgresConnection::connect(&database.url, database.pool_size, database.timeout_seconds)
                .await?
                .into()
        }
        None => {
            warn!("No database configured. Accounts will only be kept in memory.");

            MemoryStore::new().into()
        }
    };

    let rate_limiter: DynRateLimiter = match &opts.redis_url {
        Some(redis_url) => Arc::new(RedisRateLimiter::new(redis_url)?),
        None => {
            warn!("No Redis configured. Rate limits are tracked per process.");

            Arc::new(MemoryRateLimiter::new())
        }
    };

    let otp_provider: DynOtpProvider = match opts.otp_provider {
        ProviderOptions::Stytch {
            environment,
            project_id,
            secret,
        } => Arc::new(StytchProvider::new(
            environment,
            project_id,
            secret,
            opts.accounts.otp_ttl_minutes,
            opts.accounts.provider_timeout,
        )?),
        ProviderOptions::Local => {
            let from = Mailbox {
                address: opts.email_from_address,
                name: opts.email_from_name,
            };
            let mailer: DynEmailClient = match opts.sendgrid_key {
                Some(api_key) => Arc::new(SendgridMailer::new(api_key, from)),
                None => {
                    warn!("No SendGrid key provided, verification emails will only be logged.");
                    Arc::new(ConsoleMailer::new(from))
                }
            };
            let ledger = OtpLedger::new(
                repos.otp_repo.clone(),
                opts.accounts.otp_length,
                opts.accounts.otp_ttl_minutes,
            );

            Arc::new(LocalProvider::new(ledger, mailer, repos.user_repo.clone()))
        }
    };

    let accounts = AccountService::new(
        opts.accounts,
        otp_provider,
        repos.profile_repo.clone(),
        rate_limiter,
        repos.user_repo.clone(),
    );
    let profiles = ProfileService::new(repos.profile_repo);

    let state = AppState::new(accounts, profiles, cookie_key, ProfileGate::default());

    info!(address = %opts.bind_address, "Starting server.");

    axum::Server::bind(&opts.bind_address)
        .serve(router(state).into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for ProfileService {
    fn from_ref(state: &AppState) -> Self {
        state.profiles.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_secret_key_is_rejected() {
        assert!(cookie_key(&base64::encode([0u8; 16])).is_err());
    }

    #[test]
    fn secret_key_must_be_base64() {
        assert!(cookie_key("not base64!").is_err());
    }

    #[test]
    fn long_secret_key_is_accepted() {
        assert!(cookie_key(&base64::encode([7u8; 32])).is_ok());
    }
}
