use std::{convert::TryFrom, sync::Arc};

use anyhow::{anyhow, Context};
use semval::ValidatedFrom;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    rate_limit::{RateLimitResult, RateLimiter},
    repos::{DynProfileRepo, DynUserRepo, UserPersistenceError},
};

use super::{
    config::AccountsConfig,
    domain::{
        email::Email,
        otp::{SubmittedCode, SubmittedCodeInvalidity},
        profiles::{CompletedProfile, Profile, ProfileData, ProfileInvalidity},
        users::{NewUser, NewUserData, NewUserInvalidity, User},
        verification::{Landing, PendingVerification},
    },
    models::users::NewUserModel,
    provider::{DynOtpProvider, VerificationHandle},
};

pub type DynRateLimiter = Arc<dyn RateLimiter>;

/// The number of attempts a client may make at each flow step per minute.
const MAX_ATTEMPTS_PER_MINUTE: u64 = 10;

#[derive(Debug, Error)]
pub enum AccountError {
    /// The email's domain is not on the signup allow-list.
    #[error("email domain {0:?} may not sign up")]
    DomainNotAllowed(String),

    /// The provided user data is invalid.
    #[error("invalid user data: {0:?}")]
    InvalidUser(semval::context::Context<NewUserInvalidity>),

    #[error("duplicate email address: {0}")]
    DuplicateEmail(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    /// The submitted code is not shaped like a verification code.
    #[error("malformed verification code: {0:?}")]
    MalformedCode(semval::context::Context<SubmittedCodeInvalidity>),

    #[error("invalid or expired verification code")]
    InvalidOrExpiredCode,

    /// There is no verification in progress to submit a code for.
    #[error("no verification in progress")]
    SessionExpired,

    /// There is no verification in progress to resend a code for.
    #[error("no verification to resend a code for")]
    NothingToResend,

    /// The OTP provider failed to deliver a code or did not answer in time.
    #[error("OTP provider unavailable")]
    ProviderUnavailable(#[source] anyhow::Error),

    /// The operation is rate limited for the provided client.
    #[error("operation is rate limited")]
    RateLimited(RateLimitResult),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A user who may be given an authenticated session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Authenticated {
    pub user_id: Uuid,
    pub landing: Landing,
}

#[derive(Debug)]
pub enum LoginOutcome {
    /// The user's email is not verified yet, and a code has been sent.
    VerificationRequired(PendingVerification),
    Authenticated(Authenticated),
}

fn landing_for(profile: Option<&Profile>) -> Landing {
    match profile {
        Some(profile) if !profile.is_completed => Landing::ProfileSetup,
        _ => Landing::Home,
    }
}

/// Drives signup, login and email verification.
#[derive(Clone)]
pub struct AccountService {
    config: AccountsConfig,
    otp_provider: DynOtpProvider,
    profile_repo: DynProfileRepo,
    rate_limiter: DynRateLimiter,
    user_repo: DynUserRepo,
}

impl AccountService {
    /// Create a new account service.
    ///
    /// # Arguments
    ///
    /// * `config` - Domain policy and code settings for the flow.
    /// * `otp_provider` - Delivers and verifies codes.
    /// * `profile_repo` - Used to route users by profile completion.
    /// * `rate_limiter` - The rate limiter to use for rate limited operations.
    /// * `user_repo` - The repository used to persist and query users.
    pub fn new(
        config: AccountsConfig,
        otp_provider: DynOtpProvider,
        profile_repo: DynProfileRepo,
        rate_limiter: DynRateLimiter,
        user_repo: DynUserRepo,
    ) -> Self {
        Self {
            config,
            otp_provider,
            profile_repo,
            rate_limiter,
            user_repo,
        }
    }

    pub fn config(&self) -> &AccountsConfig {
        &self.config
    }

    /// Create an unverified user and send them a verification code.
    ///
    /// The domain policy is checked before anything is persisted.
    ///
    /// # Arguments
    ///
    /// * `client_identifier` - A unique identifier for the client performing
    ///   the operation. This is used for rate limiting.
    /// * `new_user_data` - The new user's information.
    pub async fn signup(
        &self,
        client_identifier: &str,
        new_user_data: NewUserData,
    ) -> Result<PendingVerification, AccountError> {
        self.check_rate_limit("signup", client_identifier)?;

        let new_user = NewUser::validated_from(new_user_data)
            .map_err(|(_, context)| AccountError::InvalidUser(context))?;

        if !self.config.email_policy.allows(new_user.email()) {
            let domain = new_user.email().domain().unwrap_or_default().to_owned();
            debug!(%domain, "Rejected signup from a domain that is not allowed.");

            return Err(AccountError::DomainNotAllowed(domain));
        }

        let user_model = NewUserModel::try_from(&new_user)
            .context("Failed to convert from domain to model.")?;

        let user = match self.user_repo.persist_new_user(&user_model).await {
            Ok(user) => user,
            Err(UserPersistenceError::DuplicateEmail(email)) => {
                return Err(AccountError::DuplicateEmail(email));
            }
            Err(UserPersistenceError::Other(error)) => {
                error!(?error, "Failed to persist new user.");

                return Err(error.into());
            }
        };

        info!(user_id = %user.id, "Created unverified user.");

        self.start_verification(&user).await
    }

    /// Check a user's credentials.
    ///
    /// Verified users are authenticated straight away. Unverified users are
    /// sent a code and have to finish verification first.
    pub async fn login(
        &self,
        client_identifier: &str,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, AccountError> {
        self.check_rate_limit("login", client_identifier)?;

        let user = self.authenticate(email, password).await?;
        debug!(user_id = %user.id, "Validated user credentials.");

        if !user.email_verified {
            let pending = self.start_verification(&user).await?;

            return Ok(LoginOutcome::VerificationRequired(pending));
        }

        let landing = self.landing(user.id).await?;

        Ok(LoginOutcome::Authenticated(Authenticated {
            user_id: user.id,
            landing,
        }))
    }

    /// Submit a code for the caller's pending verification.
    ///
    /// A wrong code leaves the pending verification as it was so the caller
    /// can try again.
    pub async fn verify(
        &self,
        client_identifier: &str,
        pending: Option<&PendingVerification>,
        submitted_code: &str,
    ) -> Result<Authenticated, AccountError> {
        let pending = pending.ok_or(AccountError::SessionExpired)?;

        self.check_rate_limit("verify-email", client_identifier)?;

        let code = SubmittedCode::parse(submitted_code, self.otp_provider.code_length())
            .map_err(AccountError::MalformedCode)?;

        let verification = self.otp_provider.verify_code(
            code.as_str(),
            pending.handle.as_ref(),
            &pending.email,
        );
        let verified = match timeout(self.config.provider_timeout, verification).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(error)) => {
                error!(?error, user_id = %pending.user_id, "Failed to verify code with provider.");

                return Err(AccountError::ProviderUnavailable(error.into()));
            }
            Err(_) => {
                error!(user_id = %pending.user_id, "Timed out verifying code with provider.");

                return Err(AccountError::ProviderUnavailable(anyhow!(
                    "timed out verifying code"
                )));
            }
        };

        if !verified {
            info!(user_id = %pending.user_id, "Rejected verification code.");

            return Err(AccountError::InvalidOrExpiredCode);
        }

        let user = self
            .user_repo
            .get_user(pending.user_id)
            .await?
            .ok_or(AccountError::SessionExpired)?;

        if !user.is_active {
            info!(user_id = %user.id, "Refused verification for an inactive user.");

            return Err(AccountError::InvalidCredentials);
        }

        if !user.email_verified {
            self.user_repo
                .mark_email_verified(user.id)
                .await
                .context("Failed to mark email as verified.")?;
        }

        info!(user_id = %user.id, "Verified email address.");

        Ok(Authenticated {
            user_id: user.id,
            landing: self.landing(user.id).await?,
        })
    }

    /// Send a fresh code for the caller's pending verification.
    pub async fn resend(
        &self,
        client_identifier: &str,
        pending: Option<&PendingVerification>,
    ) -> Result<PendingVerification, AccountError> {
        let pending = pending.ok_or(AccountError::NothingToResend)?;

        self.check_rate_limit("resend-email", client_identifier)?;

        let handle = self.send_code(&pending.email).await?;
        info!(user_id = %pending.user_id, "Resent verification code.");

        Ok(PendingVerification {
            handle: Some(handle),
            ..pending.clone()
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        self.user_repo.get_user(user_id).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = Email::unvalidated(email);

        let user = match self.user_repo.get_user_by_email(email.address()).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AccountError::InvalidCredentials),
        };

        if user.check_password(password)? {
            Ok(user)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    async fn start_verification(&self, user: &User) -> Result<PendingVerification, AccountError> {
        let handle = self.send_code(&user.email).await?;

        Ok(PendingVerification {
            user_id: user.id,
            email: user.email.clone(),
            handle: Some(handle),
        })
    }

    async fn send_code(&self, email: &str) -> Result<VerificationHandle, AccountError> {
        match timeout(self.config.provider_timeout, self.otp_provider.send_code(email)).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(error)) => {
                error!(?error, "Failed to send verification code.");

                Err(AccountError::ProviderUnavailable(error.into()))
            }
            Err(_) => {
                error!("Timed out sending verification code.");

                Err(AccountError::ProviderUnavailable(anyhow!(
                    "timed out sending verification code"
                )))
            }
        }
    }

    async fn landing(&self, user_id: Uuid) -> anyhow::Result<Landing> {
        let profile = self.profile_repo.get_profile(user_id).await?;

        Ok(landing_for(profile.as_ref()))
    }

    fn check_rate_limit(&self, operation: &str, client_identifier: &str) -> Result<(), AccountError> {
        let rate_limit_key = format!("/accounts/{}_post_{}", operation, client_identifier);

        match self
            .rate_limiter
            .is_limited(&rate_limit_key, MAX_ATTEMPTS_PER_MINUTE)
            .context("Failed to query rate limiter.")?
        {
            RateLimitResult::NotLimited => Ok(()),
            result @ RateLimitResult::LimitedUntil(_) => Err(AccountError::RateLimited(result)),
        }
    }
}

/// Whether a profile-completion attempt did anything.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileCompletion {
    Completed,
    /// The profile was completed before; nothing was changed.
    AlreadyCompleted,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile data: {0:?}")]
    Invalid(semval::context::Context<ProfileInvalidity>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A service object providing functionality relating to profiles.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: DynProfileRepo,
}

impl ProfileService {
    pub fn new(profile_repo: DynProfileRepo) -> Self {
        Self { profile_repo }
    }

    pub async fn get(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        self.profile_repo.get_profile(user_id).await
    }

    /// Fill in a user's profile and mark it completed.
    ///
    /// Completing an already completed profile changes nothing and is not an
    /// error.
    pub async fn complete(
        &self,
        user_id: Uuid,
        data: ProfileData,
    ) -> Result<ProfileCompletion, ProfileError> {
        let existing = self.profile_repo.get_profile(user_id).await?;
        if existing.map_or(false, |profile| profile.is_completed) {
            return Ok(ProfileCompletion::AlreadyCompleted);
        }

        let completed = CompletedProfile::validated_from(data)
            .map_err(|(_, context)| ProfileError::Invalid(context))?;

        if self.profile_repo.complete_profile(user_id, &completed).await? {
            info!(%user_id, "Completed user profile.");

            Ok(ProfileCompletion::Completed)
        } else {
            Ok(ProfileCompletion::AlreadyCompleted)
        }
    }
}
