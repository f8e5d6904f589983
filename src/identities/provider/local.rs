use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    email::{self, clients::DynEmailClient},
    identities::{
        domain::otp::{OtpPurpose, OtpRecord},
        ledger::OtpLedger,
    },
    repos::DynUserRepo,
};

use super::{OtpProvider, ProviderError, VerificationHandle};

/// Codes issued from the local ledger and delivered by email.
///
/// Here the ledger is authoritative: a code is consumed by the verification
/// that accepts it.
pub struct LocalProvider {
    ledger: OtpLedger,
    mailer: DynEmailClient,
    user_repo: DynUserRepo,
}

const PURPOSE: OtpPurpose = OtpPurpose::Signup;

impl LocalProvider {
    pub fn new(ledger: OtpLedger, mailer: DynEmailClient, user_repo: DynUserRepo) -> Self {
        Self {
            ledger,
            mailer,
            user_repo,
        }
    }

    async fn find_record(
        &self,
        handle: Option<&VerificationHandle>,
        email: &str,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let user = match self.user_repo.get_user_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let record = match handle {
            Some(handle) => {
                let id = match Uuid::parse_str(handle.as_str()) {
                    Ok(id) => id,
                    Err(_) => {
                        debug!(%handle, "Verification handle is not a ledger id.");
                        return Ok(None);
                    }
                };

                self.ledger.get(id).await?
            }
            None => self.ledger.latest_unused(user.id, PURPOSE).await?,
        };

        Ok(record.filter(|record| record.user_id == user.id))
    }
}

#[async_trait]
impl OtpProvider for LocalProvider {
    async fn send_code(&self, email: &str) -> Result<VerificationHandle, ProviderError> {
        let user = self
            .user_repo
            .get_user_by_email(email)
            .await
            .map_err(ProviderError::Unavailable)?
            .ok_or_else(|| ProviderError::Unavailable(anyhow!("no user owns {}", email)))?;

        let record = self
            .ledger
            .issue(user.id, PURPOSE)
            .await
            .map_err(ProviderError::Unavailable)?;

        let message = email::verification_code_message(
            &user.email,
            &record.code,
            self.ledger.ttl_minutes(),
        );
        self.mailer
            .send(&message)
            .await
            .context("Failed to send verification code email.")
            .map_err(ProviderError::Unavailable)?;

        info!(user_id = %user.id, otp_id = %record.id, "Emailed one-time password.");

        Ok(VerificationHandle::new(record.id.to_string()))
    }

    async fn verify_code(
        &self,
        submitted_code: &str,
        handle: Option<&VerificationHandle>,
        email: &str,
    ) -> Result<bool, ProviderError> {
        let record = match self
            .find_record(handle, email)
            .await
            .context("Failed to look up one-time password.")
            .map_err(ProviderError::Unavailable)?
        {
            Some(record) => record,
            None => {
                debug!("No one-time password to verify against.");
                return Ok(false);
            }
        };

        self.ledger
            .redeem(&record, submitted_code)
            .await
            .with_context(|| format!("Failed to redeem one-time password {}.", record.id))
            .map_err(ProviderError::Unavailable)
    }

    fn code_length(&self) -> usize {
        self.ledger.code_length()
    }
}
