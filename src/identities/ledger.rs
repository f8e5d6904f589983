use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::repos::DynOtpRepo;

use super::{
    domain::otp::{generate_code, OtpPurpose, OtpRecord},
    models::otp::NewOtpModel,
};

/// Issues and checks locally stored one-time passwords.
#[derive(Clone)]
pub struct OtpLedger {
    otp_repo: DynOtpRepo,
    code_length: usize,
    ttl: Duration,
}

impl OtpLedger {
    pub fn new(otp_repo: DynOtpRepo, code_length: usize, ttl_minutes: i64) -> Self {
        Self {
            otp_repo,
            code_length,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }

    /// Issue a fresh code for a user, retiring any unused codes they hold for
    /// the same purpose.
    pub async fn issue(&self, user_id: Uuid, purpose: OtpPurpose) -> anyhow::Result<OtpRecord> {
        let otp = NewOtpModel {
            id: Uuid::new_v4(),
            user_id,
            code: generate_code(self.code_length),
            purpose,
            expires_at: Utc::now() + self.ttl,
        };

        let issued = self
            .otp_repo
            .issue_otp(&otp)
            .await
            .context("Failed to persist one-time password.")?;

        debug!(%user_id, otp_id = %issued.id, %purpose, "Issued one-time password.");

        Ok(issued)
    }

    /// Check a submitted code against a record without consuming it.
    pub fn validate(&self, record: &OtpRecord, submitted_code: &str) -> bool {
        record.is_valid(submitted_code, Utc::now())
    }

    /// Validate a code and, if it is valid, mark the record used.
    ///
    /// Of two concurrent redemptions of the same record only one succeeds.
    pub async fn redeem(&self, record: &OtpRecord, submitted_code: &str) -> anyhow::Result<bool> {
        if !self.validate(record, submitted_code) {
            return Ok(false);
        }

        self.otp_repo.mark_otp_used(record.id).await
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<OtpRecord>> {
        self.otp_repo.get_otp(id).await
    }

    pub async fn latest_unused(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<OtpRecord>> {
        self.otp_repo.latest_unused_otp(user_id, purpose).await
    }
}
