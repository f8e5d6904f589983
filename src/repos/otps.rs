use std::{convert::TryFrom, sync::Arc};

use anyhow::bail;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::{
        domain::otp::{OtpPurpose, OtpRecord},
        models::otp::{NewOtpModel, OtpModel},
    },
};

pub type DynOtpRepo = Arc<dyn OtpRepo + Send + Sync>;

#[async_trait]
pub trait OtpRepo {
    /// Issue a one-time password.
    ///
    /// Every unused record for the same user and purpose is marked used in the
    /// same atomic unit as the insert, so at most one unused record exists per
    /// (user, purpose) at any time.
    async fn issue_otp(&self, otp: &NewOtpModel) -> anyhow::Result<OtpRecord>;

    async fn get_otp(&self, id: Uuid) -> anyhow::Result<Option<OtpRecord>>;

    async fn latest_unused_otp(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<OtpRecord>>;

    /// Mark a record used. Returns `false` if it was already used.
    async fn mark_otp_used(&self, id: Uuid) -> anyhow::Result<bool>;
}

const OTP_COLUMNS: &str = "id, user_id, code, purpose, created_at, expires_at, is_used, last_sent";

#[async_trait]
impl OtpRepo for PostgresConnection {
    async fn issue_otp(&self, otp: &NewOtpModel) -> anyhow::Result<OtpRecord> {
        let mut tx = self.begin().await?;

        // Concurrent issuers for the same user queue up behind this row lock.
        let owner = sqlx::query(r#"SELECT id FROM "user" WHERE id = $1 FOR UPDATE"#)
            .bind(otp.user_id)
            .fetch_optional(&mut tx)
            .await?;
        if owner.is_none() {
            bail!("cannot issue a one-time password for unknown user {}", otp.user_id);
        }

        sqlx::query(
            r#"
            UPDATE otp
            SET is_used = TRUE
            WHERE user_id = $1 AND purpose = $2 AND NOT is_used
            "#,
        )
        .bind(otp.user_id)
        .bind(otp.purpose.as_str())
        .execute(&mut tx)
        .await?;

        let insert = format!(
            r#"
            INSERT INTO otp (id, user_id, code, purpose, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            OTP_COLUMNS
        );
        let issued = sqlx::query_as::<_, OtpModel>(&insert)
            .bind(otp.id)
            .bind(otp.user_id)
            .bind(&otp.code)
            .bind(otp.purpose.as_str())
            .bind(otp.expires_at)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        OtpRecord::try_from(issued)
    }

    async fn get_otp(&self, id: Uuid) -> anyhow::Result<Option<OtpRecord>> {
        let query = format!("SELECT {} FROM otp WHERE id = $1", OTP_COLUMNS);

        sqlx::query_as::<_, OtpModel>(&query)
            .bind(id)
            .fetch_optional(&**self)
            .await?
            .map(OtpRecord::try_from)
            .transpose()
    }

    async fn latest_unused_otp(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let query = format!(
            r#"
            SELECT {}
            FROM otp
            WHERE user_id = $1 AND purpose = $2 AND NOT is_used
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            OTP_COLUMNS
        );

        sqlx::query_as::<_, OtpModel>(&query)
            .bind(user_id)
            .bind(purpose.as_str())
            .fetch_optional(&**self)
            .await?
            .map(OtpRecord::try_from)
            .transpose()
    }

    async fn mark_otp_used(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE otp SET is_used = TRUE WHERE id = $1 AND NOT is_used")
            .bind(id)
            .execute(&**self)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
