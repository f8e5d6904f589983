use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain::otp::{OtpPurpose, OtpRecord};

/// A one-time password ready to be issued.
#[derive(Clone, Debug)]
pub struct NewOtpModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct OtpModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub last_sent: DateTime<Utc>,
}

impl TryFrom<OtpModel> for OtpRecord {
    type Error = anyhow::Error;

    fn try_from(model: OtpModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            code: model.code,
            purpose: model.purpose.parse()?,
            created_at: model.created_at,
            expires_at: model.expires_at,
            is_used: model.is_used,
            last_sent: model.last_sent,
        })
    }
}
