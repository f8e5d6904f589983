use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain::users::{NewUser, User};

/// A user ready to be inserted.
#[derive(Clone, Debug)]
pub struct NewUserModel {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_staff: bool,
}

impl TryFrom<&NewUser> for NewUserModel {
    type Error = anyhow::Error;

    fn try_from(user: &NewUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: user.id(),
            email: user.email().address().to_owned(),
            password_hash: user.password_hash()?.map(String::from),
            is_staff: user.is_staff(),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct UserModel {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            email_verified: model.email_verified,
            is_active: model.is_active,
            is_staff: model.is_staff,
            date_joined: model.date_joined,
        }
    }
}
