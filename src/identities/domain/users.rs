use anyhow::Result;
use chrono::{DateTime, Utc};
use semval::prelude::*;
use uuid::Uuid;

use crate::passwords::{self, Password, PasswordInvalidity, StoredPassword};

use super::email::{Email, EmailInvalidity};

#[derive(Debug)]
pub struct NewUser {
    id: Uuid,
    email: Email,
    password: Option<Password>,
    is_staff: bool,
}

impl NewUser {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    /// Mark the user as staff.
    pub fn into_staff(self) -> Self {
        Self {
            is_staff: true,
            ..self
        }
    }

    /// Hash the user's password. Users created without a password get no
    /// hash, which leaves them with no usable password.
    pub fn password_hash(&self) -> Result<Option<passwords::Hash>> {
        self.password.as_ref().map(passwords::Hash::new).transpose()
    }
}

#[derive(Debug)]
pub enum NewUserInvalidity {
    Email(EmailInvalidity),
    Password(PasswordInvalidity),
}

impl Validate for NewUser {
    type Invalidity = NewUserInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let context =
            ValidationContext::new().validate_with(&self.email, NewUserInvalidity::Email);

        match self.password.as_ref() {
            Some(password) => context.validate_with(password, NewUserInvalidity::Password),
            None => context,
        }
        .into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewUserData {
    pub email: String,
    pub password: Option<String>,
    /// A second copy of the password. Only checked when present.
    pub password_confirmation: Option<String>,
}

impl ValidatedFrom<NewUserData> for NewUser {
    fn validated_from(from: NewUserData) -> ValidatedResult<Self> {
        let confirmation = from.password_confirmation;
        let password = from.password.map(|raw| {
            let password = Password::unvalidated(raw);

            match confirmation {
                Some(confirmation) => password.confirmed_by(confirmation),
                None => password,
            }
        });

        let into = NewUser {
            id: Uuid::new_v4(),
            email: Email::unvalidated(&from.email),
            password,
            is_staff: false,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A persisted user.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Check a raw password against the user's stored hash.
    pub fn check_password(&self, raw_password: &str) -> Result<bool> {
        StoredPassword::from_stored(self.password_hash.as_deref())?.verify(raw_password)
    }
}
