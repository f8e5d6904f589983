//! Password policy and storage.

mod hash;
mod password;

pub use hash::Hash;
pub use password::{Password, PasswordInvalidity};

/// What is on file for a user's password.
#[derive(Clone, Debug)]
pub enum StoredPassword {
    /// The account was provisioned without a password and cannot be logged
    /// into with one.
    Unusable,
    Hashed(Hash),
}

impl StoredPassword {
    /// Interpret a persisted, possibly absent, PHC string.
    pub fn from_stored(stored: Option<&str>) -> anyhow::Result<Self> {
        Ok(match stored {
            Some(phc) => Self::Hashed(phc.parse()?),
            None => Self::Unusable,
        })
    }

    pub fn verify(&self, raw_password: &str) -> anyhow::Result<bool> {
        match self {
            Self::Unusable => Ok(false),
            Self::Hashed(hash) => hash.verify(raw_password),
        }
    }
}
