use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use semval::prelude::*;
use uuid::Uuid;

/// What a one-time password was issued for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OtpPurpose {
    Signup,
    Login,
    Reset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signup" => Ok(Self::Signup),
            "login" => Ok(Self::Login),
            "reset" => Ok(Self::Reset),
            other => Err(anyhow::anyhow!("unknown OTP purpose {:?}", other)),
        }
    }
}

/// Generate a numeric code of `length` uniformly random digits. Leading zeros
/// are kept.
pub fn generate_code(length: usize) -> String {
    let mut rng = thread_rng();

    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// An issued one-time password.
#[derive(Clone, Debug)]
pub struct OtpRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub purpose: OtpPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub last_sent: DateTime<Utc>,
}

impl OtpRecord {
    /// Whether `code` redeems this record at `now`.
    ///
    /// The check does not consume the record; marking it used is up to the
    /// caller.
    pub fn is_valid(&self, code: &str, now: DateTime<Utc>) -> bool {
        !self.is_used && now <= self.expires_at && self.code == code
    }
}

/// A code typed in by a user, before it is checked against anything.
#[derive(Debug)]
pub struct SubmittedCode {
    code: String,
    expected_length: usize,
}

#[derive(Debug, Eq, PartialEq)]
pub enum SubmittedCodeInvalidity {
    /// The code does not have the expected number of characters, which is
    /// contained as a value.
    Length(usize),
    /// The code contains something other than ASCII digits.
    NonNumeric,
}

impl SubmittedCode {
    /// Parse a submitted code. Surrounding whitespace is ignored.
    pub fn parse(
        raw: &str,
        expected_length: usize,
    ) -> Result<Self, semval::context::Context<SubmittedCodeInvalidity>> {
        let into = Self {
            code: raw.trim().to_owned(),
            expected_length,
        };

        into.validate().map(|()| into)
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }
}

impl Validate for SubmittedCode {
    type Invalidity = SubmittedCodeInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.code.chars().count() != self.expected_length,
                SubmittedCodeInvalidity::Length(self.expected_length),
            )
            .invalidate_if(
                !self.code.chars().all(|c| c.is_ascii_digit()),
                SubmittedCodeInvalidity::NonNumeric,
            )
            .into()
    }
}
