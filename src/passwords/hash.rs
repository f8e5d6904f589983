use std::str::FromStr;

use anyhow::{bail, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use rand_core::OsRng;

use super::Password;

/// An Argon2 hash of a user's password, in PHC string format.
#[derive(Clone, Debug)]
pub struct Hash(String);

impl Hash {
    /// Hash a password with a freshly generated salt.
    pub fn new(password: &Password) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);

        let phc = Argon2::default()
            .hash_password(password.as_bytes(), salt.as_ref())?
            .to_string();

        Ok(Self(phc))
    }

    /// Check a raw password against the hash.
    ///
    /// A mismatch is `Ok(false)`. Errors are reserved for hashes that cannot
    /// be used at all.
    pub fn verify(&self, raw_password: &str) -> Result<bool> {
        let parsed = PasswordHash::new(&self.0)?;

        match Argon2::default().verify_password(raw_password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const ARGON2_IDENTS: [&str; 3] = ["argon2d", "argon2i", "argon2id"];

impl FromStr for Hash {
    type Err = anyhow::Error;

    /// Parse a persisted PHC string. Only complete Argon2 hashes are accepted.
    fn from_str(phc: &str) -> Result<Self> {
        let parsed = PasswordHash::new(phc)?;

        if !ARGON2_IDENTS.contains(&parsed.algorithm.as_str()) {
            bail!("unsupported password hash algorithm {}", parsed.algorithm);
        }
        if parsed.hash.is_none() {
            bail!("password hash has no hash output");
        }

        Ok(Self(phc.to_owned()))
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn hash_of(raw_password: &str) -> Hash {
        Hash::new(&Password::unvalidated(raw_password.to_owned())).expect("password should hash")
    }

    #[test]
    fn verifies_own_password_only() -> Result<()> {
        let hash = hash_of("hunter22");

        assert!(hash.verify("hunter22")?);
        assert!(!hash.verify("hunter23")?);

        Ok(())
    }

    #[test]
    fn persisted_form_parses_back() -> Result<()> {
        let stored = String::from(hash_of("hunter22"));

        let parsed: Hash = stored.parse()?;

        assert!(parsed.verify("hunter22")?);

        Ok(())
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_of("hunter22").as_str(), hash_of("hunter22").as_str());
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!("definitely not a hash".parse::<Hash>().is_err());
    }

    #[test]
    fn bare_algorithm_does_not_parse() {
        assert!("$argon2id".parse::<Hash>().is_err());
        assert!("$nope".parse::<Hash>().is_err());
    }

    #[test]
    fn other_algorithms_do_not_parse() {
        let scrypt = "$scrypt$ln=16,r=8,p=1$aM15713r3Xsvxbi31lqr1Q$nFNh2CVHVjNldFVKDHDlm4CbdRSCdEBsjjJxD+iCs5E";

        assert!(scrypt.parse::<Hash>().is_err());
    }
}
