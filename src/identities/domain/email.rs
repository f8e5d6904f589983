use std::collections::HashSet;

use semval::prelude::*;

/// An email address, case-folded so that lookups and uniqueness checks are
/// insensitive to how the address was typed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email(String);

impl Email {
    /// Create an unvalidated email.
    ///
    /// This can be useful when constructing an object that contains an email
    /// but has not been validated yet. The address is trimmed and lowercased.
    ///
    /// # Arguments
    ///
    /// * `address` - The email's address.
    pub fn unvalidated(address: &str) -> Self {
        Self(address.trim().to_lowercase())
    }

    pub fn address(&self) -> &str {
        &self.0
    }

    /// The part of the address after the last `@`, if there is one.
    pub fn domain(&self) -> Option<&str> {
        self.0
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum EmailInvalidity {
    /// The address does not have a domain portion.
    MissingDomain,

    /// The address is missing the `@` symbol separating the local and domain
    /// parts.
    MissingSeparator,
}

impl Validate for Email {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(!self.0.contains('@'), EmailInvalidity::MissingSeparator)
            .invalidate_if(self.domain().is_none(), EmailInvalidity::MissingDomain)
            .into()
    }
}

impl ValidatedFrom<&str> for Email {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self::unvalidated(from);

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// Which email domains may be used to sign up.
///
/// An empty policy allows every domain.
#[derive(Clone, Debug, Default)]
pub struct EmailDomainPolicy {
    allowed: HashSet<String>,
}

impl EmailDomainPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = domains
            .into_iter()
            .map(|domain| domain.as_ref().trim().to_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        Self { allowed }
    }

    pub fn allows(&self, email: &Email) -> bool {
        if self.allowed.is_empty() {
            return true;
        }

        email
            .domain()
            .map_or(false, |domain| self.allowed.contains(domain))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validated_from_missing_at_symbol() {
        let (_, context) = Email::validated_from("missing-an-at-symbol").expect_err("missing an @");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert_eq!(2, errors.len());
        assert_eq!(EmailInvalidity::MissingSeparator, errors[0]);
    }

    #[test]
    fn validated_from_valid_missing_domain() {
        let (_, context) = Email::validated_from("someone@").expect_err("missing a domain");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert_eq!(1, errors.len());
        assert_eq!(EmailInvalidity::MissingDomain, errors[0]);
    }

    #[test]
    fn validated_from_case_folds_address() {
        let parsed = Email::validated_from("  Alice@Uni.EDU ").expect("Parse failed");

        assert_eq!("alice@uni.edu", parsed.address());
        assert_eq!(Some("uni.edu"), parsed.domain());
    }

    #[test]
    fn empty_policy_allows_everything() {
        let policy = EmailDomainPolicy::default();

        assert!(policy.allows(&Email::unvalidated("someone@anywhere.example")));
    }

    #[test]
    fn policy_only_allows_listed_domains() {
        let policy = EmailDomainPolicy::new(["Uni.edu", " "]);

        assert!(policy.allows(&Email::unvalidated("alice@UNI.edu")));
        assert!(!policy.allows(&Email::unvalidated("bob@gmail.com")));
        assert!(!policy.allows(&Email::unvalidated("bob@sub.uni.edu")));
        assert!(!policy.allows(&Email::unvalidated("no-domain")));
    }
}
