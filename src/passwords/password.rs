use std::fmt;

use semval::prelude::*;

const MAX_PASSWORD_LENGTH: usize = 512;
const MIN_PASSWORD_LENGTH: usize = 8;

/// A password as entered by a user, optionally along with the second copy
/// they typed to confirm it.
pub struct Password {
    value: String,
    confirmation: Option<String>,
}

impl Password {
    /// Construct an unvalidated password.
    ///
    /// This can be useful when constructing an object that contains a password
    /// so that the object can be validated as a whole.
    pub fn unvalidated(password: String) -> Self {
        Self {
            value: password,
            confirmation: None,
        }
    }

    /// Attach the confirmation copy. Validation then requires both copies to
    /// be identical.
    pub fn confirmed_by(self, confirmation: String) -> Self {
        Self {
            confirmation: Some(confirmation),
            ..self
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PasswordInvalidity {
    /// Longer than the allowed maximum, which is contained as a value.
    MaxLength(usize),
    /// Shorter than the required minimum, which is contained as a value.
    MinLength(usize),
    /// The confirmation copy differs from the password.
    Mismatch,
}

impl Validate for Password {
    type Invalidity = PasswordInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let length = self.value.chars().count();
        let mismatched = self
            .confirmation
            .as_ref()
            .map_or(false, |confirmation| *confirmation != self.value);

        ValidationContext::new()
            .invalidate_if(
                length < MIN_PASSWORD_LENGTH,
                PasswordInvalidity::MinLength(MIN_PASSWORD_LENGTH),
            )
            .invalidate_if(
                length > MAX_PASSWORD_LENGTH,
                PasswordInvalidity::MaxLength(MAX_PASSWORD_LENGTH),
            )
            .invalidate_if(mismatched, PasswordInvalidity::Mismatch)
            .into()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("value", &"********")
            .field("confirmed", &self.confirmation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn invalidities(password: &Password) -> Vec<PasswordInvalidity> {
        password
            .validate()
            .err()
            .map(|context| context.into_iter().collect())
            .unwrap_or_default()
    }

    #[test]
    fn debug_hides_both_copies() {
        let password = Password::unvalidated("some-very-unique-string".to_owned())
            .confirmed_by("another-unique-string".to_owned());

        let debug_output = format!("{:?}", password);

        assert!(!debug_output.contains("some-very-unique-string"));
        assert!(!debug_output.contains("another-unique-string"));
    }

    #[test]
    fn length_is_counted_in_characters() {
        // Eight characters, but more than eight bytes.
        let password = Password::unvalidated("pässwörd".to_owned());

        assert!(invalidities(&password).is_empty());
    }

    #[test]
    fn length_bounds() {
        assert_eq!(
            vec![PasswordInvalidity::MinLength(8)],
            invalidities(&Password::unvalidated("a".repeat(7)))
        );
        assert_eq!(
            vec![PasswordInvalidity::MaxLength(512)],
            invalidities(&Password::unvalidated("a".repeat(513)))
        );
    }

    #[test]
    fn confirmation_must_be_identical() {
        let matching =
            Password::unvalidated("CorrectHorse".to_owned()).confirmed_by("CorrectHorse".to_owned());
        let differing =
            Password::unvalidated("CorrectHorse".to_owned()).confirmed_by("correcthorse".to_owned());

        assert!(invalidities(&matching).is_empty());
        assert_eq!(vec![PasswordInvalidity::Mismatch], invalidities(&differing));
    }
}
