use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{
    http_err::{ApiError, InternalServerError, NextStepRep},
    identities::{
        domain::{
            email::EmailInvalidity,
            otp::SubmittedCodeInvalidity,
            profiles::{Profile, ProfileData, ProfileField, ProfileInvalidity},
            users::{NewUserData, NewUserInvalidity},
            verification::Landing,
        },
        services::{AccountError, ProfileError},
    },
    passwords::PasswordInvalidity,
    paths,
};

#[derive(Deserialize)]
pub struct SignupRequest {
    email: String,
    password: String,
    password_confirmation: Option<String>,
}

impl From<SignupRequest> for NewUserData {
    fn from(rep: SignupRequest) -> Self {
        Self {
            email: rep.email,
            password: Some(rep.password),
            password_confirmation: rep.password_confirmation,
        }
    }
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct PendingVerificationRep {
    pub email: String,
}

#[derive(Default, Serialize)]
pub struct NewUserValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    email: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    password: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    password_confirmation: Vec<String>,
}

impl NewUserValidationError {
    fn email(message: impl Into<String>) -> Self {
        Self {
            email: vec![message.into()],
            ..Default::default()
        }
    }
}

impl From<ValidationContext<NewUserInvalidity>> for NewUserValidationError {
    fn from(validation: ValidationContext<NewUserInvalidity>) -> Self {
        let mut response = NewUserValidationError::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                NewUserInvalidity::Email(email_invalidity) => match email_invalidity {
                    EmailInvalidity::MissingDomain => {
                        response.email.push("Email is missing a domain.".to_owned())
                    }
                    EmailInvalidity::MissingSeparator => response
                        .email
                        .push("Email is missing an '@' symbol.".to_owned()),
                },
                NewUserInvalidity::Password(password_invalidity) => match password_invalidity {
                    PasswordInvalidity::MaxLength(max) => response.password.push(format!(
                        "Passwords may not contain more than {} characters.",
                        max
                    )),
                    PasswordInvalidity::MinLength(min) => response.password.push(format!(
                        "Passwords must contain at least {} characters.",
                        min
                    )),
                    PasswordInvalidity::Mismatch => response
                        .password_confirmation
                        .push("Passwords do not match.".to_owned()),
                },
            }
        }

        response
    }
}

#[derive(Default, Serialize)]
pub struct CodeValidationError {
    code: Vec<String>,
}

impl From<ValidationContext<SubmittedCodeInvalidity>> for CodeValidationError {
    fn from(validation: ValidationContext<SubmittedCodeInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                SubmittedCodeInvalidity::Length(length) => response
                    .code
                    .push(format!("Codes must be exactly {} digits.", length)),
                SubmittedCodeInvalidity::NonNumeric => response
                    .code
                    .push("Codes may only contain digits.".to_owned()),
            }
        }

        response
    }
}

impl From<Landing> for NextStepRep {
    fn from(landing: Landing) -> Self {
        match landing {
            Landing::ProfileSetup => Self::new("Please complete your profile.", paths::PROFILE_SETUP),
            Landing::Home => Self::new("You are logged in.", paths::HOME),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::DomainNotAllowed(_) => ApiError::bad_request(NewUserValidationError::email(
                "Signups are restricted to approved email domains.",
            )),
            AccountError::InvalidUser(context) => {
                ApiError::bad_request(NewUserValidationError::from(context))
            }
            AccountError::DuplicateEmail(_) => ApiError::bad_request(NewUserValidationError::email(
                "An account with this email already exists.",
            )),
            AccountError::InvalidCredentials => {
                ApiError::BadRequestReason("Invalid email or password.".to_owned())
            }
            AccountError::MalformedCode(context) => {
                ApiError::bad_request(CodeValidationError::from(context))
            }
            AccountError::InvalidOrExpiredCode => ApiError::bad_request(CodeValidationError {
                code: vec!["Invalid or expired code.".to_owned()],
            }),
            AccountError::SessionExpired => {
                ApiError::login_required("Your verification session has expired. Please log in again.")
            }
            AccountError::NothingToResend => {
                ApiError::login_required("There is no verification to resend. Please log in again.")
            }
            AccountError::ProviderUnavailable(_) => ApiError::ServiceUnavailable(
                "We could not send or check your code right now. Please try again.".to_owned(),
            ),
            AccountError::RateLimited(result) => result.into(),
            AccountError::Other(error) => error.into(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ProfileSetupRequest {
    full_name: String,
    university: String,
    course: String,
    year_of_study: String,
    phone: String,
    bio: String,
    skills: String,
}

impl From<ProfileSetupRequest> for ProfileData {
    fn from(rep: ProfileSetupRequest) -> Self {
        Self {
            full_name: rep.full_name,
            university: rep.university,
            course: rep.course,
            year_of_study: rep.year_of_study,
            phone: rep.phone,
            bio: rep.bio,
            skills: rep.skills,
        }
    }
}

#[derive(Serialize)]
pub struct ProfileRep {
    pub user_id: Uuid,
    pub full_name: String,
    pub university: String,
    pub course: String,
    pub year_of_study: String,
    pub phone: String,
    pub bio: String,
    pub skills: String,
    pub is_completed: bool,
}

impl From<Profile> for ProfileRep {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            full_name: profile.full_name,
            university: profile.university,
            course: profile.course,
            year_of_study: profile.year_of_study,
            phone: profile.phone,
            bio: profile.bio,
            skills: profile.skills,
            is_completed: profile.is_completed,
        }
    }
}

#[derive(Default, Serialize)]
pub struct ProfileValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    full_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    university: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    course: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    year_of_study: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    phone: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bio: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skills: Vec<String>,
}

impl ProfileValidationError {
    fn field_mut(&mut self, field: ProfileField) -> &mut Vec<String> {
        match field {
            ProfileField::FullName => &mut self.full_name,
            ProfileField::University => &mut self.university,
            ProfileField::Course => &mut self.course,
            ProfileField::YearOfStudy => &mut self.year_of_study,
            ProfileField::Phone => &mut self.phone,
            ProfileField::Bio => &mut self.bio,
            ProfileField::Skills => &mut self.skills,
        }
    }
}

impl From<ValidationContext<ProfileInvalidity>> for ProfileValidationError {
    fn from(validation: ValidationContext<ProfileInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                ProfileInvalidity::Required(field) => response
                    .field_mut(field)
                    .push("This field is required.".to_owned()),
                ProfileInvalidity::TooLong(field, max) => response
                    .field_mut(field)
                    .push(format!("May not contain more than {} characters.", max)),
            }
        }

        response
    }
}

impl From<ProfileError> for ApiError {
    fn from(error: ProfileError) -> Self {
        match error {
            ProfileError::Invalid(context) => {
                ApiError::bad_request(ProfileValidationError::from(context))
            }
            ProfileError::Other(error) => {
                error!(?error, "Failed to complete profile.");

                InternalServerError::default().into()
            }
        }
    }
}
