use semval::prelude::*;
use uuid::Uuid;

/// A user's profile. Created empty alongside the user and completed once.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Profile {
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

impl Profile {
    /// A profile with every field blank.
    pub fn empty_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileField {
    FullName,
    University,
    Course,
    YearOfStudy,
    Phone,
    Bio,
    Skills,
}

#[derive(Debug, Eq, PartialEq)]
pub enum ProfileInvalidity {
    /// A required field was left blank.
    Required(ProfileField),
    /// A field exceeds its maximum length, which is contained as a value.
    TooLong(ProfileField, usize),
}

/// Raw profile fields as submitted by the user.
#[derive(Clone, Debug, Default)]
pub struct ProfileData {
    pub full_name: String,
    pub university: String,
    pub course: String,
    pub year_of_study: String,
    pub phone: String,
    pub bio: String,
    pub skills: String,
}

/// Profile fields that satisfy the requirements for completing a profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletedProfile {
    pub full_name: String,
    pub university: String,
    pub course: String,
    pub year_of_study: String,
    pub phone: String,
    pub bio: String,
    pub skills: String,
}

const NAME_MAX_LENGTH: usize = 120;
const YEAR_OF_STUDY_MAX_LENGTH: usize = 50;
const PHONE_MAX_LENGTH: usize = 30;
const BIO_MAX_LENGTH: usize = 2000;
const SKILLS_MAX_LENGTH: usize = 255;

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

/// Collapse a comma-separated skill list into `a, b, c` form.
fn normalize_skills(skills: &str) -> String {
    skills
        .split(',')
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Validate for CompletedProfile {
    type Invalidity = ProfileInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let required = [
            (ProfileField::FullName, &self.full_name, NAME_MAX_LENGTH),
            (ProfileField::University, &self.university, NAME_MAX_LENGTH),
            (ProfileField::Course, &self.course, NAME_MAX_LENGTH),
            (
                ProfileField::YearOfStudy,
                &self.year_of_study,
                YEAR_OF_STUDY_MAX_LENGTH,
            ),
        ];
        let optional = [
            (ProfileField::Phone, &self.phone, PHONE_MAX_LENGTH),
            (ProfileField::Bio, &self.bio, BIO_MAX_LENGTH),
            (ProfileField::Skills, &self.skills, SKILLS_MAX_LENGTH),
        ];

        let mut context = ValidationContext::new();

        for (field, value, max) in required {
            context = context
                .invalidate_if(value.is_empty(), ProfileInvalidity::Required(field))
                .invalidate_if(too_long(value, max), ProfileInvalidity::TooLong(field, max));
        }

        for (field, value, max) in optional {
            context =
                context.invalidate_if(too_long(value, max), ProfileInvalidity::TooLong(field, max));
        }

        context.into()
    }
}

impl ValidatedFrom<ProfileData> for CompletedProfile {
    fn validated_from(from: ProfileData) -> ValidatedResult<Self> {
        let into = Self {
            full_name: from.full_name.trim().to_owned(),
            university: from.university.trim().to_owned(),
            course: from.course.trim().to_owned(),
            year_of_study: from.year_of_study.trim().to_owned(),
            phone: from.phone.trim().to_owned(),
            bio: from.bio.trim().to_owned(),
            skills: normalize_skills(&from.skills),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
