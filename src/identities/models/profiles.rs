use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain::profiles::Profile;

#[derive(Debug, FromRow)]
pub struct ProfileModel {
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

impl From<ProfileModel> for Profile {
    fn from(model: ProfileModel) -> Self {
        Self {
            user_id: model.user_id,
            full_name: model.full_name,
            university: model.university,
            course: model.course,
            year_of_study: model.year_of_study,
            phone: model.phone,
            bio: model.bio,
            skills: model.skills,
            is_completed: model.is_completed,
        }
    }
}
