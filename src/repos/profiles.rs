use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::{
        domain::profiles::{CompletedProfile, Profile},
        models::profiles::ProfileModel,
    },
};

pub type DynProfileRepo = Arc<dyn ProfileRepo + Send + Sync>;

#[async_trait]
pub trait ProfileRepo {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;

    /// Store the completed fields and flag the profile as completed.
    ///
    /// A profile is only ever completed once. Returns `false`, leaving the
    /// stored profile untouched, if it was already completed.
    async fn complete_profile(
        &self,
        user_id: Uuid,
        profile: &CompletedProfile,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
impl ProfileRepo for PostgresConnection {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(sqlx::query_as::<_, ProfileModel>(
            r#"
            SELECT user_id, full_name, university, course, year_of_study, phone, bio, skills,
                is_completed
            FROM profile
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&**self)
        .await?
        .map(Profile::from))
    }

    async fn complete_profile(
        &self,
        user_id: Uuid,
        profile: &CompletedProfile,
    ) -> anyhow::Result<bool> {
        // Upsert so that a user whose profile row is missing still gets one.
        let result = sqlx::query(
            r#"
            INSERT INTO profile (
                user_id, full_name, university, course, year_of_study, phone, bio, skills,
                is_completed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            ON CONFLICT (user_id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                university = EXCLUDED.university,
                course = EXCLUDED.course,
                year_of_study = EXCLUDED.year_of_study,
                phone = EXCLUDED.phone,
                bio = EXCLUDED.bio,
                skills = EXCLUDED.skills,
                is_completed = TRUE
            WHERE NOT profile.is_completed
            "#,
        )
        .bind(user_id)
        .bind(&profile.full_name)
        .bind(&profile.university)
        .bind(&profile.course)
        .bind(&profile.year_of_study)
        .bind(&profile.phone)
        .bind(&profile.bio)
        .bind(&profile.skills)
        .execute(&**self)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
