use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::{
        domain::users::User,
        models::users::{NewUserModel, UserModel},
    },
};

#[derive(Debug, Error)]
pub enum UserPersistenceError {
    #[error("duplicate email address: {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynUserRepo = Arc<dyn UserRepo + Send + Sync>;

#[async_trait]
pub trait UserRepo {
    /// Persist a new, unverified user together with its empty profile.
    ///
    /// Both records are created or neither is.
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<User, UserPersistenceError>;

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Look up a user by their case-folded email address.
    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, email_verified, is_active, is_staff, date_joined";

#[async_trait]
impl UserRepo for PostgresConnection {
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<User, UserPersistenceError> {
        let mut tx = self.begin().await.map_err(anyhow::Error::from)?;

        let insert_user = format!(
            r#"
            INSERT INTO "user" (id, email, password_hash, is_staff)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let inserted = sqlx::query_as::<_, UserModel>(&insert_user)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_staff)
            .fetch_one(&mut tx)
            .await;

        let created = match inserted {
            Ok(model) => model,
            Err(sqlx::Error::Database(db_err)) if db_err.code().unwrap_or_default() == "23505" => {
                return Err(UserPersistenceError::DuplicateEmail(user.email.clone()));
            }
            Err(err) => return Err(anyhow::Error::from(err).into()),
        };

        sqlx::query("INSERT INTO profile (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut tx)
            .await
            .map_err(anyhow::Error::from)?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        Ok(created.into())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let query = format!(r#"SELECT {} FROM "user" WHERE id = $1"#, USER_COLUMNS);

        Ok(sqlx::query_as::<_, UserModel>(&query)
            .bind(id)
            .fetch_optional(&**self)
            .await?
            .map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let query = format!(r#"SELECT {} FROM "user" WHERE email = $1"#, USER_COLUMNS);

        Ok(sqlx::query_as::<_, UserModel>(&query)
            .bind(email)
            .fetch_optional(&**self)
            .await?
            .map(User::from))
    }

    async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE "user" SET email_verified = TRUE WHERE id = $1"#)
            .bind(id)
            .execute(&**self)
            .await?;

        Ok(())
    }
}
