use std::convert::TryFrom;

use anyhow::{anyhow, bail};
use semval::ValidatedFrom;
use tracing::info;

use crate::{
    database::PostgresConnection,
    identities::{
        domain::users::{NewUser, NewUserData, User},
        models::users::NewUserModel,
    },
    repos::{UserPersistenceError, UserRepo},
};

pub struct CreateUserOpts {
    pub database_url: String,
    pub email: String,
    pub password: Option<String>,
    pub staff: bool,
}

pub async fn create_user(opts: CreateUserOpts) -> anyhow::Result<()> {
    let db = PostgresConnection::connect(&opts.database_url, 1, 5).await?;

    let user = provision(&db, opts.email, opts.password, opts.staff).await?;
    info!(user_id = %user.id, is_staff = user.is_staff, "Created user.");

    Ok(())
}

/// Create a user and its empty profile. Users created without a password can
/// only sign in once they are given one.
async fn provision(
    user_repo: &(dyn UserRepo + Send + Sync),
    email: String,
    password: Option<String>,
    staff: bool,
) -> anyhow::Result<User> {
    let new_user = NewUser::validated_from(NewUserData {
        email,
        password,
        password_confirmation: None,
    })
    .map_err(|(_, context)| anyhow!("Invalid user: {:?}", context))?;

    let new_user = if staff {
        new_user.into_staff()
    } else {
        new_user
    };

    match user_repo
        .persist_new_user(&NewUserModel::try_from(&new_user)?)
        .await
    {
        Ok(user) => Ok(user),
        Err(UserPersistenceError::DuplicateEmail(email)) => {
            bail!("A user with the email {} already exists.", email)
        }
        Err(UserPersistenceError::Other(error)) => Err(error),
    }
}
