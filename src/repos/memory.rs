use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::identities::{
    domain::{
        otp::{OtpPurpose, OtpRecord},
        profiles::{CompletedProfile, Profile},
        users::User,
    },
    models::{otp::NewOtpModel, users::NewUserModel},
};

use super::{OtpRepo, ProfileRepo, UserPersistenceError, UserRepo};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    otps: Vec<OtpRecord>,
    profiles: HashMap<Uuid, Profile>,
}

/// An in-process store with the same guarantees as the Postgres repositories.
///
/// Every operation runs under a single lock, which makes multi-record writes
/// atomic. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock was poisoned"))
    }

    /// Every one-time password issued to a user, oldest first.
    pub fn otps_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<OtpRecord>> {
        Ok(self
            .lock()?
            .otps
            .iter()
            .filter(|otp| otp.user_id == user_id)
            .cloned()
            .collect())
    }

    /// Activate or deactivate a user.
    pub fn set_active(&self, user_id: Uuid, is_active: bool) -> anyhow::Result<()> {
        match self.lock()?.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(())
            }
            None => bail!("no user with id {}", user_id),
        }
    }

    pub fn user_count(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.users.len())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn persist_new_user(&self, user: &NewUserModel) -> Result<User, UserPersistenceError> {
        let mut tables = self.lock()?;

        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(UserPersistenceError::DuplicateEmail(user.email.clone()));
        }

        let created = User {
            id: user.id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            email_verified: false,
            is_active: true,
            is_staff: user.is_staff,
            date_joined: Utc::now(),
        };

        tables.users.insert(created.id, created.clone());
        tables
            .profiles
            .insert(created.id, Profile::empty_for(created.id));

        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.email_verified = true;
        }

        Ok(())
    }
}

#[async_trait]
impl OtpRepo for MemoryStore {
    async fn issue_otp(&self, otp: &NewOtpModel) -> anyhow::Result<OtpRecord> {
        let mut tables = self.lock()?;

        if !tables.users.contains_key(&otp.user_id) {
            bail!("cannot issue a one-time password for unknown user {}", otp.user_id);
        }

        let now = Utc::now();
        let same_slot = |existing: &OtpRecord| {
            existing.user_id == otp.user_id && existing.purpose == otp.purpose
        };

        // Records that can never verify again are dropped.
        tables.otps.retain(|existing| {
            let spent = existing.is_used || existing.expires_at < now;

            !(same_slot(existing) && spent)
        });

        for existing in tables.otps.iter_mut() {
            if same_slot(existing) {
                existing.is_used = true;
            }
        }

        let issued = OtpRecord {
            id: otp.id,
            user_id: otp.user_id,
            code: otp.code.clone(),
            purpose: otp.purpose,
            created_at: now,
            expires_at: otp.expires_at,
            is_used: false,
            last_sent: now,
        };
        tables.otps.push(issued.clone());

        Ok(issued)
    }

    async fn get_otp(&self, id: Uuid) -> anyhow::Result<Option<OtpRecord>> {
        Ok(self.lock()?.otps.iter().find(|otp| otp.id == id).cloned())
    }

    async fn latest_unused_otp(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<OtpRecord>> {
        Ok(self
            .lock()?
            .otps
            .iter()
            .rev()
            .find(|otp| otp.user_id == user_id && otp.purpose == purpose && !otp.is_used)
            .cloned())
    }

    async fn mark_otp_used(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;

        match tables.otps.iter_mut().find(|otp| otp.id == id) {
            Some(otp) if !otp.is_used => {
                otp.is_used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }

    async fn complete_profile(
        &self,
        user_id: Uuid,
        profile: &CompletedProfile,
    ) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;
        let stored = tables
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::empty_for(user_id));

        if stored.is_completed {
            return Ok(false);
        }

        *stored = Profile {
            user_id,
            full_name: profile.full_name.clone(),
            university: profile.university.clone(),
            course: profile.course.clone(),
            year_of_study: profile.year_of_study.clone(),
            phone: profile.phone.clone(),
            bio: profile.bio.clone(),
            skills: profile.skills.clone(),
            is_completed: true,
        };

        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_user(email: &str) -> NewUserModel {
        NewUserModel {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: None,
            is_staff: false,
        }
    }

    fn completed() -> CompletedProfile {
        CompletedProfile {
            full_name: "Alice".to_owned(),
            university: "Uni".to_owned(),
            course: "CS".to_owned(),
            year_of_study: "Year 1".to_owned(),
            phone: String::new(),
            bio: String::new(),
            skills: String::new(),
        }
    }

    #[tokio::test]
    async fn new_user_gets_empty_profile() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.persist_new_user(&new_user("alice@uni.edu")).await?;

        let profile = store.get_profile(user.id).await?.expect("profile created");

        assert!(!user.email_verified);
        assert_eq!(Profile::empty_for(user.id), profile);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.persist_new_user(&new_user("alice@uni.edu")).await?;

        let result = store.persist_new_user(&new_user("alice@uni.edu")).await;

        assert!(matches!(
            result,
            Err(UserPersistenceError::DuplicateEmail(email)) if email == "alice@uni.edu"
        ));
        assert_eq!(1, store.user_count()?);

        Ok(())
    }

    #[tokio::test]
    async fn profile_completes_only_once() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.persist_new_user(&new_user("alice@uni.edu")).await?;

        assert!(store.complete_profile(user.id, &completed()).await?);

        let second = CompletedProfile {
            full_name: "Mallory".to_owned(),
            ..completed()
        };
        assert!(!store.complete_profile(user.id, &second).await?);

        let stored = store.get_profile(user.id).await?.expect("profile exists");
        assert!(stored.is_completed);
        assert_eq!("Alice", stored.full_name);

        Ok(())
    }

    #[tokio::test]
    async fn otp_can_only_be_marked_used_once() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.persist_new_user(&new_user("alice@uni.edu")).await?;
        let otp = store
            .issue_otp(&NewOtpModel {
                id: Uuid::new_v4(),
                user_id: user.id,
                code: "123456".to_owned(),
                purpose: OtpPurpose::Signup,
                expires_at: Utc::now(),
            })
            .await?;

        assert!(store.mark_otp_used(otp.id).await?);
        assert!(!store.mark_otp_used(otp.id).await?);
        assert!(store
            .latest_unused_otp(user.id, OtpPurpose::Signup)
            .await?
            .is_none());

        Ok(())
    }

    #[tokio::test]
    async fn spent_codes_are_dropped_on_issue() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.persist_new_user(&new_user("alice@uni.edu")).await?;
        let issue = |purpose| NewOtpModel {
            id: Uuid::new_v4(),
            user_id: user.id,
            code: "123456".to_owned(),
            purpose,
            expires_at: Utc::now() + chrono::Duration::minutes(10),
        };

        let first = store.issue_otp(&issue(OtpPurpose::Signup)).await?;
        let login = store.issue_otp(&issue(OtpPurpose::Login)).await?;
        store.mark_otp_used(login.id).await?;
        let second = store.issue_otp(&issue(OtpPurpose::Signup)).await?;
        let third = store.issue_otp(&issue(OtpPurpose::Signup)).await?;

        let remaining = store
            .otps_for_user(user.id)?
            .into_iter()
            .map(|otp| otp.id)
            .collect::<Vec<_>>();

        assert_eq!(vec![login.id, second.id, third.id], remaining);
        assert!(store.get_otp(first.id).await?.is_none());

        Ok(())
    }

    #[test]
    fn deactivating_unknown_user_fails() {
        assert!(MemoryStore::new().set_active(Uuid::new_v4(), false).is_err());
    }
}
