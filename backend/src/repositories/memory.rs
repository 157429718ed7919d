//! In-memory user directory
//!
//! Same contract as the Postgres repository, kept in a process-local map.
//! Backs the router tests and local runs that do not need durable users.

use async_trait::async_trait;
use chrono::Utc;
use innotaxi_shared::{AccountId, UserStatus};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{
    NewUser, RepositoryError, RepositoryResult, UpdateProfile, UserCredentials, UserDirectory,
    UserRecord, DEFAULT_RATING,
};
use crate::auth::Credential;

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    credential: Credential,
}

impl StoredUser {
    fn is_live(&self) -> bool {
        self.record.status != UserStatus::Deleted
    }
}

#[derive(Default)]
struct Inner {
    next_id: AccountId,
    users: BTreeMap<AccountId, StoredUser>,
}

impl Inner {
    fn contact_taken(&self, phone_number: Option<&str>, email: Option<&str>, except: Option<AccountId>) -> bool {
        self.users.values().filter(|u| u.is_live()).any(|u| {
            Some(u.record.id) != except
                && (phone_number == Some(u.record.phone_number.as_str())
                    || email == Some(u.record.email.as_str()))
        })
    }

    fn live_mut(&mut self, id: AccountId) -> Option<&mut StoredUser> {
        self.users.get_mut(&id).filter(|u| u.is_live())
    }
}

/// Volatile user directory
#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: RwLock<Inner>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create_user(&self, user: NewUser) -> RepositoryResult<AccountId> {
        let mut inner = self.inner.write().await;
        if inner.contact_taken(Some(&user.phone_number), Some(&user.email), None) {
            return Err(RepositoryError::UserAlreadyExists);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.users.insert(
            id,
            StoredUser {
                record: UserRecord {
                    id,
                    name: user.name,
                    phone_number: user.phone_number,
                    email: user.email,
                    rating: DEFAULT_RATING,
                    status: UserStatus::Created,
                    created_at: Utc::now(),
                },
                credential: user.credential,
            },
        );

        Ok(id)
    }

    async fn find_active_by_phone(&self, phone_number: &str) -> RepositoryResult<Option<UserCredentials>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.is_live() && u.record.phone_number == phone_number)
            .map(|u| UserCredentials {
                id: u.record.id,
                credential: u.credential.clone(),
            }))
    }

    async fn find_profile(&self, id: AccountId) -> RepositoryResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&id)
            .filter(|u| u.is_live())
            .map(|u| u.record.clone()))
    }

    async fn update_profile(&self, id: AccountId, update: UpdateProfile) -> RepositoryResult<Option<UserRecord>> {
        let mut inner = self.inner.write().await;
        if inner.contact_taken(update.phone_number.as_deref(), update.email.as_deref(), Some(id)) {
            return Err(RepositoryError::UserAlreadyExists);
        }

        let Some(user) = inner.live_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.record.name = name;
        }
        if let Some(phone_number) = update.phone_number {
            user.record.phone_number = phone_number;
        }
        if let Some(email) = update.email {
            user.record.email = email;
        }

        Ok(Some(user.record.clone()))
    }

    async fn delete_user(&self, id: AccountId) -> RepositoryResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.live_mut(id) {
            Some(user) => {
                user.record.status = UserStatus::Deleted;
                true
            }
            None => false,
        })
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn new_user(phone_number: &str, email: &str) -> NewUser {
        NewUser {
            name: Name().fake(),
            phone_number: phone_number.to_string(),
            email: email.to_string(),
            credential: Credential::from_bytes(vec![1, 2, 3]),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_phone() {
        let directory = MemoryUserDirectory::new();
        let id = directory.create_user(new_user("+7455456", "e@x.com")).await.unwrap();

        let found = directory.find_active_by_phone("+7455456").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.credential.as_bytes(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_phone_or_email_is_rejected() {
        let directory = MemoryUserDirectory::new();
        directory.create_user(new_user("+7455456", "e@x.com")).await.unwrap();

        let same_phone = directory.create_user(new_user("+7455456", &SafeEmail().fake::<String>())).await;
        let same_email = directory.create_user(new_user("+1000000", "e@x.com")).await;

        assert!(matches!(same_phone, Err(RepositoryError::UserAlreadyExists)));
        assert!(matches!(same_email, Err(RepositoryError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_deleted_user_frees_contacts() {
        let directory = MemoryUserDirectory::new();
        let id = directory.create_user(new_user("+7455456", "e@x.com")).await.unwrap();

        assert!(directory.delete_user(id).await.unwrap());
        assert!(!directory.delete_user(id).await.unwrap());
        assert!(directory.find_active_by_phone("+7455456").await.unwrap().is_none());
        assert!(directory.find_profile(id).await.unwrap().is_none());

        let again = directory.create_user(new_user("+7455456", "e@x.com")).await.unwrap();
        assert_ne!(again, id);
    }

    #[tokio::test]
    async fn test_update_profile_is_partial() {
        let directory = MemoryUserDirectory::new();
        let id = directory.create_user(new_user("+7455456", "e@x.com")).await.unwrap();

        let updated = directory
            .update_profile(
                id,
                UpdateProfile {
                    name: Some("Petr".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Petr");
        assert_eq!(updated.phone_number, "+7455456");
        assert_eq!(updated.email, "e@x.com");
        assert_eq!(updated.rating, DEFAULT_RATING);
    }

    #[tokio::test]
    async fn test_update_cannot_take_another_users_phone() {
        let directory = MemoryUserDirectory::new();
        directory.create_user(new_user("+111", "a@x.com")).await.unwrap();
        let id = directory.create_user(new_user("+222", "b@x.com")).await.unwrap();

        let result = directory
            .update_profile(
                id,
                UpdateProfile {
                    phone_number: Some("+111".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(RepositoryError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_update_missing_user_returns_none() {
        let directory = MemoryUserDirectory::new();
        let result = directory.update_profile(42, UpdateProfile::default()).await.unwrap();
        assert!(result.is_none());
    }
}
