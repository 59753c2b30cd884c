use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserChanges};

/// Process-local `UserStore` used by `AppState::fake` and tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &new.email, None) {
            return Err(StoreError::Conflict("email"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            avatar: new.avatar,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = changes.email.as_deref() {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = avatar;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::DEFAULT_AVATAR_URL;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "driver".into(),
            email: email.into(),
            password_hash: "hash".into(),
            avatar: DEFAULT_AVATAR_URL.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@example.com")).await.unwrap();
        let err = store.create(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[tokio::test]
    async fn update_keeps_unset_fields_and_rejects_taken_email() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@example.com")).await.unwrap();
        store.create(new_user("b@example.com")).await.unwrap();

        let updated = store
            .update(
                a.id,
                UserChanges {
                    username: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.email, "a@example.com");

        let err = store
            .update(
                a.id,
                UserChanges {
                    email: Some("b@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@example.com")).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(store.find_by_id(a.id).await.unwrap().is_none());
    }
}
