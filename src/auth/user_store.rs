//! User account operations
//! Mission: password hashing and credential verification layered over
//! the durable user repository (spec section 3's User entity).

use crate::durable::users::{UserRepository, UserRole, UserRow};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

pub struct UserStore {
    users: UserRepository,
}

impl UserStore {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.users.get_by_username(username).await
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.users.get_by_id(user_id).await
    }

    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        match self.users.get_by_username(username).await? {
            Some(user) => verify(password, &user.password_hash).context("verify password"),
            None => Ok(false),
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserRow> {
        let password_hash = hash(password, DEFAULT_COST).context("hash password")?;
        self.users
            .create(username, email, &password_hash, UserRole::User)
            .await
    }

    pub async fn list(&self) -> Result<Vec<UserRow>> {
        self.users.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::DurableStore;

    #[tokio::test]
    async fn register_then_verify_password() {
        let durable = DurableStore::open_in_memory().unwrap();
        let store = UserStore::new(durable.users());

        store
            .register("alice", "alice@example.com", "hunter22")
            .await
            .unwrap();

        assert!(store.verify_password("alice", "hunter22").await.unwrap());
        assert!(!store.verify_password("alice", "wrong").await.unwrap());
        assert!(!store.verify_password("nobody", "x").await.unwrap());
    }
}
