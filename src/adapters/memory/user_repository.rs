//! In-memory user store.
//!
//! Backs tests and local runs without a database. Writes are counted so
//! tests can assert that a repeated notification caused no extra update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entitlement::{EntitlementRecord, PlanUpdate, UserAccount};
use crate::domain::foundation::{DomainError, ErrorCode, ExternalId, UserId};
use crate::ports::UserRepository;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, UserAccount>>,
    writes: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a free user.
    pub async fn insert_free(&self, user_id: &UserId, email: impl Into<String>) {
        self.insert(UserAccount {
            email: email.into(),
            entitlement: EntitlementRecord::free(user_id.clone()),
        })
        .await;
    }

    pub async fn insert(&self, account: UserAccount) {
        self.users
            .write()
            .await
            .insert(account.id().clone(), account);
    }

    pub async fn record(&self, user_id: &UserId) -> Option<EntitlementRecord> {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|account| account.entitlement.clone())
    }

    /// Number of `update_user_plan` calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_user_id_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<UserId>, DomainError> {
        let users = self.users.read().await;
        let mut owners: Vec<&UserId> = users
            .values()
            .filter(|account| account.entitlement.external_id.as_ref() == Some(external_id))
            .map(UserAccount::id)
            .collect();
        // HashMap order is unstable; pick deterministically.
        owners.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(owners.first().map(|id| (*id).clone()))
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn update_user_plan(
        &self,
        user_id: &UserId,
        update: &PlanUpdate,
    ) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        let account = users.get_mut(user_id).ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", user_id.as_str())
        })?;
        account.entitlement = account.entitlement.with_update(update);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
