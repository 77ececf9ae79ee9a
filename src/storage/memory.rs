//! In-memory account storage for development and testing
//!
//! Records live in a map behind a single `RwLock`, next to unique indexes on
//! email and phone. Every mutation happens under one write-lock acquisition,
//! which makes each trait method an atomic conditional update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::*;
use crate::auth::user::{normalize_email, Account};
use crate::error::{Result, RoomStayError};

#[derive(Default)]
struct AccountTable {
    accounts: HashMap<String, Account>,
    email_index: HashMap<String, String>, // email -> account id
    phone_index: HashMap<String, String>, // phone -> account id
}

/// In-memory account storage
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    table: Arc<RwLock<AccountTable>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `change` to one record under the write lock
    async fn modify<F>(&self, id: &str, change: F) -> Result<Option<Account>>
    where
        F: FnOnce(&mut Account) + Send,
    {
        let mut table = self.table.write().await;
        Ok(table.accounts.get_mut(id).map(|account| {
            change(account);
            account.updated_at = Utc::now();
            account.clone()
        }))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, mut account: Account) -> Result<Account> {
        account.email = normalize_email(&account.email);
        account.phone = account.phone.trim().to_string();

        let mut table = self.table.write().await;

        if table.email_index.contains_key(&account.email) {
            return Err(RoomStayError::DuplicateIdentity(
                "Email is already in use".to_string(),
            ));
        }
        if table.phone_index.contains_key(&account.phone) {
            return Err(RoomStayError::DuplicateIdentity(
                "Phone number is already in use".to_string(),
            ));
        }
        if table.accounts.contains_key(&account.id) {
            return Err(RoomStayError::StorageError(format!(
                "Account id {} already exists",
                account.id
            )));
        }

        table.email_index.insert(account.email.clone(), account.id.clone());
        table.phone_index.insert(account.phone.clone(), account.id.clone());
        table.accounts.insert(account.id.clone(), account.clone());

        log::debug!("Account {} stored", account.id);
        Ok(account)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let table = self.table.read().await;
        Ok(table.accounts.get(id).cloned())
    }

    async fn find_by_identity(&self, email_or_phone: &str) -> Result<Option<Account>> {
        let table = self.table.read().await;
        let key = email_or_phone.trim();

        let id = table
            .email_index
            .get(&normalize_email(key))
            .or_else(|| table.phone_index.get(key));

        Ok(id
            .and_then(|id| table.accounts.get(id))
            .filter(|account| account.is_active)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let table = self.table.read().await;
        Ok(table
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| table.accounts.get(id))
            .cloned())
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let policy = *policy;
        self.modify(id, move |account| {
            if account.lock_expired_at(now) {
                account.lock_until = None;
                account.failed_login_attempts = 1;
                return;
            }

            account.failed_login_attempts = account.failed_login_attempts.saturating_add(1);
            if account.failed_login_attempts >= policy.threshold && !account.is_locked_at(now) {
                account.lock_until = Some(
                    now.checked_add_signed(policy.duration)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                );
            }
        })
        .await
    }

    async fn record_success(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let mut table = self.table.write().await;
        Ok(table.accounts.get_mut(id).map(|account| {
            // A lock set by a concurrent failure since the caller's read wins
            if !account.is_locked_at(now) {
                account.failed_login_attempts = 0;
                account.lock_until = None;
                account.last_login = Some(now);
                account.updated_at = Utc::now();
            }
            account.clone()
        }))
    }

    async fn set_password(&self, id: &str, password_hash: String) -> Result<Option<Account>> {
        if password_hash.is_empty() {
            return Err(RoomStayError::StorageError(
                "Refusing to store an empty password hash".to_string(),
            ));
        }
        self.modify(id, move |account| account.password_hash = password_hash)
            .await
    }

    async fn set_reset_token(
        &self,
        id: &str,
        token_digest: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        self.modify(id, move |account| {
            account.password_reset_token = Some(token_digest);
            account.password_reset_expires = Some(expires_at);
        })
        .await
    }

    async fn clear_reset_token(&self, id: &str) -> Result<Option<Account>> {
        self.modify(id, |account| {
            account.password_reset_token = None;
            account.password_reset_expires = None;
        })
        .await
    }

    async fn clear_lockout(&self, id: &str) -> Result<Option<Account>> {
        self.modify(id, |account| {
            account.failed_login_attempts = 0;
            account.lock_until = None;
        })
        .await
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Option<Account>> {
        self.modify(id, move |account| {
            if let Some(full_name) = update.full_name {
                account.full_name = full_name;
            }
            if let Some(date_of_birth) = update.date_of_birth {
                account.date_of_birth = Some(date_of_birth);
            }
            if let Some(gender) = update.gender {
                account.gender = gender;
            }
            if let Some(mut address) = update.address {
                if let Some(full) = address.compose_full_address() {
                    address.full_address = Some(full);
                }
                account.address = Some(address);
            }
            if let Some(contact) = update.emergency_contact {
                account.emergency_contact = Some(contact);
            }
        })
        .await
    }

    async fn update_preferences(
        &self,
        id: &str,
        update: PreferencesUpdate,
    ) -> Result<Option<Account>> {
        self.modify(id, move |account| {
            let preferences = &mut account.preferences;
            if let Some(budget) = update.budget {
                preferences.budget = Some(budget);
            }
            if let Some(room_type) = update.room_type {
                preferences.room_type = Some(room_type);
            }
            if let Some(location) = update.location {
                preferences.location = location;
            }
            if let Some(amenities) = update.amenities {
                preferences.amenities = amenities;
            }
        })
        .await
    }

    async fn deactivate(&self, id: &str) -> Result<Option<Account>> {
        self.modify(id, |account| account.is_active = false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(email: &str, phone: &str) -> Account {
        Account::new("Tran Thi B".into(), email.into(), phone.into(), "$argon2id$stub".into())
    }

    fn policy() -> LockoutPolicy {
        LockoutPolicy {
            threshold: 5,
            duration: Duration::hours(2),
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_email_and_phone() {
        let store = MemoryAccountStore::new();
        store.insert(account("a@x.com", "0123456789")).await.unwrap();

        let err = store.insert(account("A@X.com ", "0999999999")).await.unwrap_err();
        assert!(matches!(err, RoomStayError::DuplicateIdentity(ref m) if m.contains("Email")));

        let err = store.insert(account("b@x.com", "0123456789")).await.unwrap_err();
        assert!(matches!(err, RoomStayError::DuplicateIdentity(ref m) if m.contains("Phone")));

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_uniqueness_covers_inactive_accounts() {
        let store = MemoryAccountStore::new();
        let stored = store.insert(account("a@x.com", "0123456789")).await.unwrap();
        store.deactivate(&stored.id).await.unwrap();

        let err = store.insert(account("a@x.com", "0111111111")).await.unwrap_err();
        assert!(matches!(err, RoomStayError::DuplicateIdentity(_)));
    }

    #[tokio::test]
    async fn test_find_by_identity_email_or_phone_active_only() {
        let store = MemoryAccountStore::new();
        let stored = store.insert(account("a@x.com", "0123456789")).await.unwrap();

        assert!(store.find_by_identity("A@x.com").await.unwrap().is_some());
        assert!(store.find_by_identity("0123456789").await.unwrap().is_some());
        assert!(store.find_by_identity("nobody@x.com").await.unwrap().is_none());

        store.deactivate(&stored.id).await.unwrap();
        assert!(store.find_by_identity("a@x.com").await.unwrap().is_none());
        assert!(store.find_by_id(&stored.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_attempts_lock_at_threshold() {
        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let now = Utc::now();

        for _ in 0..4 {
            let acc = store.record_failed_attempt(&id, &policy(), now).await.unwrap().unwrap();
            assert!(acc.lock_until.is_none());
        }
        let acc = store.record_failed_attempt(&id, &policy(), now).await.unwrap().unwrap();
        assert_eq!(acc.failed_login_attempts, 5);
        assert_eq!(acc.lock_until, Some(now + Duration::hours(2)));

        // Further failures while locked do not extend the lock
        let later = now + Duration::minutes(30);
        let acc = store.record_failed_attempt(&id, &policy(), later).await.unwrap().unwrap();
        assert_eq!(acc.failed_login_attempts, 6);
        assert_eq!(acc.lock_until, Some(now + Duration::hours(2)));
    }

    #[tokio::test]
    async fn test_failed_attempt_after_expired_lock_restarts_count() {
        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let now = Utc::now();
        for _ in 0..5 {
            store.record_failed_attempt(&id, &policy(), now).await.unwrap();
        }

        let after = now + Duration::hours(2) + Duration::seconds(1);
        let acc = store.record_failed_attempt(&id, &policy(), after).await.unwrap().unwrap();
        assert_eq!(acc.failed_login_attempts, 1);
        assert!(acc.lock_until.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_not_lost() {
        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let wide = LockoutPolicy {
            threshold: 1000,
            duration: Duration::hours(2),
        };
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.record_failed_attempt(&id, &wide, now).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let acc = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(acc.failed_login_attempts, 50);
    }

    #[tokio::test]
    async fn test_record_success_resets_state() {
        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let now = Utc::now();
        store.record_failed_attempt(&id, &policy(), now).await.unwrap();

        let acc = store.record_success(&id, now).await.unwrap().unwrap();
        assert_eq!(acc.failed_login_attempts, 0);
        assert!(acc.lock_until.is_none());
        assert_eq!(acc.last_login, Some(now));
    }

    #[tokio::test]
    async fn test_record_success_keeps_active_lock() {
        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let now = Utc::now();
        for _ in 0..5 {
            store.record_failed_attempt(&id, &policy(), now).await.unwrap();
        }

        let acc = store.record_success(&id, now).await.unwrap().unwrap();
        assert!(acc.is_locked_at(now));
        assert_eq!(acc.failed_login_attempts, 5);
        assert!(acc.last_login.is_none());

        // Once the lock has run out a success clears it
        let later = now + Duration::hours(3);
        let acc = store.record_success(&id, later).await.unwrap().unwrap();
        assert!(acc.lock_until.is_none());
        assert_eq!(acc.last_login, Some(later));
    }

    #[tokio::test]
    async fn test_update_profile_derives_full_address() {
        use crate::auth::user::Address;

        let store = MemoryAccountStore::new();
        let id = store.insert(account("a@x.com", "0123456789")).await.unwrap().id;
        let update = ProfileUpdate {
            full_name: Some("Le Van C".into()),
            address: Some(Address {
                street: Some("1 Tran Hung Dao".into()),
                ward: Some("Ward 2".into()),
                district: Some("District 5".into()),
                city: Some("HCMC".into()),
                full_address: None,
            }),
            ..Default::default()
        };

        let acc = store.update_profile(&id, update).await.unwrap().unwrap();
        assert_eq!(acc.full_name, "Le Van C");
        assert_eq!(
            acc.address.unwrap().full_address.as_deref(),
            Some("1 Tran Hung Dao, Ward 2, District 5, HCMC")
        );
    }

    #[tokio::test]
    async fn test_missing_account_yields_none() {
        let store = MemoryAccountStore::new();
        assert!(store.record_success("missing", Utc::now()).await.unwrap().is_none());
        assert!(store.deactivate("missing").await.unwrap().is_none());
    }
}
