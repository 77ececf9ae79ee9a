//! Abstract storage interface for account persistence
//!
//! The authentication core only talks to the store through this trait. A
//! backend must make every method a single atomic operation on the record:
//! the lockout counter in particular is updated concurrently by parallel
//! failed logins against the same account.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::auth::user::{Account, Address, Budget, EmergencyContact, Gender, RoomType};
use crate::error::Result;

/// Brute-force lockout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failed attempts that trigger a lock
    pub threshold: u32,
    /// Length of a lock
    pub duration: chrono::Duration,
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Partial preferences update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub budget: Option<Budget>,
    pub room_type: Option<RoomType>,
    pub location: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

/// Credential store interface
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Email and phone uniqueness is enforced by the
    /// store itself as part of the insert; a conflict yields
    /// `DuplicateIdentity`.
    async fn insert(&self, account: Account) -> Result<Account>;

    /// Get account by ID, active or not
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;

    /// Get an active account by email or phone
    async fn find_by_identity(&self, email_or_phone: &str) -> Result<Option<Account>>;

    /// Get account by email, active or not
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Count a failed login.
    ///
    /// If a lock had been set and has run out, the counter restarts at 1 and
    /// the lock is cleared. Otherwise the counter is incremented, and if it
    /// reaches the threshold while the account is not locked, the account is
    /// locked until `now + policy.duration`.
    async fn record_failed_attempt(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>>;

    /// Clear the counter and lock, and stamp the last login.
    ///
    /// If the account is locked at `now`, nothing changes and the locked
    /// record is returned; the caller must treat the login as refused.
    async fn record_success(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Account>>;

    /// Overwrite the stored password hash
    async fn set_password(&self, id: &str, password_hash: String) -> Result<Option<Account>>;

    /// Store a reset token digest, replacing any outstanding one
    async fn set_reset_token(
        &self,
        id: &str,
        token_digest: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Account>>;

    async fn clear_reset_token(&self, id: &str) -> Result<Option<Account>>;

    /// Clear the counter and lock without touching the last login
    async fn clear_lockout(&self, id: &str) -> Result<Option<Account>>;

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Option<Account>>;

    async fn update_preferences(
        &self,
        id: &str,
        update: PreferencesUpdate,
    ) -> Result<Option<Account>>;

    /// Soft delete: mark the account inactive
    async fn deactivate(&self, id: &str) -> Result<Option<Account>>;
}
