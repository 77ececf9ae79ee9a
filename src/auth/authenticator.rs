//! Credential verification and account credential lifecycle
//!
//! The authenticator is the only place plaintext passwords are handled.
//! They are hashed or compared and then dropped; nothing downstream of it
//! ever sees one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::auth::password::CredentialHasher;
use crate::auth::user::{Account, AccountProfile, Address, Gender};
use crate::config::ServerConfig;
use crate::constants::RESET_TOKEN_BYTES;
use crate::error::{Result, RoomStayError};
use crate::security::constant_time_eq;
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::{AccountStore, LockoutPolicy};

/// Data for a new account. `password` is plaintext and is hashed before
/// anything is stored.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
}

/// An issued password reset token. `token` is the only copy of the raw
/// value; the store keeps its digest.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub account_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct Authenticator {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    lockout: LockoutPolicy,
    reset_token_ttl: chrono::Duration,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: CredentialHasher,
        lockout: LockoutPolicy,
        reset_token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            lockout,
            reset_token_ttl,
        }
    }

    pub fn from_config(store: Arc<dyn AccountStore>, config: &ServerConfig) -> Result<Self> {
        let hasher = CredentialHasher::new(config.argon2_memory_kib, config.argon2_iterations)?;
        let lockout = LockoutPolicy {
            threshold: config.lockout_threshold,
            duration: config.lockout_duration_chrono(),
        };
        Ok(Self::new(store, hasher, lockout, config.reset_token_ttl_chrono()))
    }

    /// Verify an email-or-phone and password pair
    pub async fn authenticate(&self, identity_key: &str, password: &str) -> Result<Account> {
        self.authenticate_at(identity_key, password, Utc::now()).await
    }

    /// Same as [`Authenticator::authenticate`], evaluated at `now`
    pub async fn authenticate_at(
        &self,
        identity_key: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account> {
        let account = match self.store.find_by_identity(identity_key).await? {
            Some(account) => account,
            None => {
                log_security_event(SecurityEvent::AuthenticationFailed {
                    identity: masked_identity(identity_key),
                    reason: "unknown or inactive account".to_string(),
                })
                .await;
                return Err(RoomStayError::InvalidCredentials);
            }
        };

        if account.is_locked_at(now) {
            log_security_event(SecurityEvent::AuthenticationFailed {
                identity: account.id.clone(),
                reason: "account locked".to_string(),
            })
            .await;
            return Err(RoomStayError::AccountLocked);
        }

        let matches = self
            .hasher
            .verify_async(password.to_string(), account.password_hash.clone())
            .await?;

        if !matches {
            let updated = self
                .store
                .record_failed_attempt(&account.id, &self.lockout, now)
                .await?;

            if updated.as_ref().map_or(false, |a| a.is_locked_at(now)) {
                log_security_event(SecurityEvent::AccountLocked {
                    account_id: account.id.clone(),
                })
                .await;
            }
            log_security_event(SecurityEvent::AuthenticationFailed {
                identity: account.id.clone(),
                reason: "wrong password".to_string(),
            })
            .await;
            return Err(RoomStayError::InvalidCredentials);
        }

        // Clears any stale streak and stamps the login time
        let account = self
            .store
            .record_success(&account.id, now)
            .await?
            .ok_or(RoomStayError::InvalidCredentials)?;

        // Parallel failures may have locked the account after the check above
        if account.is_locked_at(now) {
            log_security_event(SecurityEvent::AuthenticationFailed {
                identity: account.id.clone(),
                reason: "account locked during verification".to_string(),
            })
            .await;
            return Err(RoomStayError::AccountLocked);
        }

        log_security_event(SecurityEvent::AuthenticationSuccess {
            account_id: account.id.clone(),
        })
        .await;
        Ok(account)
    }

    /// Create a tenant account. The returned view carries no credential data.
    pub async fn register(&self, new_account: NewAccount) -> Result<AccountProfile> {
        let password_hash = self.hasher.hash_async(new_account.password).await?;

        let mut account = Account::new(
            new_account.full_name.trim().to_string(),
            new_account.email,
            new_account.phone,
            password_hash,
        );
        account.date_of_birth = new_account.date_of_birth;
        if let Some(gender) = new_account.gender {
            account.gender = gender;
        }
        if let Some(mut address) = new_account.address {
            if let Some(full) = address.compose_full_address() {
                address.full_address = Some(full);
            }
            account.address = Some(address);
        }

        let stored = self.store.insert(account).await?;
        log::info!("Registered account {} ({})", stored.id, stored.role);
        Ok(AccountProfile::from(&stored))
    }

    /// Replace the password after re-checking the current one
    pub async fn change_password(
        &self,
        account_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| RoomStayError::NotFound("Account not found".to_string()))?;

        let matches = self
            .hasher
            .verify_async(current_password.to_string(), account.password_hash.clone())
            .await?;
        if !matches {
            log_security_event(SecurityEvent::AuthenticationFailed {
                identity: account.id.clone(),
                reason: "wrong current password on password change".to_string(),
            })
            .await;
            return Err(RoomStayError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash_async(new_password.to_string()).await?;
        self.store
            .set_password(&account.id, password_hash)
            .await?
            .ok_or_else(|| RoomStayError::NotFound("Account not found".to_string()))?;

        log_security_event(SecurityEvent::PasswordChanged {
            account_id: account.id,
        })
        .await;
        Ok(())
    }

    /// Issue a reset token for the account with this email, replacing any
    /// outstanding one
    pub async fn request_password_reset(&self, email: &str) -> Result<PasswordReset> {
        self.request_password_reset_at(email, Utc::now()).await
    }

    pub async fn request_password_reset_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordReset> {
        let account = self.store.find_by_email(email).await?.ok_or_else(|| {
            RoomStayError::NotFound("No account found with this email".to_string())
        })?;

        let token = generate_reset_token();
        let expires_at = now + self.reset_token_ttl;
        self.store
            .set_reset_token(&account.id, reset_token_digest(&token), expires_at)
            .await?
            .ok_or_else(|| RoomStayError::NotFound("No account found with this email".to_string()))?;

        log_security_event(SecurityEvent::PasswordResetRequested {
            account_id: account.id.clone(),
        })
        .await;

        Ok(PasswordReset {
            account_id: account.id,
            token,
            expires_at,
        })
    }

    /// Consume a reset token and set a new password. Also lifts any lockout.
    pub async fn reset_password(&self, email: &str, token: &str, new_password: &str) -> Result<()> {
        self.reset_password_at(email, token, new_password, Utc::now()).await
    }

    pub async fn reset_password_at(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let account = self.store.find_by_email(email).await?;

        let valid = account.as_ref().map_or(false, |account| {
            match (&account.password_reset_token, account.password_reset_expires) {
                (Some(stored), Some(expires)) if expires > now => {
                    constant_time_eq(stored, &reset_token_digest(token))
                }
                _ => false,
            }
        });

        let account = match account {
            Some(account) if valid => account,
            _ => {
                log_security_event(SecurityEvent::PasswordResetFailed {
                    email: email.to_string(),
                    reason: "unknown, mismatched or expired token".to_string(),
                })
                .await;
                return Err(RoomStayError::invalid_field(
                    "token",
                    "Reset token is invalid or has expired",
                ));
            }
        };

        let password_hash = self.hasher.hash_async(new_password.to_string()).await?;

        self.store.clear_reset_token(&account.id).await?;
        self.store.set_password(&account.id, password_hash).await?;
        self.store.clear_lockout(&account.id).await?;

        log_security_event(SecurityEvent::PasswordChanged {
            account_id: account.id,
        })
        .await;
        Ok(())
    }
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Stored form of a reset token
pub fn reset_token_digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Caller-supplied login key as it may appear in logs: two leading
/// characters, escaped, and the length. The key could be a mistyped password.
fn masked_identity(identity_key: &str) -> String {
    let prefix: String = identity_key
        .chars()
        .take(2)
        .flat_map(char::escape_default)
        .collect();
    format!("{}*** ({} chars)", prefix, identity_key.chars().count())
}
