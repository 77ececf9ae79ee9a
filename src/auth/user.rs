use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-wide account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Tenant,
    Landlord,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Tenant => "tenant",
            UserRole::Landlord => "landlord",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Single,
    Shared,
    Studio,
    Apartment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub full_address: Option<String>,
}

impl Address {
    /// Joins street, ward, district and city when all four are present
    pub fn compose_full_address(&self) -> Option<String> {
        match (&self.street, &self.ward, &self.district, &self.city) {
            (Some(street), Some(ward), Some(district), Some(city)) => {
                Some(format!("{}, {}, {}, {}", street, ward, district, city))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Room-search preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub budget: Option<Budget>,
    #[serde(default)]
    pub location: Vec<String>,
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Identity attached to a request once its token has been verified and the
/// account resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

/// Persisted account record.
///
/// Holds the credential material, so it is deliberately not `Serialize`;
/// anything leaving the service goes through [`AccountProfile`] or
/// [`AccountSummary`].
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account identifier
    pub id: String,
    pub full_name: String,
    /// Unique, stored lower-cased
    pub email: String,
    /// Unique
    pub phone: String,
    /// PHC-formatted one-way hash of the password
    pub password_hash: String,
    pub role: UserRole,
    /// Soft-delete marker
    pub is_active: bool,
    pub is_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    /// SHA-256 digest of the outstanding reset token
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub address: Option<Address>,
    pub preferences: Preferences,
    pub emergency_contact: Option<EmergencyContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active, unverified tenant account
    pub fn new(full_name: String, email: String, phone: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            email: normalize_email(&email),
            phone: phone.trim().to_string(),
            password_hash,
            role: UserRole::Tenant,
            is_active: true,
            is_verified: false,
            email_verification_token: None,
            email_verification_expires: None,
            password_reset_token: None,
            password_reset_expires: None,
            last_login: None,
            failed_login_attempts: 0,
            lock_until: None,
            date_of_birth: None,
            gender: Gender::default(),
            address: None,
            preferences: Preferences::default(),
            emergency_contact: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account is locked at `now`. An elapsed lock counts as no lock.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.map_or(false, |until| until > now)
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    /// Whether a lock was set and has since run out
    pub fn lock_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.map_or(false, |until| until <= now)
    }

    pub fn identity(&self) -> IdentityContext {
        IdentityContext {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    /// Whole days since the account was created
    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }
}

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Full outward view of an account. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub address: Option<Address>,
    pub preferences: Preferences,
    pub emergency_contact: Option<EmergencyContact>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountProfile {
    pub fn identity(&self) -> IdentityContext {
        IdentityContext {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            is_verified: account.is_verified,
            date_of_birth: account.date_of_birth,
            gender: account.gender,
            address: account.address.clone(),
            preferences: account.preferences.clone(),
            emergency_contact: account.emergency_contact.clone(),
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Short view returned alongside a freshly issued token
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl AccountSummary {
    /// Summary for a registration response
    pub fn registered(profile: &AccountProfile) -> Self {
        Self {
            id: profile.id.clone(),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            role: profile.role,
            is_verified: profile.is_verified,
            created_at: Some(profile.created_at),
            last_login: None,
        }
    }

    /// Summary for a login response
    pub fn logged_in(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            is_verified: account.is_verified,
            created_at: None,
            last_login: account.last_login,
        }
    }
}
