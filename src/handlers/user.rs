//! Account self-service endpoints: `/api/user/*`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Rejection;

use crate::auth::user::{
    AccountProfile, Address, Budget, EmergencyContact, Gender, IdentityContext, Preferences,
    RoomType,
};
use crate::error::{Result, RoomStayError};
use crate::handlers::auth::ProfilePayload;
use crate::handlers::response::{json_reply, ApiResponse};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::server::AppState;
use crate::storage::{PreferencesUpdate, ProfileUpdate};
use crate::validation::{
    check_address, check_budget, check_emergency_contact, is_past_date, is_valid_full_name,
    Validator,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
}

impl UpdateProfileRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        let mut v = Validator::new();
        if let Some(name) = &self.full_name {
            v.check(
                is_valid_full_name(name),
                "fullName",
                "Full name must be between 2 and 50 characters",
            );
        }
        if let Some(date) = self.date_of_birth {
            v.check(
                is_past_date(date, today),
                "dateOfBirth",
                "Date of birth must be in the past",
            );
        }
        if let Some(address) = &self.address {
            check_address(&mut v, address);
        }
        if let Some(contact) = &self.emergency_contact {
            check_emergency_contact(&mut v, contact);
        }
        v.finish()
    }

    fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            full_name: self.full_name.map(|name| name.trim().to_string()),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address,
            emergency_contact: self.emergency_contact,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub budget: Option<Budget>,
    pub room_type: Option<RoomType>,
    pub location: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

impl UpdatePreferencesRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(budget) = &self.budget {
            check_budget(&mut v, budget);
        }
        v.finish()
    }

    fn into_update(self) -> PreferencesUpdate {
        PreferencesUpdate {
            budget: self.budget,
            room_type: self.room_type,
            location: self.location,
            amenities: self.amenities,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreferencesPayload {
    pub preferences: Preferences,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub account_age_days: i64,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
}

fn user_not_found() -> RoomStayError {
    RoomStayError::NotFound("User not found".to_string())
}

/// GET /api/user/profile
pub async fn get_profile(
    identity: IdentityContext,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    let account = state
        .store
        .find_by_id(&identity.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "Profile retrieved",
            ProfilePayload {
                user: AccountProfile::from(&account),
            },
        ),
    ))
}

/// PUT /api/user/profile
pub async fn update_profile(
    identity: IdentityContext,
    body: UpdateProfileRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    body.validate(Utc::now().date_naive())?;

    let account = state
        .store
        .update_profile(&identity.id, body.into_update())
        .await?
        .ok_or_else(user_not_found)?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "Profile updated successfully",
            ProfilePayload {
                user: AccountProfile::from(&account),
            },
        ),
    ))
}

/// PUT /api/user/preferences
pub async fn update_preferences(
    identity: IdentityContext,
    body: UpdatePreferencesRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    body.validate()?;

    let account = state
        .store
        .update_preferences(&identity.id, body.into_update())
        .await?
        .ok_or_else(user_not_found)?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "Preferences updated successfully",
            PreferencesPayload {
                preferences: account.preferences,
            },
        ),
    ))
}

/// DELETE /api/user/account
///
/// Soft delete. Outstanding tokens stop working because the access check
/// rejects inactive accounts.
pub async fn delete_account(
    identity: IdentityContext,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    state
        .store
        .deactivate(&identity.id)
        .await?
        .ok_or_else(user_not_found)?;

    log_security_event(SecurityEvent::AccountDeactivated {
        account_id: identity.id,
    })
    .await;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::ack("Account deleted successfully"),
    ))
}

/// GET /api/user/stats
pub async fn stats(
    identity: IdentityContext,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    let account = state
        .store
        .find_by_id(&identity.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "Account statistics retrieved",
            AccountStats {
                account_age_days: account.account_age_days(Utc::now()),
                is_verified: account.is_verified,
                last_login: account.last_login,
            },
        ),
    ))
}
