//! Authentication endpoints: `/api/auth/*`

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Rejection;

use crate::auth::authenticator::NewAccount;
use crate::auth::user::{AccountProfile, AccountSummary, Address, Gender, IdentityContext};
use crate::error::{Result, RoomStayError};
use crate::handlers::response::{json_reply, ApiResponse};
use crate::security::AuthTimer;
use crate::server::AppState;
use crate::validation::{
    check_address, check_new_password, is_past_date, is_valid_email, is_valid_full_name,
    is_valid_phone, Validator,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
}

impl RegisterRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        let mut v = Validator::new();
        v.check(
            is_valid_full_name(&self.full_name),
            "fullName",
            "Full name must be between 2 and 50 characters",
        )
        .check(is_valid_email(&self.email), "email", "Invalid email address")
        .check(
            is_valid_phone(&self.phone),
            "phone",
            "Phone number must have 10-11 digits",
        );
        check_new_password(
            &mut v,
            "password",
            &self.password,
            "confirmPassword",
            &self.confirm_password,
        );
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
        v.finish()
    }

    fn into_new_account(self) -> NewAccount {
        NewAccount {
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            password: self.password,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_phone: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.check(
            !self.email_or_phone.trim().is_empty(),
            "emailOrPhone",
            "Email or phone number is required",
        )
        .check(!self.password.is_empty(), "password", "Password is required");
        v.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.check(
            !self.current_password.is_empty(),
            "currentPassword",
            "Current password is required",
        );
        check_new_password(
            &mut v,
            "newPassword",
            &self.new_password,
            "confirmNewPassword",
            &self.confirm_new_password,
        );
        v.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.check(is_valid_email(&self.email), "email", "Invalid email address")
            .check(!self.token.trim().is_empty(), "token", "Reset token is required");
        check_new_password(
            &mut v,
            "newPassword",
            &self.new_password,
            "confirmNewPassword",
            &self.confirm_new_password,
        );
        v.finish()
    }
}

/// `{user, token}` returned by register and login
#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub user: AccountSummary,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfilePayload {
    pub user: AccountProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenPayload {
    pub reset_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<IdentityContext>,
}

/// POST /api/auth/register
pub async fn register(
    body: RegisterRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    body.validate(Utc::now().date_naive())?;

    let profile = state.authenticator.register(body.into_new_account()).await?;
    let token = state.tokens.issue(&profile.identity())?;

    Ok(json_reply(
        StatusCode::CREATED,
        &ApiResponse::success(
            "Registration successful",
            SessionPayload {
                user: AccountSummary::registered(&profile),
                token,
            },
        ),
    ))
}

/// POST /api/auth/login
///
/// Every outcome takes at least the configured minimum duration.
pub async fn login(
    body: LoginRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    let timer = AuthTimer::new(state.config.login_min_duration);

    let outcome = async {
        body.validate()?;
        let account = state
            .authenticator
            .authenticate(&body.email_or_phone, &body.password)
            .await?;
        let token = state.tokens.issue(&account.identity())?;
        Ok::<_, RoomStayError>(SessionPayload {
            user: AccountSummary::logged_in(&account),
            token,
        })
    }
    .await;

    timer.wait().await;
    let payload = outcome?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success("Login successful", payload),
    ))
}

/// GET /api/auth/me
pub async fn me(
    identity: IdentityContext,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    let account = state
        .store
        .find_by_id(&identity.id)
        .await?
        .ok_or_else(|| RoomStayError::NotFound("User not found".to_string()))?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "User information retrieved",
            ProfilePayload {
                user: AccountProfile::from(&account),
            },
        ),
    ))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(identity: IdentityContext) -> std::result::Result<Response, Rejection> {
    log::info!("Account {} logged out", identity.id);
    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::ack("Logged out successfully"),
    ))
}

/// POST /api/auth/change-password
pub async fn change_password(
    identity: IdentityContext,
    body: ChangePasswordRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    body.validate()?;

    state
        .authenticator
        .change_password(&identity.id, &body.current_password, &body.new_password)
        .await?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::ack("Password changed successfully"),
    ))
}

/// POST /api/auth/forgot-password
///
/// The raw token is only ever returned in development mode; in production
/// it would go out by email.
pub async fn forgot_password(
    body: ForgotPasswordRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    if !is_valid_email(&body.email) {
        return Err(RoomStayError::invalid_field("email", "Invalid email address").into());
    }

    let reset = state.authenticator.request_password_reset(&body.email).await?;
    let message = "Password reset instructions have been sent to your email";

    if state.config.development_mode {
        log::debug!("Reset token for account {} expires at {}", reset.account_id, reset.expires_at);
        return Ok(json_reply(
            StatusCode::OK,
            &ApiResponse::success(
                message,
                ResetTokenPayload {
                    reset_token: reset.token,
                },
            ),
        ));
    }

    Ok(json_reply(StatusCode::OK, &ApiResponse::ack(message)))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    body: ResetPasswordRequest,
    state: Arc<AppState>,
) -> std::result::Result<Response, Rejection> {
    body.validate()?;

    state
        .authenticator
        .reset_password(&body.email, body.token.trim(), &body.new_password)
        .await?;

    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::ack("Password has been reset successfully"),
    ))
}

/// GET /api/auth/status
///
/// Reports who the caller is without requiring a login.
pub async fn status(identity: Option<IdentityContext>) -> std::result::Result<Response, Rejection> {
    Ok(json_reply(
        StatusCode::OK,
        &ApiResponse::success(
            "Session status",
            SessionStatus {
                authenticated: identity.is_some(),
                user: identity,
            },
        ),
    ))
}
