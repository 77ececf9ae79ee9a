use serde::Serialize;
use std::error::Error;
use std::fmt;
use warp::http::StatusCode;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum RoomStayError {
    // Input errors
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    DuplicateIdentity(String),

    // Credential errors
    InvalidCredentials,
    AccountLocked,

    // Token errors
    TokenInvalid,
    TokenExpired,

    // Access errors
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),

    // Storage errors
    StorageError(String),

    // System errors
    InternalError(String),

    // Configuration errors
    ConfigError(String),
}

impl RoomStayError {
    /// Validation error carrying field-level detail
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self::Validation {
            message: "Invalid request data".to_string(),
            fields,
        }
    }

    /// Validation error for a single field
    pub fn invalid_field(field: &str, message: &str) -> Self {
        Self::validation(vec![FieldError::new(field, message)])
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateIdentity(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials
            | Self::AccountLocked
            | Self::TokenInvalid
            | Self::TokenExpired
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageError(_) | Self::InternalError(_) | Self::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this error hides its detail from callers
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StorageError(_) | Self::InternalError(_) | Self::ConfigError(_)
        )
    }

    /// Message safe to show to an API caller.
    ///
    /// Credential failures are deliberately generic: a caller can never tell
    /// an unknown account apart from a wrong password.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::DuplicateIdentity(msg) => msg.clone(),
            Self::InvalidCredentials => "Invalid login credentials".to_string(),
            Self::AccountLocked => {
                "Account is temporarily locked due to too many failed login attempts".to_string()
            }
            Self::TokenInvalid => "Invalid token".to_string(),
            Self::TokenExpired => "Token has expired".to_string(),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::NotFound(msg) => msg.clone(),
            Self::StorageError(_) | Self::InternalError(_) | Self::ConfigError(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Field-level detail, if any
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for RoomStayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message, fields } => {
                write!(f, "Validation error: {}", message)?;
                for field in fields {
                    write!(f, "; {}: {}", field.field, field.message)?;
                }
                Ok(())
            }
            Self::DuplicateIdentity(msg) => write!(f, "Duplicate identity: {}", msg),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::AccountLocked => write!(f, "Account locked"),
            Self::TokenInvalid => write!(f, "Token invalid"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RoomStayError {}

// warp's blanket `From<T: Reject>` lets handlers use `?` directly
impl warp::reject::Reject for RoomStayError {}

impl From<tokio::task::JoinError> for RoomStayError {
    fn from(err: tokio::task::JoinError) -> Self {
        RoomStayError::InternalError(format!("Background task failed: {}", err))
    }
}

// Generic result type for RoomStay
pub type Result<T> = std::result::Result<T, RoomStayError>;
