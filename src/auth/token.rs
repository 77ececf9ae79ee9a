use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::user::{IdentityContext, UserRole};
use crate::error::{Result, RoomStayError};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub id: String,
    pub email: String,
    pub role: UserRole,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for an identity, valid for `ttl` from `issued_at`
    pub fn new(identity: &IdentityContext, issued_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat,
            exp: iat.saturating_add(ttl.num_seconds()),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn identity(&self) -> IdentityContext {
        IdentityContext {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Issues and verifies signed session tokens.
///
/// Tokens are stateless: nothing is recorded server-side, so expiry is the
/// only way a token stops being accepted.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenManager {
    /// Creates a new token manager with a secret and token lifetime
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issues a token for the identity, starting now
    pub fn issue(&self, identity: &IdentityContext) -> Result<String> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token as if it were created at `issued_at`
    pub fn issue_at(&self, identity: &IdentityContext, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims::new(identity, issued_at, self.ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RoomStayError::InternalError(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature, structure and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(RoomStayError::TokenExpired),
                _ => {
                    log::debug!("Token rejected: {}", e);
                    Err(RoomStayError::TokenInvalid)
                }
            },
        }
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
