//! Access control for HTTP routes
//!
//! Every protected request walks the same pipeline: extract the bearer
//! token, verify it, resolve the account it names, then evaluate the
//! route's role rules in order. The first failing step decides the
//! rejection.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use warp::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use warp::{Filter, Rejection};

use crate::auth::token::{extract_bearer_token, TokenManager};
use crate::auth::user::{IdentityContext, UserRole};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::AccountStore;

/// A role check: the resolved role must be one of `allowed`
#[derive(Debug, Clone)]
pub struct RoleRule {
    allowed: Vec<UserRole>,
    message: String,
}

impl RoleRule {
    pub fn new(allowed: &[UserRole], message: impl Into<String>) -> Self {
        Self {
            allowed: allowed.to_vec(),
            message: message.into(),
        }
    }

    pub fn allows(&self, role: UserRole) -> bool {
        self.allowed.contains(&role)
    }

    fn required(&self) -> String {
        self.allowed
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Ordered role rules layered on top of authentication
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<RoleRule>,
}

impl AccessPolicy {
    /// Any active, authenticated account
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn admin_only() -> Self {
        Self::authenticated().require(&[UserRole::Admin], "Admin access required")
    }

    pub fn landlord_or_admin() -> Self {
        Self::authenticated().require(
            &[UserRole::Landlord, UserRole::Admin],
            "Only landlords can access this resource",
        )
    }

    pub fn tenant_or_admin() -> Self {
        Self::authenticated().require(
            &[UserRole::Tenant, UserRole::Admin],
            "Only tenants can access this resource",
        )
    }

    /// Append a rule. Rules run in the order they were added.
    pub fn require(mut self, allowed: &[UserRole], message: impl Into<String>) -> Self {
        self.rules.push(RoleRule::new(allowed, message));
        self
    }

    /// First rule the role fails, if any
    pub fn first_violation(&self, role: UserRole) -> Option<&RoleRule> {
        self.rules.iter().find(|rule| !rule.allows(role))
    }
}

/// Why a request was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection {
    pub status: StatusCode,
    pub reason: String,
}

impl AuthRejection {
    fn unauthorized(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            reason: reason.into(),
        }
    }

    fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.status.as_u16())
    }
}

impl warp::reject::Reject for AuthRejection {}

/// Outcome of the access-control pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized(IdentityContext),
    Rejected(AuthRejection),
}

impl AuthDecision {
    pub fn into_result(self) -> std::result::Result<IdentityContext, AuthRejection> {
        match self {
            AuthDecision::Authorized(identity) => Ok(identity),
            AuthDecision::Rejected(rejection) => Err(rejection),
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthDecision::Authorized(_))
    }
}

pub struct AccessControl {
    tokens: Arc<TokenManager>,
    store: Arc<dyn AccountStore>,
}

impl AccessControl {
    pub fn new(tokens: Arc<TokenManager>, store: Arc<dyn AccountStore>) -> Self {
        Self { tokens, store }
    }

    /// Run the full pipeline for a raw `Authorization` header value
    pub async fn authorize(&self, header: Option<&str>, policy: &AccessPolicy) -> AuthDecision {
        let identity = match self.resolve(header).await {
            Ok(identity) => identity,
            Err(rejection) => {
                log_security_event(SecurityEvent::UnauthorizedAccess {
                    reason: rejection.reason.clone(),
                })
                .await;
                return AuthDecision::Rejected(rejection);
            }
        };

        if let Some(rule) = policy.first_violation(identity.role) {
            log_security_event(SecurityEvent::PermissionDenied {
                account_id: identity.id.clone(),
                role: identity.role.to_string(),
                required: rule.required(),
            })
            .await;
            return AuthDecision::Rejected(AuthRejection::forbidden(rule.message.clone()));
        }

        AuthDecision::Authorized(identity)
    }

    /// Best-effort identity resolution. Never fails; any problem just
    /// means the caller is anonymous.
    pub async fn resolve_optional(&self, header: Option<&str>) -> Option<IdentityContext> {
        header?;
        match self.resolve(header).await {
            Ok(identity) => Some(identity),
            Err(rejection) => {
                log::debug!("Optional authentication ignored: {}", rejection);
                None
            }
        }
    }

    async fn resolve(&self, header: Option<&str>) -> Result<IdentityContext, AuthRejection> {
        let header = header.ok_or_else(|| AuthRejection::unauthorized("Missing authentication token"))?;
        let token = extract_bearer_token(header)
            .ok_or_else(|| AuthRejection::unauthorized("Invalid token"))?;

        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                log_security_event(SecurityEvent::TokenValidationFailed {
                    reason: e.to_string(),
                })
                .await;
                return Err(AuthRejection::unauthorized(e.public_message()));
            }
        };

        let account = match self.store.find_by_id(&claims.id).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(AuthRejection::unauthorized("Account not found")),
            Err(e) => {
                log::error!("Account lookup failed during authentication: {}", e);
                return Err(AuthRejection {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    reason: "Server error during authentication".to_string(),
                });
            }
        };

        if !account.is_active {
            return Err(AuthRejection::unauthorized("Account disabled"));
        }

        // The stored record is authoritative over whatever the token claims
        Ok(account.identity())
    }
}

/// Raw `Authorization` header, if present and readable
fn authorization_header() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::header::headers_cloned().map(|headers: HeaderMap| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

/// Require an identity satisfying `policy`
pub fn with_identity(
    access: Arc<AccessControl>,
    policy: AccessPolicy,
) -> impl Filter<Extract = (IdentityContext,), Error = Rejection> + Clone {
    let policy = Arc::new(policy);
    authorization_header().and_then(move |header: Option<String>| {
        let access = access.clone();
        let policy = policy.clone();
        async move {
            access
                .authorize(header.as_deref(), &policy)
                .await
                .into_result()
                .map_err(warp::reject::custom)
        }
    })
}

/// Attach an identity when one can be resolved, otherwise `None`
pub fn with_optional_identity(
    access: Arc<AccessControl>,
) -> impl Filter<Extract = (Option<IdentityContext>,), Error = Infallible> + Clone {
    authorization_header().then(move |header: Option<String>| {
        let access = access.clone();
        async move { access.resolve_optional(header.as_deref()).await }
    })
}
