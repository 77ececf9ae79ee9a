//! Authentication and authorization module

pub mod authenticator;
pub mod middleware;
pub mod password;
pub mod token;
pub mod user;

// Re-export main components
pub use authenticator::{Authenticator, NewAccount, PasswordReset};
pub use middleware::{AccessControl, AccessPolicy, AuthDecision, AuthRejection};
pub use password::CredentialHasher;
pub use token::{Claims, TokenManager};
pub use user::{Account, AccountProfile, AccountSummary, IdentityContext, UserRole};
