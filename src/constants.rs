// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const API_PREFIX: &str = "api";

// Session token lifetime (7 days)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// Brute-force lockout policy
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 120;

// Password reset tokens
pub const DEFAULT_RESET_TOKEN_MINUTES: i64 = 10;
pub const RESET_TOKEN_BYTES: usize = 32;

// Request handling
pub const DEFAULT_LOGIN_MIN_MILLIS: u64 = 100;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024;

// Minimum signing key length accepted at startup
pub const MIN_SIGNING_SECRET_LEN: usize = 32;
