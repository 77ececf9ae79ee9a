//! Server configuration module
//! Loads the authentication service settings from the environment

use crate::constants::{
    DEFAULT_HOST, DEFAULT_LOCKOUT_MINUTES, DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOGIN_MIN_MILLIS,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT, DEFAULT_RESET_TOKEN_MINUTES, DEFAULT_TOKEN_TTL_SECS,
    MIN_SIGNING_SECRET_LEN,
};
use crate::error::{Result, RoomStayError};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Key used to sign and verify session tokens
    pub jwt_secret: String,
    /// Session token validity window
    pub token_ttl: Duration,
    /// Failed attempts before an account is locked
    pub lockout_threshold: u32,
    /// How long a locked account stays locked
    pub lockout_duration: Duration,
    /// Lifetime of a password reset token
    pub reset_token_ttl: Duration,
    /// Diagnostic mode: raw error detail and reset tokens are returned to callers
    pub development_mode: bool,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count
    pub argon2_iterations: u32,
    /// Minimum wall time of a login attempt
    pub login_min_duration: Duration,
    /// Request body size limit
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

impl ServerConfig {
    /// Build a configuration around an explicit signing key, with every
    /// other setting at its default. The key is validated the same way
    /// `from_env` validates it.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Result<Self> {
        let jwt_secret = jwt_secret.into();
        Self::validate_jwt_secret(&jwt_secret)?;

        Ok(Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS as u64),
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_duration: Duration::from_secs(DEFAULT_LOCKOUT_MINUTES as u64 * 60),
            reset_token_ttl: Duration::from_secs(DEFAULT_RESET_TOKEN_MINUTES as u64 * 60),
            development_mode: false,
            argon2_memory_kib: argon2::Params::DEFAULT_M_COST,
            argon2_iterations: argon2::Params::DEFAULT_T_COST,
            login_min_duration: Duration::from_millis(DEFAULT_LOGIN_MIN_MILLIS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Validate that the signing key meets security requirements
    pub fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.trim().is_empty() {
            return Err(RoomStayError::ConfigError(
                "JWT secret must not be empty".to_string(),
            ));
        }

        if secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(RoomStayError::ConfigError(format!(
                "JWT secret must be at least {} characters long",
                MIN_SIGNING_SECRET_LEN
            )));
        }

        // Placeholder values shipped in sample .env files
        let insecure_patterns = [
            "fallback_secret",
            "your_super_secret",
            "your-secret-key",
            "change_this",
            "change-this",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        let lowered = secret.to_lowercase();
        for pattern in &insecure_patterns {
            if lowered.contains(pattern) {
                return Err(RoomStayError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RoomStayError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols) for security".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("ROOMSTAY_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                RoomStayError::ConfigError(
                    "JWT_SECRET environment variable is required; there is no built-in signing key. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;

        let mut config = Self::with_secret(jwt_secret)?;

        if let Ok(host) = env::var("ROOMSTAY_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_env("ROOMSTAY_PORT")? {
            config.port = port;
        }

        if let Ok(raw) = env::var("ROOMSTAY_JWT_EXPIRE").or_else(|_| env::var("JWT_EXPIRE")) {
            config.token_ttl = parse_duration(&raw).ok_or_else(|| {
                RoomStayError::ConfigError(format!(
                    "Invalid token lifetime '{}'. Use e.g. 7d, 12h, 30m, 45s or a number of seconds",
                    raw
                ))
            })?;
        }

        if let Some(threshold) = parse_env::<u32>("ROOMSTAY_LOCKOUT_THRESHOLD")? {
            if threshold == 0 {
                return Err(RoomStayError::ConfigError(
                    "ROOMSTAY_LOCKOUT_THRESHOLD must be at least 1".to_string(),
                ));
            }
            config.lockout_threshold = threshold;
        }
        if let Some(duration) = parse_minutes_env("ROOMSTAY_LOCKOUT_MINUTES")? {
            config.lockout_duration = duration;
        }
        if let Some(duration) = parse_minutes_env("ROOMSTAY_RESET_TOKEN_MINUTES")? {
            config.reset_token_ttl = duration;
        }

        let environment = env::var("ROOMSTAY_ENV")
            .or_else(|_| env::var("RUST_ENV"))
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "production".to_string());
        config.development_mode = matches!(environment.to_lowercase().as_str(), "development" | "dev");

        if let Some(memory) = parse_env("ROOMSTAY_ARGON2_MEMORY_KIB")? {
            config.argon2_memory_kib = memory;
        }
        if let Some(iterations) = parse_env("ROOMSTAY_ARGON2_ITERATIONS")? {
            config.argon2_iterations = iterations;
        }
        if let Some(millis) = parse_env("ROOMSTAY_LOGIN_MIN_MILLIS")? {
            config.login_min_duration = Duration::from_millis(millis);
        }
        if let Some(bytes) = parse_env("ROOMSTAY_MAX_BODY_BYTES")? {
            config.max_body_bytes = bytes;
        }

        Ok(config)
    }

    /// Token lifetime as a chrono duration
    pub fn token_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.token_ttl)
    }

    /// Lockout duration as a chrono duration
    pub fn lockout_duration_chrono(&self) -> chrono::Duration {
        to_chrono(self.lockout_duration)
    }

    /// Reset token lifetime as a chrono duration
    pub fn reset_token_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.reset_token_ttl)
    }
}

/// Read an optional numeric setting. A value that is set but does not parse
/// is an error, never a silent fallback to the default.
fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    let raw = match env::var(key) {
        Ok(raw) => raw,
        Err(_) => return Ok(None),
    };
    raw.trim().parse().map(Some).map_err(|_| {
        RoomStayError::ConfigError(format!("Invalid value '{}' for {}", raw, key))
    })
}

fn parse_minutes_env(key: &str) -> Result<Option<Duration>> {
    match parse_env::<u64>(key)? {
        Some(minutes) => minutes
            .checked_mul(60)
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| {
                RoomStayError::ConfigError(format!("{} is too large: {} minutes", key, minutes))
            }),
        None => Ok(None),
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Parse a lifetime such as `7d`, `12h`, `30m`, `45s` or a bare number of seconds
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;

    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    value.checked_mul(multiplier).map(Duration::from_secs)
}
