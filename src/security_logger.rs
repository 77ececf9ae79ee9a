//! Security-focused logging module to track authentication and access events

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Types of security events to track. Never carries passwords or tokens.
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    // Authentication events
    AuthenticationFailed { identity: String, reason: String },
    AuthenticationSuccess { account_id: String },
    AccountLocked { account_id: String },
    TokenValidationFailed { reason: String },

    // Authorization events
    PermissionDenied { account_id: String, role: String, required: String },
    UnauthorizedAccess { reason: String },

    // Credential lifecycle
    PasswordChanged { account_id: String },
    PasswordResetRequested { account_id: String },
    PasswordResetFailed { email: String, reason: String },
    AccountDeactivated { account_id: String },

    // System security
    ConfigurationError { component: String, error: String },
}

impl SecurityEvent {
    /// Key used for counting and alert thresholds
    fn key(&self) -> &'static str {
        match self {
            SecurityEvent::AuthenticationFailed { .. } => "auth_failed",
            SecurityEvent::AuthenticationSuccess { .. } => "auth_success",
            SecurityEvent::AccountLocked { .. } => "account_locked",
            SecurityEvent::TokenValidationFailed { .. } => "token_validation_failed",
            SecurityEvent::PermissionDenied { .. } => "permission_denied",
            SecurityEvent::UnauthorizedAccess { .. } => "unauthorized_access",
            SecurityEvent::PasswordChanged { .. } => "password_changed",
            SecurityEvent::PasswordResetRequested { .. } => "password_reset_requested",
            SecurityEvent::PasswordResetFailed { .. } => "password_reset_failed",
            SecurityEvent::AccountDeactivated { .. } => "account_deactivated",
            SecurityEvent::ConfigurationError { .. } => "config_error",
        }
    }
}

/// Security event with timestamp
#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: SecurityEvent,
    timestamp: Instant,
}

/// Security logger for tracking and alerting on security events
pub struct SecurityLogger {
    events: Arc<RwLock<Vec<TimestampedEvent>>>,
    event_counts: Arc<RwLock<HashMap<&'static str, usize>>>,
    max_events: usize,
    alert_thresholds: HashMap<&'static str, usize>,
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityLogger {
    /// Create a new security logger
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("auth_failed", 20);
        alert_thresholds.insert("account_locked", 3);
        alert_thresholds.insert("token_validation_failed", 10);
        alert_thresholds.insert("permission_denied", 20);
        alert_thresholds.insert("unauthorized_access", 20);
        alert_thresholds.insert("password_reset_failed", 5);
        alert_thresholds.insert("config_error", 1);

        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            event_counts: Arc::new(RwLock::new(HashMap::new())),
            max_events: 10000,
            alert_thresholds,
        }
    }

    /// Log a security event
    pub async fn log_event(&self, event: SecurityEvent) {
        let key = event.key();

        {
            let mut events = self.events.write().await;
            events.push(TimestampedEvent {
                event: event.clone(),
                timestamp: Instant::now(),
            });

            // Limit memory usage
            if events.len() > self.max_events {
                let excess = events.len() - self.max_events;
                events.drain(0..excess);
            }
        }

        {
            let mut counts = self.event_counts.write().await;
            let count = counts.entry(key).or_insert(0);
            *count += 1;

            if let Some(&threshold) = self.alert_thresholds.get(key) {
                if *count >= threshold {
                    log::error!("SECURITY ALERT: {} events of type '{}' detected", count, key);
                    log::error!("Sample event: {:?}", event);
                    *count = 0;
                }
            }
        }

        match &event {
            SecurityEvent::AuthenticationFailed { identity, reason } => {
                log::warn!("SECURITY: Authentication failed - Identity: {}, Reason: {}", identity, reason);
            }
            SecurityEvent::AuthenticationSuccess { account_id } => {
                log::info!("SECURITY: Authentication success - Account: {}", account_id);
            }
            SecurityEvent::AccountLocked { account_id } => {
                log::warn!("SECURITY: Account locked after repeated failures - Account: {}", account_id);
            }
            SecurityEvent::TokenValidationFailed { reason } => {
                log::warn!("SECURITY: Token validation failed - Reason: {}", reason);
            }
            SecurityEvent::PermissionDenied { account_id, role, required } => {
                log::warn!(
                    "SECURITY: Permission denied - Account: {}, Role: {}, Required: {}",
                    account_id, role, required
                );
            }
            SecurityEvent::UnauthorizedAccess { reason } => {
                log::warn!("SECURITY: Unauthorized access - Reason: {}", reason);
            }
            SecurityEvent::PasswordChanged { account_id } => {
                log::info!("SECURITY: Password changed - Account: {}", account_id);
            }
            SecurityEvent::PasswordResetRequested { account_id } => {
                log::info!("SECURITY: Password reset requested - Account: {}", account_id);
            }
            SecurityEvent::PasswordResetFailed { email, reason } => {
                log::warn!("SECURITY: Password reset failed - Email: {}, Reason: {}", email, reason);
            }
            SecurityEvent::AccountDeactivated { account_id } => {
                log::info!("SECURITY: Account deactivated - Account: {}", account_id);
            }
            SecurityEvent::ConfigurationError { component, error } => {
                log::error!("SECURITY: Configuration error - Component: {}, Error: {}", component, error);
            }
        }
    }

    /// Get recent security events
    pub async fn get_recent_events(&self, duration: Duration) -> Vec<SecurityEvent> {
        let events = self.events.read().await;
        let now = Instant::now();

        events
            .iter()
            .filter(|event| now.duration_since(event.timestamp) <= duration)
            .map(|event| event.event.clone())
            .collect()
    }

    /// Get event statistics
    pub async fn get_event_stats(&self) -> HashMap<&'static str, usize> {
        self.event_counts.read().await.clone()
    }

    /// Clean up old events
    pub async fn cleanup_old_events(&self, max_age: Duration) {
        let mut events = self.events.write().await;
        let now = Instant::now();
        events.retain(|event| now.duration_since(event.timestamp) <= max_age);
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // Every 5 minutes
            loop {
                interval.tick().await;
                self.cleanup_old_events(Duration::from_secs(3600 * 24)).await;
            }
        });
    }
}

/// Global security logger instance
static SECURITY_LOGGER: OnceLock<Arc<SecurityLogger>> = OnceLock::new();

/// Initialize the global security logger. Must be called from within a
/// Tokio runtime, since it starts the cleanup task.
pub fn init_security_logger() {
    SECURITY_LOGGER.get_or_init(|| {
        let logger = Arc::new(SecurityLogger::new());
        logger.clone().start_cleanup_task();
        logger
    });
}

/// Get the global security logger
pub fn get_security_logger() -> Option<Arc<SecurityLogger>> {
    SECURITY_LOGGER.get().cloned()
}

/// Log a security event using the global logger. Falls back to the plain
/// log facade when the global logger was never initialised.
pub async fn log_security_event(event: SecurityEvent) {
    match get_security_logger() {
        Some(logger) => logger.log_event(event).await,
        None => log::debug!("SECURITY (untracked): {:?}", event),
    }
}
