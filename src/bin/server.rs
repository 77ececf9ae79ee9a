use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use roomstay_auth::config::ServerConfig;
use roomstay_auth::security_logger::{init_security_logger, log_security_event, SecurityEvent};
use roomstay_auth::server::{routes, AppState};
use roomstay_auth::storage::MemoryAccountStore;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    init_security_logger();

    // Load config from the environment; a missing signing key is fatal
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log_security_event(SecurityEvent::ConfigurationError {
                component: "server".to_string(),
                error: e.to_string(),
            })
            .await;
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, token_ttl={}s, lockout={} attempts/{}s",
        config.host,
        config.port,
        config.token_ttl.as_secs(),
        config.lockout_threshold,
        config.lockout_duration.as_secs()
    );
    if config.development_mode {
        warn!("Development mode is enabled: error detail and reset tokens are returned to callers");
    }

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryAccountStore::new());
    let state = match AppState::new(config, store) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting RoomStay auth server on {}", addr);
    warp::serve(routes(state)).run(addr).await;
}
