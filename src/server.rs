//! Shared application state and the HTTP route tree

use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::auth::middleware::{with_identity, with_optional_identity, AccessControl, AccessPolicy};
use crate::auth::{Authenticator, TokenManager};
use crate::config::ServerConfig;
use crate::constants::API_PREFIX;
use crate::error::Result;
use crate::handlers::{self, handle_rejection};
use crate::storage::AccountStore;

/// Everything a request handler needs, built once at startup
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn AccountStore>,
    pub tokens: Arc<TokenManager>,
    pub authenticator: Authenticator,
    pub access: Arc<AccessControl>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn AccountStore>) -> Result<Self> {
        ServerConfig::validate_jwt_secret(&config.jwt_secret)?;

        let tokens = Arc::new(TokenManager::new(&config.jwt_secret, config.token_ttl_chrono()));
        let authenticator = Authenticator::from_config(store.clone(), &config)?;
        let access = Arc::new(AccessControl::new(tokens.clone(), store.clone()));

        Ok(Self {
            config,
            store,
            tokens,
            authenticator,
            access,
        })
    }
}

/// Helper function to include the app state in a request
pub fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>(
    limit: u64,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::json())
}

/// Full route tree with rejection recovery
pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let limit = state.config.max_body_bytes;
    let development_mode = state.config.development_mode;
    let access = state.access.clone();
    let authenticated = || with_identity(access.clone(), AccessPolicy::authenticated());

    // /api/auth/*
    let register = warp::path!("register")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::auth::register);

    let login = warp::path!("login")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::auth::login);

    let me = warp::path!("me")
        .and(warp::get())
        .and(authenticated())
        .and(with_state(state.clone()))
        .and_then(handlers::auth::me);

    let logout = warp::path!("logout")
        .and(warp::post())
        .and(authenticated())
        .and_then(handlers::auth::logout);

    let change_password = warp::path!("change-password")
        .and(warp::post())
        .and(authenticated())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::auth::change_password);

    let forgot_password = warp::path!("forgot-password")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::auth::forgot_password);

    let reset_password = warp::path!("reset-password")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::auth::reset_password);

    let status = warp::path!("status")
        .and(warp::get())
        .and(with_optional_identity(access.clone()))
        .and_then(handlers::auth::status);

    let auth_routes = warp::path("auth").and(
        register
            .or(login)
            .or(me)
            .or(logout)
            .or(change_password)
            .or(forgot_password)
            .or(reset_password)
            .or(status),
    );

    // /api/user/*
    let get_profile = warp::path!("profile")
        .and(warp::get())
        .and(authenticated())
        .and(with_state(state.clone()))
        .and_then(handlers::user::get_profile);

    let update_profile = warp::path!("profile")
        .and(warp::put())
        .and(authenticated())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::user::update_profile);

    let update_preferences = warp::path!("preferences")
        .and(warp::put())
        .and(with_identity(access.clone(), AccessPolicy::tenant_or_admin()))
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::user::update_preferences);

    let delete_account = warp::path!("account")
        .and(warp::delete())
        .and(authenticated())
        .and(with_state(state.clone()))
        .and_then(handlers::user::delete_account);

    let stats = warp::path!("stats")
        .and(warp::get())
        .and(authenticated())
        .and(with_state(state))
        .and_then(handlers::user::stats);

    let user_routes = warp::path("user").and(
        get_profile
            .or(update_profile)
            .or(update_preferences)
            .or(delete_account)
            .or(stats),
    );

    let api = warp::path(API_PREFIX).and(auth_routes.or(user_routes));

    let health = warp::path!("health").and(warp::get()).map(|| "OK");

    health
        .or(api)
        .with(warp::log("roomstay_auth::http"))
        .recover(move |err| handle_rejection(err, development_mode))
}
