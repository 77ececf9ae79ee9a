//! RoomStay Auth - account authentication service for a rental platform
//!
//! This library provides credential storage, password hashing, session
//! tokens, brute-force lockout and role-based access control, exposed as a
//! warp HTTP API.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod security;
pub mod security_logger;
pub mod server;
pub mod storage;
pub mod validation;

// Re-export main components
pub use config::ServerConfig;
pub use error::{Result, RoomStayError};
pub use server::{routes, AppState};
