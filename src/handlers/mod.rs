pub mod auth;
pub mod response;
pub mod user;

pub use response::{handle_rejection, ApiResponse};
