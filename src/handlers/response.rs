//! JSON envelope shared by every API response, and rejection recovery

use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::auth::middleware::AuthRejection;
use crate::error::{FieldError, RoomStayError};
use crate::security::with_api_security_headers;

/// `{success, message, data?, errors?, error?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-level validation detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Raw error detail, development mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success acknowledgement without a payload
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            errors: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors: None,
            error: None,
        }
    }
}

/// Serialize `body` with `status` and the API security headers
pub fn json_reply<T: Serialize>(status: StatusCode, body: &ApiResponse<T>) -> Response {
    let reply = warp::reply::with_status(warp::reply::json(body), status);
    with_api_security_headers(reply).into_response()
}

/// Render an application error in the envelope
pub fn error_reply(err: &RoomStayError, development_mode: bool) -> Response {
    if err.is_internal() {
        log::error!("Request failed: {}", err);
    }

    let mut body = ApiResponse::failure(err.public_message());
    body.errors = err.field_errors().map(<[FieldError]>::to_vec);
    if development_mode && err.is_internal() {
        body.error = Some(err.to_string());
    }
    json_reply(err.status_code(), &body)
}

/// Turn any rejection into an enveloped JSON response
pub async fn handle_rejection(
    err: Rejection,
    development_mode: bool,
) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<RoomStayError>() {
        return Ok(error_reply(e, development_mode));
    }

    if let Some(rejection) = err.find::<AuthRejection>() {
        return Ok(json_reply(
            rejection.status,
            &ApiResponse::failure(rejection.reason.clone()),
        ));
    }

    let (status, message, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Route not found", None)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "Invalid request data", Some(e.to_string()))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large", None)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length header required", None)
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
            None,
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            Some(format!("{:?}", err)),
        )
    };

    let mut body = ApiResponse::failure(message);
    if development_mode {
        body.error = detail;
    }
    Ok(json_reply(status, &body))
}
