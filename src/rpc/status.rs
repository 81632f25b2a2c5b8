use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// RPC status codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Internal,
}

impl Code {
    pub fn http_status(self) -> StatusCode {
        match self {
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned to callers. `message` is always safe to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcStatus {
    pub code: Code,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(Code::AlreadyExists, message)
    }

    pub fn internal() -> Self {
        Self::new(Code::Internal, "internal error")
    }
}

impl From<JsonRejection> for RpcStatus {
    fn from(rejection: JsonRejection) -> Self {
        RpcStatus::invalid_argument(rejection.body_text())
    }
}

impl IntoResponse for RpcStatus {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self)).into_response()
    }
}
