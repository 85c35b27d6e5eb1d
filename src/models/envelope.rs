//! Uniform response envelope
//!
//! Every use-case outcome is returned as
//! `{"meta": {"message", "status", "code"}, "data"}` and the HTTP layer
//! answers with `code` as its status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Coarse outcome tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Failure classification shared by every use case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed caller input
    Validation,
    /// Entity absent
    NotFound,
    /// Missing or invalid identity
    Unauthorized,
    /// Identity present but not the owner
    Forbidden,
    /// Repository or storage failure
    Internal,
}

impl FailureKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            FailureKind::Validation => StatusCode::BAD_REQUEST,
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
            FailureKind::Forbidden => StatusCode::FORBIDDEN,
            FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub message: String,
    pub status: ResponseStatus,
    pub code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    pub data: Value,
}

/// Build an envelope from its four parts.
///
/// Never fails: a payload that cannot be serialized becomes `null`.
pub fn build_response<T: Serialize>(
    message: impl Into<String>,
    status: ResponseStatus,
    code: StatusCode,
    data: T,
) -> Envelope {
    Envelope {
        meta: Meta {
            message: message.into(),
            status,
            code: code.as_u16(),
        },
        data: serde_json::to_value(data).unwrap_or(Value::Null),
    }
}

impl Envelope {
    /// SUCCESS envelope; `code` should be a 2xx status
    pub fn success<T: Serialize>(message: impl Into<String>, code: StatusCode, data: T) -> Self {
        build_response(message, ResponseStatus::Success, code, data)
    }

    /// FAILED envelope with `{"errors": [..]}` as data
    pub fn failure(
        message: impl Into<String>,
        kind: FailureKind,
        errors: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let errors: Vec<String> = errors.into_iter().map(Into::into).collect();
        build_response(
            message,
            ResponseStatus::Failed,
            kind.status_code(),
            json!({ "errors": errors }),
        )
    }

    /// FAILED envelope with an arbitrary code, for transport-level outcomes
    /// that are not use-case failures (e.g. 422 on a taken email)
    pub fn failed_with_code<T: Serialize>(
        message: impl Into<String>,
        code: StatusCode,
        data: T,
    ) -> Self {
        build_response(message, ResponseStatus::Failed, code, data)
    }

    pub fn is_success(&self) -> bool {
        self.meta.status == ResponseStatus::Success
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.meta.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
