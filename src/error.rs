// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::ServiceError;
use crate::storage::AttestationDbError;

/// HTTP-facing error with a status code and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Map the service error taxonomy onto HTTP statuses: validation 400,
/// authorization 401, conflict 409, everything upstream 500 with the
/// upstream message passed through.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidPayload(msg) => ApiError::bad_request(msg),
            ServiceError::RoleMismatch(msg) => ApiError::bad_request(msg),
            ServiceError::InvalidSignature(msg) => ApiError::unauthorized(msg),
            ServiceError::Codec(err) => ApiError::bad_request(err.to_string()),
            ServiceError::OtpRejected => ApiError::unauthorized("Invalid or expired code"),
            ServiceError::Database(AttestationDbError::AlreadyExists(uid)) => {
                ApiError::conflict(format!("Attestation {uid} already exists"))
            }
            ServiceError::UnknownSchema(uid) => {
                ApiError::internal(format!("Schema {uid} is not registered"))
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let auth = ApiError::unauthorized("nope");
        assert_eq!(auth.status, StatusCode::UNAUTHORIZED);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let api: ApiError = ServiceError::OtpRejected.into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);

        let api: ApiError =
            ServiceError::Database(AttestationDbError::AlreadyExists("0xabc".into())).into();
        assert_eq!(api.status, StatusCode::CONFLICT);

        let api: ApiError = ServiceError::UnknownSchema("0xdead".into()).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
