// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::ChainError;
use crate::ipfs::IpfsError;
use crate::storage::StorageError;

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

    /// Malformed address, id, format or out-of-range value.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Blockchain or pinning-service failure surfaced to the caller.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(what) => {
                ApiError::conflict(format!("{what} already exists"))
            }
            StorageError::Conflict(msg) => ApiError::conflict(msg),
            other => {
                tracing::error!(error = %other, "storage failure");
                ApiError::internal("Internal storage error")
            }
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidAddress(_) | ChainError::InvalidHash(_) | ChainError::UnknownRole(_) => {
                ApiError::bad_request(err.to_string())
            }
            other => {
                tracing::warn!(error = %other, "chain gateway failure");
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

impl From<IpfsError> for ApiError {
    fn from(err: IpfsError) -> Self {
        tracing::warn!(error = %err, "pinning gateway failure");
        ApiError::bad_gateway(err.to_string())
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

        assert_eq!(ApiError::forbidden("no").status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("dup").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::bad_gateway("rpc").status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn storage_errors_map_to_taxonomy() {
        let nf: ApiError = StorageError::NotFound("Credential abc".into()).into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "Credential abc not found");

        let dup: ApiError = StorageError::AlreadyExists("Assignment".into()).into();
        assert_eq!(dup.status, StatusCode::CONFLICT);

        let conflict: ApiError = StorageError::Conflict("Credential already revoked".into()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.message, "Credential already revoked");
    }

    #[test]
    fn gateway_errors_map_to_bad_request_or_bad_gateway() {
        let bad: ApiError = ChainError::UnknownRole("DEAN".into()).into();
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let down: ApiError = ChainError::NotConfigured.into();
        assert_eq!(down.status, StatusCode::BAD_GATEWAY);
        assert_eq!(down.message, "Blockchain service not configured");

        let ipfs: ApiError = IpfsError::Retrieval("all gateways failed".into()).into();
        assert_eq!(ipfs.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
