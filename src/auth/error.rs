// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;

/// Authentication error type.
///
/// Covers both the wallet login handshake and bearer-token checks on
/// protected routes.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Wallet address does not match `0x` + 40 hex characters
    InvalidWalletAddress(String),
    /// No pending challenge matches the wallet and nonce
    InvalidNonce,
    /// The challenge is older than the nonce TTL
    NonceExpired,
    /// Signature bytes could not be parsed or recovered
    MalformedWalletSignature,
    /// Recovered signer differs from the claimed wallet
    SignerMismatch,
    /// Token subject no longer exists
    UserNotFound,
    /// Account was deactivated by an admin
    AccountDeactivated,
    /// Internal error
    InternalError(String),
    /// Insufficient permissions
    InsufficientPermissions,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidWalletAddress(_) => "invalid_wallet_address",
            AuthError::InvalidNonce => "invalid_nonce",
            AuthError::NonceExpired => "nonce_expired",
            AuthError::MalformedWalletSignature => "malformed_wallet_signature",
            AuthError::SignerMismatch => "signer_mismatch",
            AuthError::UserNotFound => "user_not_found",
            AuthError::AccountDeactivated => "account_deactivated",
            AuthError::InternalError(_) => "internal_error",
            AuthError::InsufficientPermissions => "insufficient_permissions",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidWalletAddress(_) => StatusCode::BAD_REQUEST,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidWalletAddress(addr) => write!(f, "Invalid wallet address: {addr}"),
            AuthError::InvalidNonce => write!(f, "Invalid or already used nonce"),
            AuthError::NonceExpired => write!(f, "Nonce has expired, request a new one"),
            AuthError::MalformedWalletSignature => write!(f, "Wallet signature is malformed"),
            AuthError::SignerMismatch => {
                write!(f, "Signature was not produced by the given wallet")
            }
            AuthError::UserNotFound => write!(f, "User no longer exists"),
            AuthError::AccountDeactivated => write!(f, "Account is deactivated"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage failure during authentication");
        AuthError::InternalError("storage unavailable".into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
