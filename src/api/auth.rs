// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{
        wallet::{generate_nonce, verify_signature, LoginSession, NonceChallenge, VerifySignatureRequest},
        AuthError,
    },
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub wallet_address: String,
}

/// Request a login challenge.
///
/// Registers the wallet as a STUDENT on first contact.
#[utoipa::path(
    post,
    path = "/v1/auth/nonce",
    tag = "Auth",
    request_body = NonceRequest,
    responses(
        (status = 200, description = "Challenge to sign", body = NonceChallenge),
        (status = 400, description = "Malformed wallet address")
    )
)]
pub async fn request_nonce(
    State(state): State<AppState>,
    Json(request): Json<NonceRequest>,
) -> Result<Json<NonceChallenge>, AuthError> {
    generate_nonce(&state.db, &request.wallet_address).map(Json)
}

/// Exchange a signed challenge for a session token.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifySignatureRequest,
    responses(
        (status = 200, description = "Session started", body = LoginSession),
        (status = 400, description = "Malformed wallet address"),
        (status = 401, description = "Invalid nonce or signature")
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifySignatureRequest>,
) -> Result<Json<LoginSession>, AuthError> {
    verify_signature(&state.db, &state.tokens, &request, Utc::now()).map(Json)
}
