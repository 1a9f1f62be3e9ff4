// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unauthenticated credential verification.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError,
    issuance::{verify_by_hash, verify_credential, VerificationReport},
    models::validate_object_id,
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/public/credentials/{id}/verify",
    tag = "Public",
    params(("id" = String, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Verification result", body = VerificationReport),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Credential not found")
    )
)]
pub async fn verify_credential_by_id(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VerificationReport>, ApiError> {
    let id = validate_object_id(&id)?;
    verify_credential(&state.db, state.registry(), id).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/v1/public/credentials/hash/{vc_hash}",
    tag = "Public",
    params(("vc_hash" = String, Path, description = "SHA-256 hex of the canonical credential, with or without 0x")),
    responses(
        (status = 200, description = "Verification result", body = VerificationReport),
        (status = 404, description = "No credential with this hash")
    )
)]
pub async fn verify_credential_by_hash(
    Path(vc_hash): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VerificationReport>, ApiError> {
    verify_by_hash(&state.db, state.registry(), &vc_hash).await.map(Json)
}
