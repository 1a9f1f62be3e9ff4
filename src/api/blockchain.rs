// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Direct contract operations for admins.
//!
//! Writes answer 200 with `{success, transactionHash?, error?}`; gateway
//! failures are reported in-band. Malformed input is still a 400. Reads map
//! gateway failures to 502.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AdminOnly,
    blockchain::{role_id, OnChainCredential},
    error::ApiError,
    models::{require_non_empty, BlockchainOpResponse, WalletAddress},
    state::AppState,
    storage::UserRepository,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Grant or revoke a contract role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    /// `ADMIN`, `TEACHER`, `STUDENT` (with or without `_ROLE`) or `DEFAULT_ADMIN_ROLE`
    pub role: String,
    pub account: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDidRequest {
    pub wallet_address: String,
    /// Defaults to `did:ethr:<wallet>`
    #[serde(default)]
    pub did: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequest {
    pub teacher_address: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainRevokeRequest {
    pub student_address: String,
    pub subject: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HasRoleQuery {
    pub role: String,
    pub account: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CredentialRecordQuery {
    pub student_address: String,
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HasRoleResponse {
    pub role: String,
    pub account: String,
    pub has_role: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidResponse {
    pub wallet_address: String,
    /// Empty when nothing is registered
    pub did: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSubjectsResponse {
    pub teacher_address: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecordResponse {
    /// False when the contract returned a zeroed record
    pub exists: bool,
    pub record: OnChainCredential,
}

fn parse_wallet(raw: &str) -> Result<String, ApiError> {
    Ok(WalletAddress::parse(raw)?.into())
}

/// Reject unknown role names before touching the gateway.
fn check_role(role: &str) -> Result<(), ApiError> {
    role_id(role)?;
    Ok(())
}

// ============================================================================
// Writes
// ============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/grant-role",
    tag = "Blockchain",
    request_body = RoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed address or unknown role")
    )
)]
pub async fn grant_role(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    check_role(&request.role)?;
    let account = parse_wallet(&request.account)?;

    let result = match state.chain() {
        Ok(chain) => chain.grant_role(&request.role, &account).await,
        Err(e) => Err(e),
    };
    tracing::info!(admin = %admin.wallet_address, role = %request.role, account = %account, ok = result.is_ok(), "grantRole");
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/revoke-role",
    tag = "Blockchain",
    request_body = RoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed address or unknown role")
    )
)]
pub async fn revoke_role(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    check_role(&request.role)?;
    let account = parse_wallet(&request.account)?;

    let result = match state.chain() {
        Ok(chain) => chain.revoke_role(&request.role, &account).await,
        Err(e) => Err(e),
    };
    tracing::info!(admin = %admin.wallet_address, role = %request.role, account = %account, ok = result.is_ok(), "revokeRole");
    Ok(Json(result.into()))
}

/// Register a DID on-chain and flag the user as registered on success.
#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/register-did",
    tag = "Blockchain",
    request_body = RegisterDidRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed address")
    )
)]
pub async fn register_did(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RegisterDidRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    let wallet = WalletAddress::parse(&request.wallet_address)?;
    let did = match request.did.as_deref() {
        Some(did) => require_non_empty(did, "did")?,
        None => wallet.did(),
    };

    let result = match state.chain() {
        Ok(chain) => chain.register_did(wallet.as_str(), &did).await,
        Err(e) => Err(e),
    };

    if result.is_ok() {
        match UserRepository::new(&state.db).mark_did_registered(wallet.as_str()) {
            Ok(true) => {}
            Ok(false) => tracing::debug!(wallet = %wallet, "DID registered for unknown user"),
            Err(e) => tracing::warn!(wallet = %wallet, error = %e, "Failed to flag DID registration"),
        }
    }
    tracing::info!(admin = %admin.wallet_address, wallet = %wallet, ok = result.is_ok(), "registerDID");
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/assign-subject",
    tag = "Blockchain",
    request_body = SubjectRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed input")
    )
)]
pub async fn assign_subject(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<SubjectRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    let teacher = parse_wallet(&request.teacher_address)?;
    let subject = require_non_empty(&request.subject, "subject")?;

    let result = match state.chain() {
        Ok(chain) => chain.assign_subject_to_teacher(&teacher, &subject).await,
        Err(e) => Err(e),
    };
    tracing::info!(admin = %admin.wallet_address, teacher = %teacher, subject = %subject, ok = result.is_ok(), "assignSubjectToTeacher");
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/remove-subject",
    tag = "Blockchain",
    request_body = SubjectRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed input")
    )
)]
pub async fn remove_subject(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<SubjectRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    let teacher = parse_wallet(&request.teacher_address)?;
    let subject = require_non_empty(&request.subject, "subject")?;

    let result = match state.chain() {
        Ok(chain) => chain.remove_subject_from_teacher(&teacher, &subject).await,
        Err(e) => Err(e),
    };
    tracing::info!(admin = %admin.wallet_address, teacher = %teacher, subject = %subject, ok = result.is_ok(), "removeSubjectFromTeacher");
    Ok(Json(result.into()))
}

/// Revoke a credential on-chain only. The stored credential is not touched.
#[utoipa::path(
    post,
    path = "/v1/admin/blockchain/revoke-credential",
    tag = "Blockchain",
    request_body = ChainRevokeRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operation result", body = BlockchainOpResponse),
        (status = 400, description = "Malformed input")
    )
)]
pub async fn revoke_credential(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<ChainRevokeRequest>,
) -> Result<Json<BlockchainOpResponse>, ApiError> {
    let student = parse_wallet(&request.student_address)?;
    let subject = require_non_empty(&request.subject, "subject")?;

    let result = match state.chain() {
        Ok(chain) => chain.revoke_credential(&student, &subject).await,
        Err(e) => Err(e),
    };
    tracing::info!(admin = %admin.wallet_address, student = %student, subject = %subject, ok = result.is_ok(), "revokeCredential");
    Ok(Json(result.into()))
}

// ============================================================================
// Reads
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/blockchain/has-role",
    tag = "Blockchain",
    params(HasRoleQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = HasRoleResponse),
        (status = 400, description = "Malformed address or unknown role"),
        (status = 502, description = "Blockchain unavailable")
    )
)]
pub async fn has_role(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<HasRoleQuery>,
) -> Result<Json<HasRoleResponse>, ApiError> {
    check_role(&query.role)?;
    let account = parse_wallet(&query.account)?;
    let has_role = state.chain()?.has_role(&query.role, &account).await?;
    Ok(Json(HasRoleResponse {
        role: query.role,
        account,
        has_role,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/blockchain/did/{wallet}",
    tag = "Blockchain",
    params(("wallet" = String, Path, description = "Wallet address")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DidResponse),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "Blockchain unavailable")
    )
)]
pub async fn get_did(
    AdminOnly(_admin): AdminOnly,
    Path(wallet): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DidResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let did = state.chain()?.get_did(&wallet).await?;
    Ok(Json(DidResponse {
        wallet_address: wallet,
        did,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/blockchain/teacher-subjects/{wallet}",
    tag = "Blockchain",
    params(("wallet" = String, Path, description = "Teacher wallet address")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = TeacherSubjectsResponse),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "Blockchain unavailable")
    )
)]
pub async fn get_teacher_subjects(
    AdminOnly(_admin): AdminOnly,
    Path(wallet): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TeacherSubjectsResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let subjects = state.chain()?.get_teacher_subjects(&wallet).await?;
    Ok(Json(TeacherSubjectsResponse {
        teacher_address: wallet,
        subjects,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/blockchain/credential",
    tag = "Blockchain",
    params(CredentialRecordQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = CredentialRecordResponse),
        (status = 400, description = "Malformed input"),
        (status = 502, description = "Blockchain unavailable")
    )
)]
pub async fn get_credential_record(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<CredentialRecordQuery>,
) -> Result<Json<CredentialRecordResponse>, ApiError> {
    let student = parse_wallet(&query.student_address)?;
    let subject = require_non_empty(&query.subject, "subject")?;
    let record = state
        .chain()?
        .get_student_subject_credential(&student, &subject)
        .await?;
    Ok(Json(CredentialRecordResponse {
        exists: record.exists(),
        record,
    }))
}
