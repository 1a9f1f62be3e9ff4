// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - User directory, role assignment and (de)activation
//! - Teacher subject assignments
//! - Credential listing and revocation
//! - System statistics and the pinning-service probe

use std::sync::LazyLock;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{AdminOnly, Role},
    error::ApiError,
    ipfs::PinnedItem,
    issuance::{revoke_credential as revoke_stored_credential, RevokeCredentialRequest},
    models::{
        require_non_empty, validate_academic_year, validate_object_id, validate_semester,
        SuccessResponse, WalletAddress,
    },
    notify::{notify_user, Notice},
    state::AppState,
    storage::{
        new_object_id, AnchorStatus, CredentialFilter, CredentialRepository, NotificationType,
        StoredCredential, StoredTeacherSubject, TeacherSubjectRepository, UserRepository,
        UserResponse,
    },
};

/// Pins listed by the IPFS status probe.
const RECENT_PIN_LIMIT: u32 = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Only users with this role
    pub role: Option<Role>,
    /// Skip deactivated accounts
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

/// Assign a subject to a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignSubjectRequest {
    pub teacher_address: String,
    /// Stored upper-cased, e.g. `MATH101`
    pub subject_code: String,
    pub subject_name: String,
    /// `YYYY-YYYY`
    pub academic_year: String,
    /// 1 to 8
    pub semester: i64,
    #[serde(default)]
    pub batches: Vec<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TeacherSubjectQuery {
    /// Only assignments held by this teacher
    pub teacher_address: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CredentialQuery {
    pub student_address: Option<String>,
    pub teacher_address: Option<String>,
    pub subject: Option<String>,
    /// Anchor status: `pending`, `confirmed` or `failed`
    pub status: Option<AnchorStatus>,
    pub is_revoked: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub teachers: usize,
    pub students: usize,
    pub inactive: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub revoked: usize,
}

/// System statistics response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatsResponse {
    pub users: UserStats,
    pub credentials: CredentialStats,
    /// Active teacher subject assignments
    pub active_subject_assignments: usize,
    /// Whether the chain gateway is configured
    pub blockchain_configured: bool,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

/// Pinning-service probe.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpfsStatusResponse {
    /// API keys are present
    pub configured: bool,
    /// The pinning service accepted the keys
    pub authenticated: bool,
    /// Gateways tried in order when fetching content
    pub gateways: Vec<String>,
    /// Most recent pins, empty unless authenticated
    pub recent_pins: Vec<PinnedItem>,
}

// ============================================================================
// Server start time (for uptime calculation)
// ============================================================================

static SERVER_START: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Pin the uptime origin. Called once at startup.
pub fn init_server_start_time() {
    LazyLock::force(&SERVER_START);
}

fn parse_wallet(raw: &str) -> Result<String, ApiError> {
    Ok(WalletAddress::parse(raw)?.into())
}

// ============================================================================
// Users
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "Admin",
    params(UserListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list(query.role, query.active_only)?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/admin/users/{wallet}",
    tag = "Admin",
    params(("wallet" = String, Path, description = "Wallet address")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 400, description = "Malformed wallet address"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    AdminOnly(_admin): AdminOnly,
    Path(wallet): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let user = UserRepository::new(&state.db).get_by_wallet(&wallet)?;
    Ok(Json(user.into()))
}

/// Assign a role.
///
/// Records the matching contract role name on the user. On-chain roles are
/// granted separately through the blockchain endpoints.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{wallet}/role",
    tag = "Admin",
    params(("wallet" = String, Path, description = "Wallet address")),
    request_body = UpdateRoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Malformed address or self-demotion"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    AdminOnly(admin): AdminOnly,
    Path(wallet): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let users = UserRepository::new(&state.db);
    let target = users.get_by_wallet(&wallet)?;

    if target.id == admin.user_id && request.role != Role::Admin {
        return Err(ApiError::bad_request("Admins cannot change their own role"));
    }

    let updated = users.set_role(&target.id, request.role)?;
    tracing::info!(
        admin = %admin.wallet_address,
        wallet = %updated.wallet_address,
        from = %target.role,
        to = %updated.role,
        "Role assigned"
    );

    let notice = Notice::new(
        NotificationType::RoleAssigned,
        "Role updated",
        format!("Your role is now {}", updated.role),
    )
    .from_sender(&admin.did)
    .about("user", &updated.id);
    notify_user(&state.db, &updated, &notice);

    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/v1/admin/users/{wallet}/status",
    tag = "Admin",
    params(("wallet" = String, Path, description = "Wallet address")),
    request_body = UpdateStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Malformed address or self-deactivation"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_status(
    AdminOnly(admin): AdminOnly,
    Path(wallet): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let users = UserRepository::new(&state.db);
    let target = users.get_by_wallet(&wallet)?;

    if target.id == admin.user_id && !request.is_active {
        return Err(ApiError::bad_request("Admins cannot deactivate themselves"));
    }

    let updated = users.set_active(&target.id, request.is_active)?;
    tracing::info!(
        admin = %admin.wallet_address,
        wallet = %updated.wallet_address,
        is_active = updated.is_active,
        "Account status changed"
    );

    let notice = Notice::new(
        NotificationType::AccountStatusChanged,
        "Account status changed",
        if updated.is_active {
            "Your account has been activated"
        } else {
            "Your account has been deactivated"
        },
    )
    .from_sender(&admin.did)
    .about("user", &updated.id);
    notify_user(&state.db, &updated, &notice);

    Ok(Json(updated.into()))
}

// ============================================================================
// Teacher Subjects
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/teacher-subjects",
    tag = "Admin",
    params(TeacherSubjectQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Active assignments", body = [StoredTeacherSubject]))
)]
pub async fn list_teacher_subjects(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<TeacherSubjectQuery>,
) -> Result<Json<Vec<StoredTeacherSubject>>, ApiError> {
    let teacher = query.teacher_address.as_deref().map(parse_wallet).transpose()?;
    let assignments = TeacherSubjectRepository::new(&state.db).list_active(teacher.as_deref())?;
    Ok(Json(assignments))
}

/// Assign a subject to a teacher.
///
/// The target must hold the TEACHER role. An active assignment for the same
/// teacher, subject code, year and semester is a conflict.
#[utoipa::path(
    post,
    path = "/v1/admin/teacher-subjects",
    tag = "Admin",
    request_body = AssignSubjectRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Assignment created", body = StoredTeacherSubject),
        (status = 400, description = "Invalid input or target is not a teacher"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Assignment already exists")
    )
)]
pub async fn assign_teacher_subject(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<AssignSubjectRequest>,
) -> Result<(StatusCode, Json<StoredTeacherSubject>), ApiError> {
    let teacher_address = parse_wallet(&request.teacher_address)?;
    let subject_code = require_non_empty(&request.subject_code, "subjectCode")?.to_ascii_uppercase();
    let subject_name = require_non_empty(&request.subject_name, "subjectName")?;
    let academic_year = validate_academic_year(&request.academic_year)?;
    let semester = validate_semester(request.semester)?;

    let users = UserRepository::new(&state.db);
    let teacher = users.get_by_wallet(&teacher_address)?;
    if teacher.role != Role::Teacher {
        return Err(ApiError::bad_request("User is not a teacher"));
    }

    let now = Utc::now();
    let assignment = TeacherSubjectRepository::new(&state.db).assign(StoredTeacherSubject {
        id: new_object_id(),
        teacher_address: teacher.wallet_address.clone(),
        teacher_did: teacher.did.clone(),
        subject_code,
        subject_name,
        academic_year,
        semester,
        batches: request.batches,
        assigned_by: admin.did.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    })?;
    let teacher = users.add_assigned_subject(&teacher.id, &assignment.subject_code)?;

    tracing::info!(
        admin = %admin.wallet_address,
        teacher = %teacher.wallet_address,
        subject = %assignment.subject_code,
        assignment_id = %assignment.id,
        "Subject assigned"
    );

    let notice = Notice::new(
        NotificationType::SubjectAssigned,
        "Subject assigned",
        format!(
            "You have been assigned {} ({}) for {} semester {}",
            assignment.subject_name, assignment.subject_code, assignment.academic_year, assignment.semester
        ),
    )
    .from_sender(&admin.did)
    .about("teacher_subject", &assignment.id);
    notify_user(&state.db, &teacher, &notice);

    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/teacher-subjects/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Assignment id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assignment deactivated", body = StoredTeacherSubject),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_teacher_subject(
    AdminOnly(admin): AdminOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredTeacherSubject>, ApiError> {
    let id = validate_object_id(&id)?;
    let assignment = TeacherSubjectRepository::new(&state.db).deactivate(id)?;

    let users = UserRepository::new(&state.db);
    // The teacher may hold the same code for another year or semester
    let still_assigned = TeacherSubjectRepository::new(&state.db)
        .list_active(Some(&assignment.teacher_address))?
        .iter()
        .any(|a| a.subject_code == assignment.subject_code);

    match users.find_by_wallet(&assignment.teacher_address)? {
        Some(teacher) => {
            let teacher = if still_assigned {
                teacher
            } else {
                users.remove_assigned_subject(&teacher.id, &assignment.subject_code)?
            };
            let notice = Notice::new(
                NotificationType::SubjectRemoved,
                "Subject removed",
                format!(
                    "Your assignment for {} ({}) has been removed",
                    assignment.subject_name, assignment.subject_code
                ),
            )
            .from_sender(&admin.did)
            .about("teacher_subject", &assignment.id);
            notify_user(&state.db, &teacher, &notice);
        }
        None => tracing::warn!(teacher = %assignment.teacher_address, "Assignment teacher no longer exists"),
    }

    tracing::info!(
        admin = %admin.wallet_address,
        assignment_id = %assignment.id,
        subject = %assignment.subject_code,
        "Subject assignment removed"
    );
    Ok(Json(assignment))
}

// ============================================================================
// Credentials
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/credentials",
    tag = "Admin",
    params(CredentialQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Credentials, newest first", body = [StoredCredential]))
)]
pub async fn list_credentials(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<Vec<StoredCredential>>, ApiError> {
    let filter = CredentialFilter {
        student_address: query.student_address.as_deref().map(parse_wallet).transpose()?,
        teacher_address: query.teacher_address.as_deref().map(parse_wallet).transpose()?,
        subject: query.subject,
        status: query.status,
        is_revoked: query.is_revoked,
    };
    Ok(Json(CredentialRepository::new(&state.db).list(&filter)?))
}

/// Revoke a credential.
///
/// With `revokeOnChain` the contract revoke runs first and the stored
/// credential is only revoked if that call succeeds.
#[utoipa::path(
    post,
    path = "/v1/admin/credentials/{id}/revoke",
    tag = "Admin",
    params(("id" = String, Path, description = "Credential id")),
    request_body = RevokeCredentialRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Revoked credential", body = StoredCredential),
        (status = 404, description = "Credential not found"),
        (status = 409, description = "Credential already revoked, or its on-chain slot holds another credential"),
        (status = 502, description = "On-chain revocation failed")
    )
)]
pub async fn revoke_credential(
    AdminOnly(admin): AdminOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RevokeCredentialRequest>,
) -> Result<Json<StoredCredential>, ApiError> {
    let id = validate_object_id(&id)?;
    let revoked =
        revoke_stored_credential(&state.db, state.registry(), &admin, id, &request, Utc::now()).await?;
    Ok(Json(revoked))
}

/// Ask the pinning service to pin a credential's existing CID again.
#[utoipa::path(
    post,
    path = "/v1/admin/credentials/{id}/repin",
    tag = "Admin",
    params(("id" = String, Path, description = "Credential id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pin requested", body = SuccessResponse),
        (status = 404, description = "Credential not found or never pinned"),
        (status = 502, description = "Pinning service failure")
    )
)]
pub async fn repin_credential(
    AdminOnly(admin): AdminOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = validate_object_id(&id)?;
    let credential = CredentialRepository::new(&state.db).get(id)?;
    let cid = credential
        .ipfs_hash
        .ok_or_else(|| ApiError::not_found("Credential has not been pinned to IPFS"))?;

    state
        .ipfs
        .pin_by_hash(&cid, &format!("credential-{}.json", credential.id))
        .await?;
    tracing::info!(admin = %admin.wallet_address, credential_id = %credential.id, cid = %cid, "Credential re-pinned");
    Ok(Json(SuccessResponse::ok(format!("Pin requested for {cid}"))))
}

// ============================================================================
// Operations
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "System statistics", body = SystemStatsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn get_system_stats(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<SystemStatsResponse>, ApiError> {
    let all_users = UserRepository::new(&state.db).list(None, false)?;
    let mut users = UserStats {
        total: all_users.len(),
        ..Default::default()
    };
    for user in &all_users {
        match user.role {
            Role::Admin => users.admins += 1,
            Role::Teacher => users.teachers += 1,
            Role::Student => users.students += 1,
        }
        if !user.is_active {
            users.inactive += 1;
        }
    }

    let all_credentials = CredentialRepository::new(&state.db).list(&CredentialFilter::default())?;
    let mut credentials = CredentialStats {
        total: all_credentials.len(),
        ..Default::default()
    };
    for credential in &all_credentials {
        match credential.blockchain_status {
            AnchorStatus::Pending => credentials.pending += 1,
            AnchorStatus::Confirmed => credentials.confirmed += 1,
            AnchorStatus::Failed => credentials.failed += 1,
        }
        if credential.is_revoked {
            credentials.revoked += 1;
        }
    }

    let active_subject_assignments = TeacherSubjectRepository::new(&state.db).list_active(None)?.len();

    Ok(Json(SystemStatsResponse {
        users,
        credentials,
        active_subject_assignments,
        blockchain_configured: state.chain.is_some(),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/ipfs/status",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Pinning-service status", body = IpfsStatusResponse))
)]
pub async fn ipfs_status(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Json<IpfsStatusResponse> {
    let configured = state.ipfs.is_configured();
    let authenticated = configured && state.ipfs.test_connection().await;
    let recent_pins = if authenticated {
        state.ipfs.list_pins(RECENT_PIN_LIMIT).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list pins");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    Json(IpfsStatusResponse {
        configured,
        authenticated,
        gateways: state.ipfs.gateways().to_vec(),
        recent_pins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::state::test_support::{test_state, user_with_role};
    use crate::storage::repository::credentials::tests::sample_credential;
    use crate::storage::{NotificationRepository, StoredUser};

    const ADMIN: &str = "0x9999999999999999999999999999999999999999";
    const TEACHER: &str = "0x2222222222222222222222222222222222222222";
    const STUDENT: &str = "0x1111111111111111111111111111111111111111";

    fn admin_of(user: &StoredUser) -> AdminOnly {
        AdminOnly(AuthenticatedUser::from_user(user))
    }

    fn assign_request(teacher: &str) -> AssignSubjectRequest {
        AssignSubjectRequest {
            teacher_address: teacher.into(),
            subject_code: "math101".into(),
            subject_name: "Mathematics".into(),
            academic_year: "2024-2025".into(),
            semester: 1,
            batches: vec!["CS-A".into()],
        }
    }

    #[test]
    fn system_stats_response_serializes_camel_case() {
        let response = SystemStatsResponse {
            users: UserStats::default(),
            credentials: CredentialStats::default(),
            active_subject_assignments: 2,
            blockchain_configured: false,
            uptime_seconds: 3600,
            timestamp: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["activeSubjectAssignments"], 2);
        assert_eq!(json["uptimeSeconds"], 3600);
        assert_eq!(json["credentials"]["revoked"], 0);
    }

    #[tokio::test]
    async fn role_assignment_records_chain_role_and_notifies() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let (student, _) = user_with_role(&state, STUDENT, Role::Student);

        let Json(updated) = update_user_role(
            admin_of(&admin),
            Path(STUDENT.into()),
            State(state.clone()),
            Json(UpdateRoleRequest { role: Role::Teacher }),
        )
        .await
        .unwrap();
        assert_eq!(updated.role, Role::Teacher);
        assert_eq!(updated.blockchain_role.as_deref(), Some("TEACHER_ROLE"));

        let inbox = NotificationRepository::new(&state.db)
            .list_for_recipient(&student.wallet_address, false, None)
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::RoleAssigned);
    }

    #[tokio::test]
    async fn admin_cannot_demote_or_deactivate_self() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);

        let err = update_user_role(
            admin_of(&admin),
            Path(ADMIN.into()),
            State(state.clone()),
            Json(UpdateRoleRequest { role: Role::Student }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = update_user_status(
            admin_of(&admin),
            Path(ADMIN.into()),
            State(state.clone()),
            Json(UpdateStatusRequest { is_active: false }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let stored = UserRepository::new(&state.db).get(&admin.id).unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn deactivation_notifies_user() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let (student, _) = user_with_role(&state, STUDENT, Role::Student);

        let Json(updated) = update_user_status(
            admin_of(&admin),
            Path(STUDENT.into()),
            State(state.clone()),
            Json(UpdateStatusRequest { is_active: false }),
        )
        .await
        .unwrap();
        assert!(!updated.is_active);

        let Json(active) = list_users(
            admin_of(&admin),
            State(state.clone()),
            Query(UserListQuery {
                role: None,
                active_only: true,
            }),
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].wallet_address, ADMIN);

        let inbox = NotificationRepository::new(&state.db)
            .list_for_recipient(&student.wallet_address, false, None)
            .unwrap();
        assert_eq!(inbox[0].notification_type, NotificationType::AccountStatusChanged);
    }

    #[tokio::test]
    async fn get_user_rejects_malformed_wallet() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let err = get_user(admin_of(&admin), Path("0x123".into()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = get_user(admin_of(&admin), Path(TEACHER.into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subject_assignment_requires_teacher() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        user_with_role(&state, STUDENT, Role::Student);

        let err = assign_teacher_subject(admin_of(&admin), State(state.clone()), Json(assign_request(STUDENT)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(TeacherSubjectRepository::new(&state.db)
            .list_active(None)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn subject_assignment_lifecycle() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);

        let (status, Json(assignment)) =
            assign_teacher_subject(admin_of(&admin), State(state.clone()), Json(assign_request(TEACHER)))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(assignment.subject_code, "MATH101");
        assert_eq!(assignment.assigned_by, admin.did);

        let users = UserRepository::new(&state.db);
        assert_eq!(users.get(&teacher.id).unwrap().assigned_subjects, vec!["MATH101"]);

        let err = assign_teacher_subject(admin_of(&admin), State(state.clone()), Json(assign_request(TEACHER)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let Json(listed) = list_teacher_subjects(
            admin_of(&admin),
            State(state.clone()),
            Query(TeacherSubjectQuery {
                teacher_address: Some(TEACHER.into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);

        let Json(removed) = remove_teacher_subject(admin_of(&admin), Path(assignment.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert!(!removed.is_active);
        assert!(users.get(&teacher.id).unwrap().assigned_subjects.is_empty());

        let err = remove_teacher_subject(admin_of(&admin), Path(assignment.id), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let kinds: Vec<_> = NotificationRepository::new(&state.db)
            .list_for_recipient(&teacher.wallet_address, false, None)
            .unwrap()
            .into_iter()
            .map(|n| n.notification_type)
            .collect();
        assert!(kinds.contains(&NotificationType::SubjectAssigned));
        assert!(kinds.contains(&NotificationType::SubjectRemoved));
    }

    #[tokio::test]
    async fn second_revoke_conflicts_and_changes_nothing() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        user_with_role(&state, STUDENT, Role::Student);
        let credential = sample_credential(&"ab".repeat(32));
        CredentialRepository::new(&state.db).create(&credential).unwrap();

        let request = RevokeCredentialRequest {
            reason: Some("Grading error".into()),
            revoke_on_chain: false,
        };
        let Json(revoked) = revoke_credential(
            admin_of(&admin),
            Path(credential.id.clone()),
            State(state.clone()),
            Json(request.clone()),
        )
        .await
        .unwrap();
        assert!(revoked.is_revoked);

        let err = revoke_credential(
            admin_of(&admin),
            Path(credential.id.clone()),
            State(state.clone()),
            Json(request),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let stored = CredentialRepository::new(&state.db).get(&credential.id).unwrap();
        assert_eq!(stored.revoked_at, revoked.revoked_at);
        assert_eq!(stored.revocation_reason.as_deref(), Some("Grading error"));
    }

    #[tokio::test]
    async fn on_chain_revoke_without_gateway_leaves_row_untouched() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let credential = sample_credential(&"cd".repeat(32));
        CredentialRepository::new(&state.db).create(&credential).unwrap();

        let err = revoke_credential(
            admin_of(&admin),
            Path(credential.id.clone()),
            State(state.clone()),
            Json(RevokeCredentialRequest {
                reason: None,
                revoke_on_chain: true,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(!CredentialRepository::new(&state.db).get(&credential.id).unwrap().is_revoked);
    }

    #[tokio::test]
    async fn stats_count_roles_and_statuses() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        user_with_role(&state, TEACHER, Role::Teacher);
        user_with_role(&state, STUDENT, Role::Student);

        let repo = CredentialRepository::new(&state.db);
        repo.create(&sample_credential(&"01".repeat(32))).unwrap();
        let mut revoked = sample_credential(&"02".repeat(32));
        revoked.is_revoked = true;
        revoked.blockchain_status = AnchorStatus::Failed;
        repo.create(&revoked).unwrap();

        let Json(stats) = get_system_stats(admin_of(&admin), State(state)).await.unwrap();
        assert_eq!(
            stats.users,
            UserStats {
                total: 3,
                admins: 1,
                teachers: 1,
                students: 1,
                inactive: 0,
            }
        );
        assert_eq!(
            stats.credentials,
            CredentialStats {
                total: 2,
                pending: 1,
                confirmed: 0,
                failed: 1,
                revoked: 1,
            }
        );
        assert!(!stats.blockchain_configured);
    }

    #[tokio::test]
    async fn repin_requires_pinned_credential() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let credential = sample_credential(&"ef".repeat(32));
        CredentialRepository::new(&state.db).create(&credential).unwrap();

        let err = repin_credential(admin_of(&admin), Path(credential.id), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ipfs_status_without_keys() {
        let (state, _jobs) = test_state();
        let (admin, _) = user_with_role(&state, ADMIN, Role::Admin);
        let Json(status) = ipfs_status(admin_of(&admin), State(state)).await;
        assert!(!status.configured);
        assert!(!status.authenticated);
        assert!(status.recent_pins.is_empty());
    }
}
