// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        wallet::{LoginSession, NonceChallenge, VerifySignatureRequest},
        Role,
    },
    blockchain::OnChainCredential,
    ipfs::PinnedItem,
    issuance::{
        IssueCredentialRequest, IssueCredentialResponse, OnChainVerification,
        RevokeCredentialRequest, VerificationReport,
    },
    models::{BlockchainOpResponse, SuccessResponse},
    state::AppState,
    storage::{
        AnchorStatus, ExamScheduleUpdate, ExamStatus, NotificationType, ProfileUpdate,
        RelatedEntity, StoredCredential, StoredExamSchedule, StoredNotification,
        StoredTeacherSubject, UserResponse,
    },
};

pub mod admin;
pub mod auth;
pub mod blockchain;
pub mod health;
pub mod notifications;
pub mod public;
pub mod student;
pub mod teacher;
pub mod users;

/// Build the HTTP application.
///
/// `cors_origins` empty means any origin is allowed.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let v1_routes = Router::new()
        // Auth & public verification
        .route("/auth/nonce", post(auth::request_nonce))
        .route("/auth/verify", post(auth::verify))
        .route(
            "/public/credentials/{id}/verify",
            get(public::verify_credential_by_id),
        )
        .route(
            "/public/credentials/hash/{vc_hash}",
            get(public::verify_credential_by_hash),
        )
        // Current user
        .route(
            "/users/me",
            get(users::get_current_user).put(users::update_current_user),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification),
        )
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{wallet}", get(admin::get_user))
        .route("/admin/users/{wallet}/role", put(admin::update_user_role))
        .route("/admin/users/{wallet}/status", put(admin::update_user_status))
        .route(
            "/admin/teacher-subjects",
            get(admin::list_teacher_subjects).post(admin::assign_teacher_subject),
        )
        .route(
            "/admin/teacher-subjects/{id}",
            delete(admin::remove_teacher_subject),
        )
        .route("/admin/credentials", get(admin::list_credentials))
        .route(
            "/admin/credentials/{id}/revoke",
            post(admin::revoke_credential),
        )
        .route(
            "/admin/credentials/{id}/repin",
            post(admin::repin_credential),
        )
        .route("/admin/stats", get(admin::get_system_stats))
        .route("/admin/ipfs/status", get(admin::ipfs_status))
        // Admin: direct contract operations
        .route("/admin/blockchain/grant-role", post(blockchain::grant_role))
        .route("/admin/blockchain/revoke-role", post(blockchain::revoke_role))
        .route(
            "/admin/blockchain/register-did",
            post(blockchain::register_did),
        )
        .route(
            "/admin/blockchain/assign-subject",
            post(blockchain::assign_subject),
        )
        .route(
            "/admin/blockchain/remove-subject",
            post(blockchain::remove_subject),
        )
        .route(
            "/admin/blockchain/revoke-credential",
            post(blockchain::revoke_credential),
        )
        .route("/admin/blockchain/has-role", get(blockchain::has_role))
        .route("/admin/blockchain/did/{wallet}", get(blockchain::get_did))
        .route(
            "/admin/blockchain/teacher-subjects/{wallet}",
            get(blockchain::get_teacher_subjects),
        )
        .route(
            "/admin/blockchain/credential",
            get(blockchain::get_credential_record),
        )
        // Teacher
        .route("/teacher/subjects", get(teacher::my_subjects))
        .route("/teacher/students", get(teacher::list_students))
        .route(
            "/teacher/credentials",
            get(teacher::issued_credentials).post(teacher::issue_credential),
        )
        .route(
            "/teacher/exams",
            get(teacher::my_exams).post(teacher::create_exam),
        )
        .route(
            "/teacher/exams/{id}",
            put(teacher::update_exam).delete(teacher::delete_exam),
        )
        // Student
        .route("/student/credentials", get(student::my_credentials))
        .route("/student/credentials/{id}", get(student::get_credential))
        .route(
            "/student/credentials/{id}/ipfs",
            get(student::get_pinned_credential),
        )
        .route("/student/exams", get(student::upcoming_exams))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Adds the session token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from POST /v1/auth/verify"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        auth::request_nonce,
        auth::verify,
        public::verify_credential_by_id,
        public::verify_credential_by_hash,
        users::get_current_user,
        users::update_current_user,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        admin::list_users,
        admin::get_user,
        admin::update_user_role,
        admin::update_user_status,
        admin::list_teacher_subjects,
        admin::assign_teacher_subject,
        admin::remove_teacher_subject,
        admin::list_credentials,
        admin::revoke_credential,
        admin::repin_credential,
        admin::get_system_stats,
        admin::ipfs_status,
        blockchain::grant_role,
        blockchain::revoke_role,
        blockchain::register_did,
        blockchain::assign_subject,
        blockchain::remove_subject,
        blockchain::revoke_credential,
        blockchain::has_role,
        blockchain::get_did,
        blockchain::get_teacher_subjects,
        blockchain::get_credential_record,
        teacher::my_subjects,
        teacher::list_students,
        teacher::issue_credential,
        teacher::issued_credentials,
        teacher::create_exam,
        teacher::my_exams,
        teacher::update_exam,
        teacher::delete_exam,
        student::my_credentials,
        student::get_credential,
        student::get_pinned_credential,
        student::upcoming_exams,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Role,
            auth::NonceRequest,
            NonceChallenge,
            VerifySignatureRequest,
            LoginSession,
            UserResponse,
            ProfileUpdate,
            StoredNotification,
            NotificationType,
            RelatedEntity,
            notifications::UnreadCountResponse,
            notifications::MarkAllReadResponse,
            SuccessResponse,
            BlockchainOpResponse,
            StoredCredential,
            AnchorStatus,
            StoredTeacherSubject,
            StoredExamSchedule,
            ExamStatus,
            ExamScheduleUpdate,
            IssueCredentialRequest,
            IssueCredentialResponse,
            RevokeCredentialRequest,
            VerificationReport,
            OnChainVerification,
            OnChainCredential,
            PinnedItem,
            admin::UpdateRoleRequest,
            admin::UpdateStatusRequest,
            admin::AssignSubjectRequest,
            admin::SystemStatsResponse,
            admin::UserStats,
            admin::CredentialStats,
            admin::IpfsStatusResponse,
            blockchain::RoleRequest,
            blockchain::RegisterDidRequest,
            blockchain::SubjectRequest,
            blockchain::ChainRevokeRequest,
            blockchain::HasRoleResponse,
            blockchain::DidResponse,
            blockchain::TeacherSubjectsResponse,
            blockchain::CredentialRecordResponse,
            teacher::CreateExamRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Wallet signature login"),
        (name = "Public", description = "Unauthenticated credential verification"),
        (name = "Users", description = "Current user profile"),
        (name = "Notifications", description = "Per-user inbox"),
        (name = "Admin", description = "User, assignment and credential administration"),
        (name = "Blockchain", description = "Direct registry contract operations"),
        (name = "Teacher", description = "Issuance and exam scheduling"),
        (name = "Student", description = "Own credentials and upcoming exams"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _jobs) = test_state();
        let app = router(state, &[]);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_route_echoes_request_id() {
        let (state, _jobs) = test_state();
        let response = router(state, &[])
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (state, _jobs) = test_state();
        let response = router(state, &[])
            .oneshot(Request::builder().uri("/v1/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn student_token_cannot_reach_admin_routes() {
        let (state, _jobs) = test_state();
        let (_, token) = crate::state::test_support::user_with_role(
            &state,
            "0x1111111111111111111111111111111111111111",
            crate::auth::Role::Student,
        );
        let response = router(state, &[])
            .oneshot(
                Request::builder()
                    .uri("/v1/admin/stats")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn cors_layer_accepts_explicit_origins() {
        let _ = cors_layer(&["https://markchain.example".to_string()]);
    }

    #[test]
    fn openapi_documents_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/v1/teacher/credentials"));
    }
}
