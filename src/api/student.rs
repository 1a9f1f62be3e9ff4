// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Student endpoints. Credentials owned by someone else read as not found.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{
    auth::StudentOnly,
    error::ApiError,
    models::validate_object_id,
    state::AppState,
    storage::{CredentialRepository, ExamRepository, OwnershipCheck, StoredCredential, StoredExamSchedule},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExamQuery {
    /// Only exams for this subject
    pub subject: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/student/credentials",
    tag = "Student",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Own credentials, newest first", body = [StoredCredential]))
)]
pub async fn my_credentials(
    StudentOnly(student): StudentOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredCredential>>, ApiError> {
    let credentials = CredentialRepository::new(&state.db).list_by_student(&student.wallet_address)?;
    Ok(Json(credentials))
}

#[utoipa::path(
    get,
    path = "/v1/student/credentials/{id}",
    tag = "Student",
    params(("id" = String, Path, description = "Credential id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = StoredCredential),
        (status = 404, description = "Credential not found")
    )
)]
pub async fn get_credential(
    StudentOnly(student): StudentOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredCredential>, ApiError> {
    let id = validate_object_id(&id)?;
    let credential = CredentialRepository::new(&state.db)
        .get(id)
        .verify_owner(&student.wallet_address)?;
    Ok(Json(credential))
}

/// Fetch the pinned credential payload through the IPFS gateways.
#[utoipa::path(
    get,
    path = "/v1/student/credentials/{id}/ipfs",
    tag = "Student",
    params(("id" = String, Path, description = "Credential id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pinned VC document", body = serde_json::Value),
        (status = 404, description = "Credential not found or not pinned yet"),
        (status = 502, description = "No gateway returned the content")
    )
)]
pub async fn get_pinned_credential(
    StudentOnly(student): StudentOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let id = validate_object_id(&id)?;
    let credential = CredentialRepository::new(&state.db)
        .get(id)
        .verify_owner(&student.wallet_address)?;
    let cid = credential
        .ipfs_hash
        .ok_or_else(|| ApiError::not_found("Credential has not been pinned to IPFS"))?;
    let document = state.ipfs.get_credential(&cid).await?;
    Ok(Json(document))
}

#[utoipa::path(
    get,
    path = "/v1/student/exams",
    tag = "Student",
    params(ExamQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Upcoming exams, soonest first", body = [StoredExamSchedule]))
)]
pub async fn upcoming_exams(
    StudentOnly(_student): StudentOnly,
    State(state): State<AppState>,
    Query(query): Query<ExamQuery>,
) -> Result<Json<Vec<StoredExamSchedule>>, ApiError> {
    let exams = ExamRepository::new(&state.db).list_upcoming(Utc::now(), query.subject.as_deref())?;
    Ok(Json(exams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::state::test_support::{test_state, user_with_role};
    use crate::storage::repository::credentials::tests::sample_credential;
    use crate::storage::{new_object_id, ExamStatus};
    use axum::http::StatusCode;
    use chrono::Duration;

    const STUDENT: &str = "0x1111111111111111111111111111111111111111";
    const OTHER: &str = "0x3333333333333333333333333333333333333333";

    fn student_of(state: &AppState, wallet: &str) -> StudentOnly {
        let (user, _) = user_with_role(state, wallet, Role::Student);
        StudentOnly(AuthenticatedUser::from_user(&user))
    }

    fn exam(days_from_now: i64, is_active: bool) -> StoredExamSchedule {
        let now = Utc::now();
        StoredExamSchedule {
            id: new_object_id(),
            subject: "Mathematics".into(),
            exam_type: "final".into(),
            exam_date: now + Duration::days(days_from_now),
            duration_minutes: 120,
            total_marks: 100,
            venue: None,
            instructions: None,
            academic_year: "2024-2025".into(),
            semester: 1,
            status: if is_active {
                ExamStatus::Scheduled
            } else {
                ExamStatus::Cancelled
            },
            teacher_did: "did:ethr:0x2222222222222222222222222222222222222222".into(),
            teacher_address: "0x2222222222222222222222222222222222222222".into(),
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn credentials_are_scoped_to_owner() {
        let (state, _jobs) = test_state();
        let credential = sample_credential(&"ab".repeat(32));
        CredentialRepository::new(&state.db).create(&credential).unwrap();

        let Json(mine) = my_credentials(student_of(&state, STUDENT), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        let Json(fetched) = get_credential(student_of(&state, STUDENT), Path(credential.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(fetched.id, credential.id);

        let err = get_credential(student_of(&state, OTHER), Path(credential.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(theirs) = my_credentials(student_of(&state, OTHER), State(state)).await.unwrap();
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn unpinned_credential_has_no_ipfs_payload() {
        let (state, _jobs) = test_state();
        let credential = sample_credential(&"cd".repeat(32));
        CredentialRepository::new(&state.db).create(&credential).unwrap();

        let err = get_pinned_credential(student_of(&state, STUDENT), Path(credential.id), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upcoming_exams_skip_past_and_cancelled() {
        let (state, _jobs) = test_state();
        let repo = ExamRepository::new(&state.db);
        let soon = exam(3, true);
        repo.create(&soon).unwrap();
        repo.create(&exam(-3, true)).unwrap();
        repo.create(&exam(5, false)).unwrap();

        let Json(exams) = upcoming_exams(
            student_of(&state, STUDENT),
            State(state.clone()),
            Query(ExamQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id, soon.id);

        let Json(none) = upcoming_exams(
            student_of(&state, STUDENT),
            State(state),
            Query(ExamQuery {
                subject: Some("Physics".into()),
            }),
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }
}
