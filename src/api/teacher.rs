// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Teacher endpoints: assignments, student directory, issuance and exams.
//!
//! Credential issuance and exam scheduling both require an active subject
//! assignment. Exams can only be changed by the teacher who created them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{AuthenticatedUser, Role, TeacherOnly},
    error::ApiError,
    issuance::{issue_credential as issue, IssueCredentialRequest, IssueCredentialResponse},
    models::{require_non_empty, validate_academic_year, validate_object_id, validate_semester},
    notify::{notify_active_students, Notice},
    state::AppState,
    storage::{
        new_object_id, CredentialRepository, ExamRepository, ExamScheduleUpdate, ExamStatus,
        NotificationType, OwnershipCheck, StoredCredential, StoredExamSchedule,
        StoredTeacherSubject, TeacherSubjectRepository, UserRepository, UserResponse,
    },
};

/// Schedule a new exam.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    pub subject: String,
    pub exam_type: String,
    pub exam_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub total_marks: u32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// `YYYY-YYYY`
    pub academic_year: String,
    /// 1 to 8
    pub semester: i64,
}

fn require_assignment(state: &AppState, teacher: &AuthenticatedUser, subject: &str) -> Result<(), ApiError> {
    if TeacherSubjectRepository::new(&state.db).is_teacher_assigned(&teacher.wallet_address, subject)? {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("Not assigned to subject {subject}")))
    }
}

fn exam_notice(kind: NotificationType, title: &str, message: String, exam: &StoredExamSchedule) -> Notice {
    Notice::new(kind, title, message)
        .from_sender(&exam.teacher_did)
        .about("exam", &exam.id)
        .with_metadata(serde_json::json!({
            "subject": exam.subject,
            "examType": exam.exam_type,
            "examDate": exam.exam_date,
        }))
}

// ============================================================================
// Assignments & Students
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/teacher/subjects",
    tag = "Teacher",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Own active assignments", body = [StoredTeacherSubject]))
)]
pub async fn my_subjects(
    TeacherOnly(teacher): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredTeacherSubject>>, ApiError> {
    let assignments =
        TeacherSubjectRepository::new(&state.db).list_active(Some(&teacher.wallet_address))?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/v1/teacher/students",
    tag = "Teacher",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Active students", body = [UserResponse]))
)]
pub async fn list_students(
    TeacherOnly(_teacher): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let students = UserRepository::new(&state.db).list(Some(Role::Student), true)?;
    Ok(Json(students.into_iter().map(UserResponse::from).collect()))
}

// ============================================================================
// Credentials
// ============================================================================

/// Issue a credential.
///
/// Returns as soon as the credential is stored with `blockchainStatus:
/// pending`; pinning and anchoring run in the background.
#[utoipa::path(
    post,
    path = "/v1/teacher/credentials",
    tag = "Teacher",
    request_body = IssueCredentialRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Credential issued", body = IssueCredentialResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not assigned to the subject"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn issue_credential(
    TeacherOnly(teacher): TeacherOnly,
    State(state): State<AppState>,
    Json(request): Json<IssueCredentialRequest>,
) -> Result<(StatusCode, Json<IssueCredentialResponse>), ApiError> {
    let response = issue(
        &state.db,
        &state.anchor_queue,
        &teacher,
        &request,
        &state.institution_name,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/teacher/credentials",
    tag = "Teacher",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Credentials issued by the caller", body = [StoredCredential]))
)]
pub async fn issued_credentials(
    TeacherOnly(teacher): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredCredential>>, ApiError> {
    let credentials = CredentialRepository::new(&state.db).list_by_teacher(&teacher.wallet_address)?;
    Ok(Json(credentials))
}

// ============================================================================
// Exams
// ============================================================================

/// Schedule an exam and notify every active student.
#[utoipa::path(
    post,
    path = "/v1/teacher/exams",
    tag = "Teacher",
    request_body = CreateExamRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Exam scheduled", body = StoredExamSchedule),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not assigned to the subject")
    )
)]
pub async fn create_exam(
    TeacherOnly(teacher): TeacherOnly,
    State(state): State<AppState>,
    Json(request): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<StoredExamSchedule>), ApiError> {
    let subject = require_non_empty(&request.subject, "subject")?;
    let exam_type = require_non_empty(&request.exam_type, "examType")?;
    let academic_year = validate_academic_year(&request.academic_year)?;
    let semester = validate_semester(request.semester)?;
    if request.duration_minutes == 0 {
        return Err(ApiError::bad_request("durationMinutes must be positive"));
    }
    if request.total_marks == 0 {
        return Err(ApiError::bad_request("totalMarks must be positive"));
    }
    require_assignment(&state, &teacher, &subject)?;

    let now = Utc::now();
    let exam = StoredExamSchedule {
        id: new_object_id(),
        subject,
        exam_type,
        exam_date: request.exam_date,
        duration_minutes: request.duration_minutes,
        total_marks: request.total_marks,
        venue: request.venue,
        instructions: request.instructions,
        academic_year,
        semester,
        status: ExamStatus::Scheduled,
        teacher_did: teacher.did.clone(),
        teacher_address: teacher.wallet_address.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    ExamRepository::new(&state.db).create(&exam)?;
    tracing::info!(exam_id = %exam.id, teacher = %teacher.wallet_address, subject = %exam.subject, "Exam scheduled");

    let notice = exam_notice(
        NotificationType::ExamScheduled,
        "Exam scheduled",
        format!(
            "{} {} exam on {}",
            exam.subject,
            exam.exam_type,
            exam.exam_date.format("%Y-%m-%d %H:%M UTC")
        ),
        &exam,
    );
    notify_active_students(&state.db, &notice);

    Ok((StatusCode::CREATED, Json(exam)))
}

#[utoipa::path(
    get,
    path = "/v1/teacher/exams",
    tag = "Teacher",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Own active exams, soonest first", body = [StoredExamSchedule]))
)]
pub async fn my_exams(
    TeacherOnly(teacher): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredExamSchedule>>, ApiError> {
    let exams = ExamRepository::new(&state.db).list_by_teacher(&teacher.wallet_address)?;
    Ok(Json(exams))
}

/// Update an exam. Only allow-listed fields change.
#[utoipa::path(
    put,
    path = "/v1/teacher/exams/{id}",
    tag = "Teacher",
    params(("id" = String, Path, description = "Exam id")),
    request_body = ExamScheduleUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated exam", body = StoredExamSchedule),
        (status = 404, description = "Exam not found"),
        (status = 409, description = "Exam is cancelled")
    )
)]
pub async fn update_exam(
    TeacherOnly(teacher): TeacherOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(update): Json<ExamScheduleUpdate>,
) -> Result<Json<StoredExamSchedule>, ApiError> {
    let id = validate_object_id(&id)?;
    if update.duration_minutes == Some(0) || update.total_marks == Some(0) {
        return Err(ApiError::bad_request("durationMinutes and totalMarks must be positive"));
    }
    if update.status == Some(ExamStatus::Cancelled) {
        return Err(ApiError::bad_request("Delete the exam to cancel it"));
    }

    let exams = ExamRepository::new(&state.db);
    exams.get_active(id).verify_owner(&teacher.wallet_address)?;
    let exam = exams.update(id, &update)?;
    tracing::info!(exam_id = %exam.id, teacher = %teacher.wallet_address, "Exam updated");

    let notice = exam_notice(
        NotificationType::ExamUpdated,
        "Exam updated",
        format!("{} {} exam details changed", exam.subject, exam.exam_type),
        &exam,
    );
    notify_active_students(&state.db, &notice);

    Ok(Json(exam))
}

/// Cancel an exam (soft delete).
#[utoipa::path(
    delete,
    path = "/v1/teacher/exams/{id}",
    tag = "Teacher",
    params(("id" = String, Path, description = "Exam id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cancelled exam", body = StoredExamSchedule),
        (status = 404, description = "Exam not found")
    )
)]
pub async fn delete_exam(
    TeacherOnly(teacher): TeacherOnly,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredExamSchedule>, ApiError> {
    let id = validate_object_id(&id)?;
    let exams = ExamRepository::new(&state.db);
    exams.get_active(id).verify_owner(&teacher.wallet_address)?;
    let exam = exams.soft_delete(id)?;
    tracing::info!(exam_id = %exam.id, teacher = %teacher.wallet_address, "Exam cancelled");

    let notice = exam_notice(
        NotificationType::ExamCancelled,
        "Exam cancelled",
        format!("{} {} exam has been cancelled", exam.subject, exam.exam_type),
        &exam,
    );
    notify_active_students(&state.db, &notice);

    Ok(Json(exam))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{test_state, user_with_role};
    use crate::storage::{AnchorStatus, NotificationRepository, StoredUser};
    use chrono::Duration;

    const TEACHER: &str = "0x2222222222222222222222222222222222222222";
    const OTHER_TEACHER: &str = "0x4444444444444444444444444444444444444444";
    const STUDENT: &str = "0x1111111111111111111111111111111111111111";

    fn teacher_of(user: &StoredUser) -> TeacherOnly {
        TeacherOnly(AuthenticatedUser::from_user(user))
    }

    fn assign(state: &AppState, teacher: &StoredUser, subject: &str) {
        let now = Utc::now();
        TeacherSubjectRepository::new(&state.db)
            .assign(StoredTeacherSubject {
                id: new_object_id(),
                teacher_address: teacher.wallet_address.clone(),
                teacher_did: teacher.did.clone(),
                subject_code: "MATH101".into(),
                subject_name: subject.into(),
                academic_year: "2024-2025".into(),
                semester: 1,
                batches: vec![],
                assigned_by: "did:ethr:0x9999999999999999999999999999999999999999".into(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn exam_request(subject: &str) -> CreateExamRequest {
        CreateExamRequest {
            subject: subject.into(),
            exam_type: "midterm".into(),
            exam_date: Utc::now() + Duration::days(7),
            duration_minutes: 90,
            total_marks: 100,
            venue: Some("Hall B".into()),
            instructions: None,
            academic_year: "2024-2025".into(),
            semester: 1,
        }
    }

    #[tokio::test]
    async fn assigned_teacher_issues_credential_end_to_end() {
        let (state, mut jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        let (student, _) = user_with_role(&state, STUDENT, Role::Student);
        assign(&state, &teacher, "Mathematics");

        let request = IssueCredentialRequest {
            student_address: STUDENT.into(),
            subject: "Mathematics".into(),
            marks: 88,
            exam_type: "final".into(),
            academic_year: "2024-2025".into(),
            semester: 1,
            grade: Some("A".into()),
            institution: None,
        };
        let (status, Json(response)) =
            issue_credential(teacher_of(&teacher), State(state.clone()), Json(request))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(response.success);
        assert_eq!(response.vc_hash.len(), 64);
        assert_eq!(response.blockchain_status, AnchorStatus::Pending);

        let stored = CredentialRepository::new(&state.db)
            .get(&response.credential_id)
            .unwrap();
        assert_eq!(stored.blockchain_status, AnchorStatus::Pending);
        assert_eq!(stored.grade, "A");
        assert_eq!(stored.institution, "MarkChain University");

        let job = jobs.try_recv().unwrap();
        assert_eq!(job.credential_id, response.credential_id);

        let inbox = NotificationRepository::new(&state.db)
            .list_for_recipient(&student.wallet_address, false, None)
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::CredentialIssued);

        let Json(issued) = issued_credentials(teacher_of(&teacher), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(issued.len(), 1);
    }

    #[tokio::test]
    async fn unassigned_teacher_cannot_issue() {
        let (state, mut jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        user_with_role(&state, STUDENT, Role::Student);

        let request = IssueCredentialRequest {
            student_address: STUDENT.into(),
            subject: "Physics".into(),
            marks: 70,
            exam_type: "final".into(),
            academic_year: "2024-2025".into(),
            semester: 1,
            grade: None,
            institution: None,
        };
        let err = issue_credential(teacher_of(&teacher), State(state.clone()), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(jobs.try_recv().is_err());
        assert!(CredentialRepository::new(&state.db)
            .list_by_teacher(TEACHER)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn scheduling_fans_out_to_active_students() {
        let (state, _jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        let (active, _) = user_with_role(&state, STUDENT, Role::Student);
        let (inactive, _) = user_with_role(&state, "0x5555555555555555555555555555555555555555", Role::Student);
        UserRepository::new(&state.db).set_active(&inactive.id, false).unwrap();
        assign(&state, &teacher, "Mathematics");

        let (status, Json(exam)) =
            create_exam(teacher_of(&teacher), State(state.clone()), Json(exam_request("Mathematics")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(exam.status, ExamStatus::Scheduled);

        let notifications = NotificationRepository::new(&state.db);
        let inbox = notifications
            .list_for_recipient(&active.wallet_address, false, None)
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::ExamScheduled);
        assert_eq!(notifications.unread_count(&inactive.wallet_address).unwrap(), 0);
    }

    #[tokio::test]
    async fn exam_requires_assignment_and_valid_input() {
        let (state, _jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);

        let err = create_exam(teacher_of(&teacher), State(state.clone()), Json(exam_request("Mathematics")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        assign(&state, &teacher, "Mathematics");
        let mut bad = exam_request("Mathematics");
        bad.semester = 9;
        let err = create_exam(teacher_of(&teacher), State(state.clone()), Json(bad))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn only_owner_can_change_exam() {
        let (state, _jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        let (other, _) = user_with_role(&state, OTHER_TEACHER, Role::Teacher);
        assign(&state, &teacher, "Mathematics");

        let (_, Json(exam)) =
            create_exam(teacher_of(&teacher), State(state.clone()), Json(exam_request("Mathematics")))
                .await
                .unwrap();

        let update = ExamScheduleUpdate {
            venue: Some("Hall C".into()),
            ..Default::default()
        };
        let err = update_exam(teacher_of(&other), Path(exam.id.clone()), State(state.clone()), Json(update.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = delete_exam(teacher_of(&other), Path(exam.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(updated) = update_exam(teacher_of(&teacher), Path(exam.id.clone()), State(state.clone()), Json(update))
            .await
            .unwrap();
        assert_eq!(updated.venue.as_deref(), Some("Hall C"));
        assert_eq!(updated.duration_minutes, 90);
    }

    #[tokio::test]
    async fn deleting_exam_cancels_it_once() {
        let (state, _jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        let (student, _) = user_with_role(&state, STUDENT, Role::Student);
        assign(&state, &teacher, "Mathematics");

        let (_, Json(exam)) =
            create_exam(teacher_of(&teacher), State(state.clone()), Json(exam_request("Mathematics")))
                .await
                .unwrap();

        let Json(cancelled) = delete_exam(teacher_of(&teacher), Path(exam.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert!(!cancelled.is_active);
        assert_eq!(cancelled.status, ExamStatus::Cancelled);

        let err = delete_exam(teacher_of(&teacher), Path(exam.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(remaining) = my_exams(teacher_of(&teacher), State(state.clone())).await.unwrap();
        assert!(remaining.is_empty());

        let kinds: Vec<_> = NotificationRepository::new(&state.db)
            .list_for_recipient(&student.wallet_address, false, None)
            .unwrap()
            .into_iter()
            .map(|n| n.notification_type)
            .collect();
        assert!(kinds.contains(&NotificationType::ExamCancelled));
    }

    #[tokio::test]
    async fn student_directory_lists_active_students_only() {
        let (state, _jobs) = test_state();
        let (teacher, _) = user_with_role(&state, TEACHER, Role::Teacher);
        user_with_role(&state, STUDENT, Role::Student);
        assign(&state, &teacher, "Mathematics");

        let Json(students) = list_students(teacher_of(&teacher), State(state.clone())).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].wallet_address, STUDENT);

        let Json(subjects) = my_subjects(teacher_of(&teacher), State(state)).await.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].subject_name, "Mathematics");
    }
}
