// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential issuance, revocation and public verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::anchor::{AnchorJob, AnchorQueue, CredentialRegistry};
use super::vc::{build_credential, grade_for_marks, vc_hash, AcademicAchievement};
use crate::auth::{AuthenticatedUser, Role};
use crate::blockchain::OnChainCredential;
use crate::error::ApiError;
use crate::models::{
    require_non_empty, validate_academic_year, validate_marks, validate_semester, WalletAddress,
};
use crate::notify::{notify, Notice};
use crate::storage::{
    new_object_id, AnchorStatus, CredentialRepository, Database, NotificationType,
    StoredCredential, TeacherSubjectRepository, UserRepository,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Teacher request to issue a credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub student_address: String,
    pub subject: String,
    /// 0 to 100
    pub marks: i64,
    pub exam_type: String,
    /// `YYYY-YYYY`
    pub academic_year: String,
    /// 1 to 8
    pub semester: i64,
    /// Derived from marks when omitted
    #[serde(default)]
    pub grade: Option<String>,
    /// Defaults to the configured institution name
    #[serde(default)]
    pub institution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialResponse {
    pub success: bool,
    pub credential_id: String,
    pub vc_hash: String,
    pub blockchain_status: AnchorStatus,
}

/// Admin request to revoke a credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCredentialRequest {
    #[serde(default)]
    pub reason: Option<String>,
    /// Revoke on-chain first; the database is only updated if that succeeds
    #[serde(default)]
    pub revoke_on_chain: bool,
}

/// On-chain half of a verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnChainVerification {
    pub record: OnChainCredential,
    pub hash_matches: bool,
}

/// Public verification result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub credential_id: String,
    /// Hash intact, not revoked, and consistent with the chain when checked
    pub valid: bool,
    /// Stored `vcJson` still hashes to the stored `vcHash`
    pub hash_matches: bool,
    pub is_revoked: bool,
    pub blockchain_status: AnchorStatus,
    pub vc_hash: String,
    pub student_did: String,
    pub subject: String,
    pub grade: String,
    pub academic_year: String,
    pub semester: u8,
    pub institution: String,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_error: Option<String>,
}

// =============================================================================
// Issuance
// =============================================================================

/// Validate, build, hash and persist a credential, then queue it for
/// anchoring. The response never waits for IPFS or the chain.
pub fn issue_credential(
    db: &Database,
    queue: &AnchorQueue,
    teacher: &AuthenticatedUser,
    request: &IssueCredentialRequest,
    default_institution: &str,
    now: DateTime<Utc>,
) -> Result<IssueCredentialResponse, ApiError> {
    let subject = require_non_empty(&request.subject, "subject")?;
    let student_address = WalletAddress::parse(&request.student_address)?;

    if !TeacherSubjectRepository::new(db).is_teacher_assigned(&teacher.wallet_address, &subject)? {
        tracing::warn!(teacher = %teacher.wallet_address, subject = %subject, "Issuance without subject assignment");
        return Err(ApiError::forbidden(format!(
            "You are not assigned to teach {subject}"
        )));
    }

    let marks = validate_marks(request.marks)?;
    let academic_year = validate_academic_year(&request.academic_year)?;
    let semester = validate_semester(request.semester)?;
    let exam_type = require_non_empty(&request.exam_type, "examType")?;
    let grade = request
        .grade
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| grade_for_marks(marks).to_string());
    let institution = request
        .institution
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(default_institution)
        .to_string();

    let student = UserRepository::new(db)
        .find_by_wallet(student_address.as_str())?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    let vc_json = build_credential(
        &AcademicAchievement {
            student_did: &student.did,
            student_address: &student.wallet_address,
            issuer_did: &teacher.did,
            institution: &institution,
            subject: &subject,
            marks,
            grade: &grade,
            exam_type: &exam_type,
            academic_year: &academic_year,
            semester,
        },
        now,
    );
    let vc_hash = vc_hash(&vc_json).map_err(|e| ApiError::internal(format!("Failed to hash credential: {e}")))?;

    let credential = StoredCredential {
        id: new_object_id(),
        student_did: student.did.clone(),
        student_address: student.wallet_address.clone(),
        teacher_did: teacher.did.clone(),
        teacher_address: teacher.wallet_address.clone(),
        subject: subject.clone(),
        marks,
        grade: grade.clone(),
        exam_type,
        academic_year,
        semester,
        institution,
        vc_hash: vc_hash.clone(),
        vc_json: vc_json.clone(),
        is_revoked: false,
        revoked_at: None,
        revoked_by: None,
        revocation_reason: None,
        blockchain_status: AnchorStatus::Pending,
        blockchain_tx_hash: None,
        ipfs_hash: None,
        issuer_address: None,
        anchor_error: None,
        anchored_at: None,
        created_at: now,
        updated_at: now,
    };
    CredentialRepository::new(db).create(&credential)?;

    tracing::info!(
        credential_id = %credential.id,
        teacher = %teacher.wallet_address,
        student = %student.wallet_address,
        subject = %subject,
        "Credential issued"
    );

    queue.enqueue(AnchorJob {
        credential_id: credential.id.clone(),
        student_address: credential.student_address.clone(),
        subject: subject.clone(),
        vc_hash: vc_hash.clone(),
        vc_json,
    });

    let notice = Notice::new(
        NotificationType::CredentialIssued,
        "New credential issued",
        format!("You received a credential for {subject} with grade {grade}"),
    )
    .from_sender(&teacher.did)
    .about("credential", &credential.id)
    .with_metadata(json!({ "subject": subject, "grade": grade, "marks": marks }));
    notify(db, &student.did, Some(&student.wallet_address), &notice);

    Ok(IssueCredentialResponse {
        success: true,
        credential_id: credential.id,
        vc_hash,
        blockchain_status: AnchorStatus::Pending,
    })
}

// =============================================================================
// Revocation
// =============================================================================

/// Revoke a credential once.
///
/// With `revoke_on_chain` the contract revoke runs first and the database is
/// left untouched if it fails. The contract revokes a (student, subject)
/// slot, so the slot must still hold this credential's hash.
pub async fn revoke_credential(
    db: &Database,
    registry: Option<&dyn CredentialRegistry>,
    admin: &AuthenticatedUser,
    credential_id: &str,
    request: &RevokeCredentialRequest,
    now: DateTime<Utc>,
) -> Result<StoredCredential, ApiError> {
    let credentials = CredentialRepository::new(db);
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    if request.revoke_on_chain {
        let existing = credentials.get(credential_id)?;
        if existing.is_revoked {
            return Err(ApiError::conflict("Credential already revoked"));
        }
        let registry = registry.ok_or_else(|| ApiError::bad_gateway("Blockchain service not configured"))?;
        let record = registry
            .credential_record(&existing.student_address, &existing.subject)
            .await
            .map_err(|e| {
                tracing::warn!(credential_id, error = %e, "On-chain record lookup failed");
                ApiError::bad_gateway(format!("On-chain record lookup failed: {e}"))
            })?;
        if !record.exists() || !record.hash_matches(&existing.vc_hash) {
            tracing::warn!(credential_id, on_chain_hash = %record.vc_hash, "On-chain slot holds another credential");
            return Err(ApiError::conflict(
                "On-chain record does not hold this credential",
            ));
        }
        let tx_hash = registry
            .revoke_credential(&existing.student_address, &existing.subject)
            .await
            .map_err(|e| {
                tracing::warn!(credential_id, error = %e, "On-chain revocation failed");
                ApiError::bad_gateway(format!("On-chain revocation failed: {e}"))
            })?;
        tracing::info!(credential_id, tx_hash = %tx_hash, "Credential revoked on-chain");
    }

    let revoked = credentials.revoke(credential_id, &admin.did, reason, now)?;
    tracing::info!(credential_id, admin = %admin.wallet_address, "Credential revoked");

    let notice = Notice::new(
        NotificationType::CredentialRevoked,
        "Credential revoked",
        match reason {
            Some(reason) => format!("Your {} credential was revoked: {reason}", revoked.subject),
            None => format!("Your {} credential was revoked", revoked.subject),
        },
    )
    .from_sender(&admin.did)
    .about("credential", &revoked.id);
    notify(db, &revoked.student_did, Some(&revoked.student_address), &notice);

    Ok(revoked)
}

// =============================================================================
// Verification
// =============================================================================

pub async fn verify_credential(
    db: &Database,
    registry: Option<&dyn CredentialRegistry>,
    credential_id: &str,
) -> Result<VerificationReport, ApiError> {
    let credential = CredentialRepository::new(db).get(credential_id)?;
    Ok(build_report(credential, registry).await)
}

pub async fn verify_by_hash(
    db: &Database,
    registry: Option<&dyn CredentialRegistry>,
    vc_hash: &str,
) -> Result<VerificationReport, ApiError> {
    let credential = CredentialRepository::new(db)
        .find_by_hash(vc_hash.trim_start_matches("0x"))?
        .ok_or_else(|| ApiError::not_found("Credential not found"))?;
    Ok(build_report(credential, registry).await)
}

async fn build_report(
    credential: StoredCredential,
    registry: Option<&dyn CredentialRegistry>,
) -> VerificationReport {
    let hash_matches = vc_hash(&credential.vc_json)
        .map(|h| h == credential.vc_hash)
        .unwrap_or(false);

    let (on_chain, on_chain_error) = match registry {
        Some(registry) if credential.blockchain_status == AnchorStatus::Confirmed => {
            match registry
                .credential_record(&credential.student_address, &credential.subject)
                .await
            {
                Ok(record) => (
                    Some(OnChainVerification {
                        hash_matches: record.hash_matches(&credential.vc_hash),
                        record,
                    }),
                    None,
                ),
                Err(e) => {
                    tracing::warn!(credential_id = %credential.id, error = %e, "On-chain lookup failed");
                    (None, Some(e.to_string()))
                }
            }
        }
        _ => (None, None),
    };

    let chain_ok = on_chain
        .as_ref()
        .is_none_or(|o| o.hash_matches && !o.record.revoked);

    VerificationReport {
        valid: hash_matches && !credential.is_revoked && chain_ok,
        credential_id: credential.id,
        hash_matches,
        is_revoked: credential.is_revoked,
        blockchain_status: credential.blockchain_status,
        vc_hash: credential.vc_hash,
        student_did: credential.student_did,
        subject: credential.subject,
        grade: credential.grade,
        academic_year: credential.academic_year,
        semester: credential.semester,
        institution: credential.institution,
        issued_at: credential.created_at,
        ipfs_hash: credential.ipfs_hash,
        blockchain_tx_hash: credential.blockchain_tx_hash,
        on_chain,
        on_chain_error,
    }
}
