// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential repository.
//!
//! ## Lifecycle
//!
//! ```text
//! create ──► pending ──► confirmed
//!                   └──► failed
//! ```
//!
//! Anchor fields are written exactly once, by the anchoring step. Revocation
//! is independent of the anchor status and terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    insert_doc, put_index, read_index, Database, StorageError, StorageResult,
    CREDENTIALS, CREDENTIAL_HASH_INDEX,
};
use super::super::OwnedResource;

/// On-chain anchoring status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Waiting for the background anchoring job
    Pending,
    /// Pinned to IPFS and recorded on-chain
    Confirmed,
    /// Pinning or contract call failed
    Failed,
}

impl AnchorStatus {
    /// Only `pending` may move, and only to a terminal status.
    pub fn can_transition_to(&self, next: AnchorStatus) -> bool {
        matches!(
            (self, next),
            (AnchorStatus::Pending, AnchorStatus::Confirmed)
                | (AnchorStatus::Pending, AnchorStatus::Failed)
        )
    }
}

impl std::fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorStatus::Pending => write!(f, "pending"),
            AnchorStatus::Confirmed => write!(f, "confirmed"),
            AnchorStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Credential document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub id: String,
    pub student_did: String,
    pub student_address: String,
    pub teacher_did: String,
    pub teacher_address: String,
    pub subject: String,
    pub marks: u32,
    pub grade: String,
    pub exam_type: String,
    pub academic_year: String,
    pub semester: u8,
    pub institution: String,
    /// SHA-256 hex of the canonical `vc_json`
    pub vc_hash: String,
    #[schema(value_type = Object)]
    pub vc_json: serde_json::Value,

    pub is_revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,

    pub blockchain_status: AnchorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for StoredCredential {
    fn owner_address(&self) -> &str {
        &self.student_address
    }

    fn resource_kind(&self) -> &'static str {
        "Credential"
    }
}

/// Result of an anchoring attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorUpdate {
    Confirmed {
        tx_hash: String,
        ipfs_hash: String,
        issuer_address: String,
    },
    Failed {
        error: String,
        /// Set when pinning succeeded but the contract call did not
        ipfs_hash: Option<String>,
    },
}

impl AnchorUpdate {
    pub fn status(&self) -> AnchorStatus {
        match self {
            AnchorUpdate::Confirmed { .. } => AnchorStatus::Confirmed,
            AnchorUpdate::Failed { .. } => AnchorStatus::Failed,
        }
    }
}

/// Filter for admin credential listing.
#[derive(Debug, Clone, Default)]
pub struct CredentialFilter {
    pub student_address: Option<String>,
    pub teacher_address: Option<String>,
    pub subject: Option<String>,
    pub status: Option<AnchorStatus>,
    pub is_revoked: Option<bool>,
}

impl CredentialFilter {
    fn matches(&self, c: &StoredCredential) -> bool {
        self.student_address
            .as_deref()
            .is_none_or(|a| c.student_address.eq_ignore_ascii_case(a))
            && self
                .teacher_address
                .as_deref()
                .is_none_or(|a| c.teacher_address.eq_ignore_ascii_case(a))
            && self
                .subject
                .as_deref()
                .is_none_or(|s| c.subject.eq_ignore_ascii_case(s))
            && self.status.is_none_or(|s| c.blockchain_status == s)
            && self.is_revoked.is_none_or(|r| c.is_revoked == r)
    }
}

/// Repository for credential documents.
pub struct CredentialRepository<'a> {
    db: &'a Database,
}

impl<'a> CredentialRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a new credential and index its hash.
    pub fn create(&self, credential: &StoredCredential) -> StorageResult<()> {
        self.db.write(|txn| {
            if read_index(txn, CREDENTIAL_HASH_INDEX, &credential.vc_hash)?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "Credential with hash {}",
                    credential.vc_hash
                )));
            }
            insert_doc(txn, CREDENTIALS, &credential.id, credential)?;
            put_index(txn, CREDENTIAL_HASH_INDEX, &credential.vc_hash, &credential.id)
        })
    }

    pub fn get(&self, id: &str) -> StorageResult<StoredCredential> {
        self.db
            .get_json(CREDENTIALS, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Credential {id}")))
    }

    pub fn find_by_hash(&self, vc_hash: &str) -> StorageResult<Option<StoredCredential>> {
        match self.db.lookup(CREDENTIAL_HASH_INDEX, &vc_hash.to_ascii_lowercase())? {
            Some(id) => self.db.get_json(CREDENTIALS, &id),
            None => Ok(None),
        }
    }

    /// List credentials matching `filter`, newest first.
    pub fn list(&self, filter: &CredentialFilter) -> StorageResult<Vec<StoredCredential>> {
        let mut credentials = self
            .db
            .scan_json(CREDENTIALS, |c: &StoredCredential| filter.matches(c))?;
        credentials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(credentials)
    }

    pub fn list_by_student(&self, student_address: &str) -> StorageResult<Vec<StoredCredential>> {
        self.list(&CredentialFilter {
            student_address: Some(student_address.to_string()),
            ..Default::default()
        })
    }

    pub fn list_by_teacher(&self, teacher_address: &str) -> StorageResult<Vec<StoredCredential>> {
        self.list(&CredentialFilter {
            teacher_address: Some(teacher_address.to_string()),
            ..Default::default()
        })
    }

    /// Revoke a credential once.
    ///
    /// A second revoke fails with `Conflict` and leaves the document untouched.
    pub fn revoke(
        &self,
        id: &str,
        revoked_by: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredCredential> {
        self.db
            .update_json(CREDENTIALS, id, |c: &mut StoredCredential| {
                if c.is_revoked {
                    return Err(StorageError::Conflict("Credential already revoked".into()));
                }
                c.is_revoked = true;
                c.revoked_at = Some(now);
                c.revoked_by = Some(revoked_by.to_string());
                c.revocation_reason = reason.map(str::to_string);
                c.updated_at = now;
                Ok(())
            })
            .map_err(|e| not_found_as_credential(e, id))
    }

    /// Record the outcome of the anchoring job.
    ///
    /// Only a `pending` credential accepts an outcome.
    pub fn record_anchor(
        &self,
        id: &str,
        update: &AnchorUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredCredential> {
        self.db
            .update_json(CREDENTIALS, id, |c: &mut StoredCredential| {
                let next = update.status();
                if !c.blockchain_status.can_transition_to(next) {
                    return Err(StorageError::Conflict(format!(
                        "Credential {id} anchor status is already {}",
                        c.blockchain_status
                    )));
                }
                c.blockchain_status = next;
                match update {
                    AnchorUpdate::Confirmed {
                        tx_hash,
                        ipfs_hash,
                        issuer_address,
                    } => {
                        c.blockchain_tx_hash = Some(tx_hash.clone());
                        c.ipfs_hash = Some(ipfs_hash.clone());
                        c.issuer_address = Some(issuer_address.clone());
                        c.anchored_at = Some(now);
                    }
                    AnchorUpdate::Failed { error, ipfs_hash } => {
                        c.anchor_error = Some(error.clone());
                        c.ipfs_hash = ipfs_hash.clone();
                    }
                }
                c.updated_at = now;
                Ok(())
            })
            .map_err(|e| not_found_as_credential(e, id))
    }
}

fn not_found_as_credential(err: StorageError, id: &str) -> StorageError {
    match err {
        StorageError::NotFound(_) => StorageError::NotFound(format!("Credential {id}")),
        other => other,
    }
}
