// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are keyed by id and indexed by lowercase wallet address. A user is
//! created on the first nonce request and never hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    new_object_id, put_doc, put_index, read_doc, read_index, Database, StorageError,
    StorageResult, USERS, USER_WALLET_INDEX,
};
use crate::auth::Role;

/// User document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    /// Lowercase wallet address (unique)
    pub wallet_address: String,
    pub did: String,
    pub role: Role,
    /// Pending login challenge; cleared after a successful login
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub nonce_issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub did_registered: bool,
    /// Contract role name recorded at the last admin role assignment
    #[serde(default)]
    pub blockchain_role: Option<String>,
    #[serde(default)]
    pub assigned_subjects: Vec<String>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user (never includes the login nonce).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub wallet_address: String,
    pub did: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_active: bool,
    pub did_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_role: Option<String>,
    pub assigned_subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            wallet_address: user.wallet_address,
            did: user.did,
            role: user.role,
            name: user.name,
            student_id: user.student_id,
            email: user.email,
            is_active: user.is_active,
            did_registered: user.did_registered,
            blockchain_role: user.blockchain_role,
            assigned_subjects: user.assigned_subjects,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields a user may change on their own profile.
///
/// Anything not listed here (role, wallet, activation) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    fn apply(&self, user: &mut StoredUser) {
        // Empty strings clear the field
        fn normalize(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        if let Some(name) = &self.name {
            user.name = normalize(name);
        }
        if let Some(student_id) = &self.student_id {
            user.student_id = normalize(student_id);
        }
        if let Some(email) = &self.email {
            user.email = normalize(email);
        }
    }
}

/// Repository for user documents.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a user by id.
    pub fn get(&self, id: &str) -> StorageResult<StoredUser> {
        self.db
            .get_json(USERS, id)?
            .ok_or_else(|| StorageError::NotFound(format!("User {id}")))
    }

    /// Find a user by (lowercase) wallet address.
    pub fn find_by_wallet(&self, wallet_address: &str) -> StorageResult<Option<StoredUser>> {
        match self.db.lookup(USER_WALLET_INDEX, wallet_address)? {
            Some(id) => self.db.get_json(USERS, &id),
            None => Ok(None),
        }
    }

    /// Get a user by wallet address or fail with `NotFound`.
    pub fn get_by_wallet(&self, wallet_address: &str) -> StorageResult<StoredUser> {
        self.find_by_wallet(wallet_address)?
            .ok_or_else(|| StorageError::NotFound(format!("User {wallet_address}")))
    }

    /// Find a user by DID.
    pub fn find_by_did(&self, did: &str) -> StorageResult<Option<StoredUser>> {
        let mut matches = self.db.scan_json(USERS, |u: &StoredUser| u.did == did)?;
        Ok(matches.pop())
    }

    /// List users, optionally filtered by role and activation.
    pub fn list(&self, role: Option<Role>, active_only: bool) -> StorageResult<Vec<StoredUser>> {
        let mut users = self.db.scan_json(USERS, |u: &StoredUser| {
            role.is_none_or(|r| u.role == r) && (!active_only || u.is_active)
        })?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    /// Store a fresh login nonce, creating the user on first contact.
    ///
    /// Existing users only have `nonce`, `nonceIssuedAt` and `updatedAt`
    /// rewritten. Returns the user and whether it was created.
    pub fn issue_nonce(
        &self,
        wallet_address: &str,
        did: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<(StoredUser, bool)> {
        self.db.write(|txn| {
            if let Some(id) = read_index(txn, USER_WALLET_INDEX, wallet_address)? {
                let mut user: StoredUser = read_doc(txn, USERS, &id)?
                    .ok_or_else(|| StorageError::NotFound(format!("User {id}")))?;
                user.nonce = Some(nonce.to_string());
                user.nonce_issued_at = Some(now);
                user.updated_at = now;
                put_doc(txn, USERS, &id, &user)?;
                return Ok((user, false));
            }

            let user = StoredUser {
                id: new_object_id(),
                wallet_address: wallet_address.to_string(),
                did: did.to_string(),
                role: Role::Student,
                nonce: Some(nonce.to_string()),
                nonce_issued_at: Some(now),
                name: None,
                student_id: None,
                email: None,
                is_active: true,
                did_registered: false,
                blockchain_role: None,
                assigned_subjects: Vec::new(),
                last_login: None,
                created_at: now,
                updated_at: now,
            };
            put_doc(txn, USERS, &user.id, &user)?;
            put_index(txn, USER_WALLET_INDEX, wallet_address, &user.id)?;
            Ok((user, true))
        })
    }

    /// Consume the login nonce and stamp the login.
    ///
    /// Fails with `Conflict` if the stored nonce is no longer `expected_nonce`,
    /// so a nonce can complete at most one login.
    pub fn complete_login(
        &self,
        id: &str,
        expected_nonce: &str,
        did: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            if user.nonce.as_deref() != Some(expected_nonce) {
                return Err(StorageError::Conflict("Nonce already used".into()));
            }
            user.nonce = None;
            user.nonce_issued_at = None;
            if user.did.is_empty() {
                user.did = did.to_string();
            }
            user.last_login = Some(now);
            user.updated_at = now;
            Ok(())
        })
    }

    /// Apply an allow-listed profile update.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            update.apply(user);
            user.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Set the application role and record the contract role name.
    pub fn set_role(&self, id: &str, role: Role) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            user.role = role;
            user.blockchain_role = Some(role.chain_role_name().to_string());
            user.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn set_active(&self, id: &str, is_active: bool) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            user.is_active = is_active;
            user.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Mark the user's DID as registered on-chain. No-op for unknown wallets.
    pub fn mark_did_registered(&self, wallet_address: &str) -> StorageResult<bool> {
        let Some(user) = self.find_by_wallet(wallet_address)? else {
            return Ok(false);
        };
        self.db.update_json(USERS, &user.id, |user: &mut StoredUser| {
            user.did_registered = true;
            user.updated_at = Utc::now();
            Ok(())
        })?;
        Ok(true)
    }

    /// Add a subject code to the teacher's denormalized subject list.
    pub fn add_assigned_subject(&self, id: &str, subject_code: &str) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            if !user
                .assigned_subjects
                .iter()
                .any(|s| s.eq_ignore_ascii_case(subject_code))
            {
                user.assigned_subjects.push(subject_code.to_string());
                user.updated_at = Utc::now();
            }
            Ok(())
        })
    }

    pub fn remove_assigned_subject(
        &self,
        id: &str,
        subject_code: &str,
    ) -> StorageResult<StoredUser> {
        self.db.update_json(USERS, id, |user: &mut StoredUser| {
            user.assigned_subjects
                .retain(|s| !s.eq_ignore_ascii_case(subject_code));
            user.updated_at = Utc::now();
            Ok(())
        })
    }
}
