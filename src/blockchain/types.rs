// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::sync::LazyLock;

use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upper bound on `teacherSubjects(teacher, i)` probes; the contract exposes
/// no count accessor.
pub const MAX_TEACHER_SUBJECT_PROBES: u64 = 64;

/// `DEFAULT_ADMIN_ROLE` of OpenZeppelin access control.
pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

pub static ADMIN_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("ADMIN_ROLE"));
pub static TEACHER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("TEACHER_ROLE"));
pub static STUDENT_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("STUDENT_ROLE"));

/// Resolve a role name (`TEACHER`, `teacher_role`, `DEFAULT_ADMIN_ROLE`, ...)
/// to its contract identifier.
pub fn role_id(name: &str) -> Result<B256, ChainError> {
    let upper = name.trim().to_ascii_uppercase();
    let canonical = if upper.ends_with("_ROLE") {
        upper
    } else {
        format!("{upper}_ROLE")
    };
    match canonical.as_str() {
        "DEFAULT_ADMIN_ROLE" => Ok(DEFAULT_ADMIN_ROLE),
        "ADMIN_ROLE" => Ok(*ADMIN_ROLE),
        "TEACHER_ROLE" => Ok(*TEACHER_ROLE),
        "STUDENT_ROLE" => Ok(*STUDENT_ROLE),
        _ => Err(ChainError::UnknownRole(name.to_string())),
    }
}

/// Credential record as stored by the contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnChainCredential {
    /// `0x`-prefixed hex of the anchored VC hash
    pub vc_hash: String,
    pub ipfs_hash: String,
    pub issuer: String,
    /// Unix seconds
    pub issued_at: u64,
    pub revoked: bool,
}

impl OnChainCredential {
    /// The contract returns a zeroed record for unknown (student, subject).
    pub fn exists(&self) -> bool {
        self.vc_hash
            .trim_start_matches("0x")
            .chars()
            .any(|c| c != '0')
    }

    /// Compare with a stored hex hash (with or without `0x`).
    pub fn hash_matches(&self, vc_hash: &str) -> bool {
        self.vc_hash
            .trim_start_matches("0x")
            .eq_ignore_ascii_case(vc_hash.trim_start_matches("0x"))
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Blockchain service not configured")]
    NotConfigured,

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction {tx_hash} reverted during {operation}")]
    Reverted {
        operation: &'static str,
        tx_hash: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_are_keccak_of_names() {
        assert_eq!(role_id("TEACHER").unwrap(), keccak256("TEACHER_ROLE".as_bytes()));
        assert_eq!(role_id("teacher_role").unwrap(), *TEACHER_ROLE);
        assert_eq!(role_id("Student").unwrap(), *STUDENT_ROLE);
        assert_eq!(role_id("admin").unwrap(), *ADMIN_ROLE);
        assert_ne!(*ADMIN_ROLE, *TEACHER_ROLE);
    }

    #[test]
    fn default_admin_role_is_zero_hash() {
        assert_eq!(role_id("DEFAULT_ADMIN_ROLE").unwrap(), B256::ZERO);
        assert_eq!(role_id("default_admin").unwrap(), B256::ZERO);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(matches!(role_id("registrar"), Err(ChainError::UnknownRole(_))));
    }

    #[test]
    fn zeroed_record_does_not_exist() {
        let empty = OnChainCredential {
            vc_hash: format!("0x{}", "0".repeat(64)),
            ipfs_hash: String::new(),
            issuer: format!("0x{}", "0".repeat(40)),
            issued_at: 0,
            revoked: false,
        };
        assert!(!empty.exists());

        let real = OnChainCredential {
            vc_hash: format!("0x{}", "ab".repeat(32)),
            ..empty
        };
        assert!(real.exists());
        assert!(real.hash_matches(&"AB".repeat(32)));
        assert!(!real.hash_matches(&"cd".repeat(32)));
    }
}
