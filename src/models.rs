// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Validated input types and the request/response structures shared by
//! several handler groups. Handler-specific DTOs live next to their handlers.
//! All wire types use camelCase field names.
//!
//! ## Input Patterns
//!
//! - Wallet address: `0x` + 40 hex characters, stored lower-cased
//! - Document id: 24 lowercase hex characters
//! - Academic year: `YYYY-YYYY` where the second year is the first plus one
//! - Semester: `1` to `8`
//! - Marks: `0` to `100`

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

// =============================================================================
// Validation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid wallet address: {0}")]
    WalletAddress(String),

    #[error("Invalid id: {0}")]
    ObjectId(String),

    #[error("Invalid academic year '{0}', expected YYYY-YYYY with consecutive years")]
    AcademicYear(String),

    #[error("Invalid semester {0}, expected 1-8")]
    Semester(i64),

    #[error("Marks must be between 0 and 100, got {0}")]
    Marks(i64),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// Ethereum-compatible wallet address, always lower-cased.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12")?;
/// assert_eq!(addr.did(), "did:ethr:0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
/// ```
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let valid = trimmed.len() == 42
            && trimmed.starts_with("0x")
            && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ValidationError::WalletAddress(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic DID for this wallet.
    pub fn did(&self) -> String {
        format!("did:ethr:{}", self.0)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Validate a 24-character lowercase hex document id.
pub fn validate_object_id(raw: &str) -> Result<&str, ValidationError> {
    let valid = raw.len() == 24
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if valid {
        Ok(raw)
    } else {
        Err(ValidationError::ObjectId(raw.to_string()))
    }
}

/// Validate `YYYY-YYYY` with consecutive years.
pub fn validate_academic_year(raw: &str) -> Result<String, ValidationError> {
    let err = || ValidationError::AcademicYear(raw.to_string());
    let trimmed = raw.trim();
    let (first, second) = trimmed.split_once('-').ok_or_else(err)?;
    let is_year = |s: &str| s.len() == 4 && s.chars().all(|c| c.is_ascii_digit());
    if !is_year(first) || !is_year(second) {
        return Err(err());
    }
    let first: u32 = first.parse().map_err(|_| err())?;
    let second: u32 = second.parse().map_err(|_| err())?;
    if second != first + 1 {
        return Err(err());
    }
    Ok(trimmed.to_string())
}

pub fn validate_semester(raw: i64) -> Result<u8, ValidationError> {
    match raw {
        1..=8 => Ok(raw as u8),
        _ => Err(ValidationError::Semester(raw)),
    }
}

pub fn validate_marks(raw: i64) -> Result<u32, ValidationError> {
    match raw {
        0..=100 => Ok(raw as u32),
        _ => Err(ValidationError::Marks(raw)),
    }
}

/// Trim and reject empty strings.
pub fn require_non_empty(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(trimmed.to_string())
    }
}

// =============================================================================
// Shared Responses
// =============================================================================

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// Result of a contract write.
///
/// Gateway failures are reported in-band with `success: false` rather than
/// as an HTTP error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainOpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<String, E>> for BlockchainOpResponse {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(tx_hash) => Self {
                success: true,
                transaction_hash: Some(tx_hash),
                error: None,
            },
            Err(e) => Self {
                success: false,
                transaction_hash: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_address_is_lowercased_and_has_did() {
        let addr = WalletAddress::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap();
        assert_eq!(addr.as_str(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
        assert_eq!(
            addr.did(),
            "did:ethr:0x742d35cc6634c0532925a3b844bc9e7595f4ab12"
        );
    }

    #[test]
    fn wallet_address_rejects_malformed() {
        for bad in [
            "",
            "0x123",
            "742d35Cc6634C0532925a3b844Bc9e7595f4aB12",
            "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB1g",
            "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB1234",
        ] {
            assert!(WalletAddress::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn object_id_pattern() {
        assert!(validate_object_id("65a1b2c3d4e5f60718293a4b").is_ok());
        assert!(validate_object_id("65A1B2C3D4E5F60718293A4B").is_err());
        assert!(validate_object_id("65a1b2c3").is_err());
        assert!(validate_object_id("zza1b2c3d4e5f60718293a4b").is_err());
    }

    #[test]
    fn academic_year_requires_consecutive_years() {
        assert_eq!(validate_academic_year("2024-2025").unwrap(), "2024-2025");
        assert!(validate_academic_year("2024-2026").is_err());
        assert!(validate_academic_year("2024").is_err());
        assert!(validate_academic_year("24-25").is_err());
        assert!(validate_academic_year("abcd-efgh").is_err());
        assert!(validate_academic_year("+999-1000").is_err());
        assert_eq!(validate_academic_year("0999-1000").unwrap(), "0999-1000");
        assert_eq!(validate_academic_year(" 2030-2031 ").unwrap(), "2030-2031");
    }

    #[test]
    fn semester_and_marks_ranges() {
        assert_eq!(validate_semester(1).unwrap(), 1);
        assert_eq!(validate_semester(8).unwrap(), 8);
        assert!(validate_semester(0).is_err());
        assert!(validate_semester(9).is_err());

        assert_eq!(validate_marks(0).unwrap(), 0);
        assert_eq!(validate_marks(100).unwrap(), 100);
        assert_eq!(validate_marks(101), Err(ValidationError::Marks(101)));
        assert_eq!(validate_marks(-1), Err(ValidationError::Marks(-1)));
    }

    #[test]
    fn blockchain_response_from_result() {
        let ok: BlockchainOpResponse = Ok::<_, String>("0xabc".to_string()).into();
        assert!(ok.success);
        assert_eq!(ok.transaction_hash.as_deref(), Some("0xabc"));

        let failed: BlockchainOpResponse = Err::<String, _>("execution reverted").into();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("execution reverted"));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"success": false, "error": "execution reverted"})
        );
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err: ApiError = ValidationError::Semester(9).into();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
