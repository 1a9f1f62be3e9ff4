// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Issuance
//!
//! - [`vc`]: credential document builder, grade table and content hash
//! - [`workflow`]: issue, revoke and verify operations
//! - [`anchor`]: background pinning and on-chain anchoring
//!
//! Issuance persists the credential as `pending` and returns immediately.
//! The [`AnchorWorker`] later moves it to `confirmed` or `failed`.

pub mod anchor;
pub mod vc;
pub mod workflow;

pub use anchor::{
    AnchorJob, AnchorOutcome, AnchorQueue, AnchorWorker, CredentialPinner, CredentialRegistry,
};
pub use vc::{build_credential, grade_for_marks, vc_hash};
pub use workflow::{
    issue_credential, revoke_credential, verify_by_hash, verify_credential,
    IssueCredentialRequest, IssueCredentialResponse, OnChainVerification,
    RevokeCredentialRequest, VerificationReport,
};
