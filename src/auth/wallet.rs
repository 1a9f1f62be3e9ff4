// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login handshake.
//!
//! ## Flow
//!
//! 1. Client requests a nonce for its wallet address
//! 2. Server stores the nonce on the user (creating a STUDENT on first contact)
//!    and returns the message to sign
//! 3. Client signs the message with `personal_sign` (EIP-191)
//! 4. Server recovers the signer, consumes the nonce and issues a session token
//!
//! A nonce is valid for [`NONCE_TTL_MINUTES`] and completes at most one login.

use alloy::primitives::Signature;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{token::TokenService, AuthError};
use crate::models::WalletAddress;
use crate::storage::{Database, StorageError, UserRepository, UserResponse};

pub const NONCE_TTL_MINUTES: i64 = 10;

/// Challenge returned by the nonce request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonceChallenge {
    pub nonce: String,
    /// Exact text the wallet must sign
    pub message: String,
}

/// Login submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest {
    pub wallet_address: String,
    /// 65-byte `0x`-prefixed hex signature
    pub signature: String,
    pub nonce: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Message presented to the wallet for signing.
pub fn auth_message(wallet_address: &str, nonce: &str) -> String {
    format!(
        "Welcome to MarkChain!\n\nSign this message to authenticate your wallet.\n\nWallet: {wallet_address}\nNonce: {nonce}"
    )
}

/// 32 random bytes, hex encoded.
fn random_nonce() -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::InternalError("system RNG unavailable".into()))?;
    Ok(alloy::hex::encode(bytes))
}

/// Recover the EIP-191 signer of `message`.
pub fn recover_signer(message: &str, signature: &str) -> Result<String, AuthError> {
    let bytes = alloy::hex::decode(signature.trim())
        .map_err(|_| AuthError::MalformedWalletSignature)?;
    let signature =
        Signature::from_raw(&bytes).map_err(|_| AuthError::MalformedWalletSignature)?;
    let address = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| AuthError::MalformedWalletSignature)?;
    Ok(format!("{address:#x}"))
}

fn parse_wallet(raw: &str) -> Result<WalletAddress, AuthError> {
    WalletAddress::parse(raw).map_err(|_| AuthError::InvalidWalletAddress(raw.to_string()))
}

/// Issue a login challenge for `wallet_address`.
pub fn generate_nonce(db: &Database, wallet_address: &str) -> Result<NonceChallenge, AuthError> {
    let wallet = parse_wallet(wallet_address)?;
    let nonce = random_nonce()?;

    let (user, created) =
        UserRepository::new(db).issue_nonce(wallet.as_str(), &wallet.did(), &nonce, Utc::now())?;
    if created {
        tracing::info!(user_id = %user.id, wallet = %wallet, "Registered new wallet");
    }

    Ok(NonceChallenge {
        message: auth_message(wallet.as_str(), &nonce),
        nonce,
    })
}

/// Verify a signed challenge and start a session.
pub fn verify_signature(
    db: &Database,
    tokens: &TokenService,
    request: &VerifySignatureRequest,
    now: DateTime<Utc>,
) -> Result<LoginSession, AuthError> {
    let wallet = parse_wallet(&request.wallet_address)?;
    let users = UserRepository::new(db);

    let user = users
        .find_by_wallet(wallet.as_str())?
        .filter(|u| u.nonce.as_deref() == Some(request.nonce.as_str()))
        .ok_or(AuthError::InvalidNonce)?;

    let issued_at = user.nonce_issued_at.ok_or(AuthError::NonceExpired)?;
    if now - issued_at > Duration::minutes(NONCE_TTL_MINUTES) {
        return Err(AuthError::NonceExpired);
    }

    let signer = recover_signer(&auth_message(wallet.as_str(), &request.nonce), &request.signature)?;
    if !signer.eq_ignore_ascii_case(wallet.as_str()) {
        tracing::warn!(wallet = %wallet, "Wallet signature signer mismatch");
        return Err(AuthError::SignerMismatch);
    }

    if !user.is_active {
        return Err(AuthError::AccountDeactivated);
    }

    let user = users
        .complete_login(&user.id, &request.nonce, &wallet.did(), now)
        .map_err(|e| match e {
            StorageError::Conflict(_) => AuthError::InvalidNonce,
            other => other.into(),
        })?;

    let (token, expires_at) = tokens.issue(&user, now)?;
    tracing::info!(user_id = %user.id, role = %user.role, "Wallet login");

    Ok(LoginSession {
        token,
        expires_at,
        user: user.into(),
    })
}
