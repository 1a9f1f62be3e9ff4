// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-signature login and session tokens for the MarkChain API.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /v1/auth/nonce` with its wallet address
//! 2. Client signs the returned message with its wallet (EIP-191)
//! 3. Client calls `POST /v1/auth/verify`; the server recovers the signer,
//!    consumes the nonce and returns an HS256 session token
//! 4. Protected routes take `Authorization: Bearer <token>`
//!
//! ## Security
//!
//! - Nonces are single-use and expire after 10 minutes
//! - The stored user is re-read on every request; its role is authoritative
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;
pub mod token;
pub mod wallet;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, StudentOnly, TeacherOnly};
pub use roles::Role;
pub use token::TokenService;
