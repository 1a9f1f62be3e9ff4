// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MarkChain - Academic Credential Issuance Service
//!
//! Teachers issue academic credentials as Verifiable Credential documents.
//! Each credential is stored, then pinned to IPFS and anchored on an EVM
//! registry contract in the background. Anyone can verify a credential by id
//! or by hash.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet signature login and session tokens
//! - `blockchain` - Registry contract gateway
//! - `ipfs` - Pinning service and gateway reads
//! - `issuance` - Credential building, hashing and anchoring
//! - `notify` - Inbox fan-out
//! - `storage` - Embedded document store (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod ipfs;
pub mod issuance;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;
