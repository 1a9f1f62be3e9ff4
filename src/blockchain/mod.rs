// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the MarkChain registry contract.
//!
//! This module provides functionality for:
//! - Role management (`grantRole`, `revokeRole`, `hasRole`)
//! - DID registration and lookup
//! - Anchoring and revoking credential hashes
//! - Teacher subject assignment on-chain

pub mod client;
pub mod contract;
pub mod types;

pub use client::ChainGateway;
pub use types::*;
