// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IPFS integration.
//!
//! Credential payloads are pinned through the Pinata HTTP API and read back
//! through a list of public gateways, tried in order.

pub mod cache;
pub mod client;

pub use cache::ContentCache;
pub use client::{IpfsError, PinataClient, PinnedItem};
