// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenService;
use crate::blockchain::{ChainError, ChainGateway};
use crate::config::AppConfig;
use crate::ipfs::PinataClient;
use crate::issuance::{AnchorQueue, CredentialRegistry};
use crate::storage::Database;

/// Shared handler state. Gateways are built once in `main` and injected here.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub ipfs: Arc<PinataClient>,
    /// `None` when the chain gateway is not configured
    pub chain: Option<Arc<ChainGateway>>,
    pub anchor_queue: AnchorQueue,
    pub institution_name: Arc<str>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: Arc<Database>,
        ipfs: Arc<PinataClient>,
        chain: Option<Arc<ChainGateway>>,
        anchor_queue: AnchorQueue,
    ) -> Self {
        Self {
            db,
            tokens: Arc::new(TokenService::new(
                config.jwt_secret.as_bytes(),
                config.jwt_expires_in_hours,
            )),
            ipfs,
            chain,
            anchor_queue,
            institution_name: Arc::from(config.institution_name.as_str()),
        }
    }

    /// The chain gateway, or `NotConfigured`.
    pub fn chain(&self) -> Result<&ChainGateway, ChainError> {
        self.chain.as_deref().ok_or(ChainError::NotConfigured)
    }

    pub fn registry(&self) -> Option<&dyn CredentialRegistry> {
        self.chain.as_deref().map(|c| c as &dyn CredentialRegistry)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::Role;
    use crate::issuance::AnchorJob;
    use crate::storage::{StoredUser, UserRepository};
    use axum::http::request::Parts;
    use chrono::Utc;
    use tokio::sync::mpsc::UnboundedReceiver;

    pub(crate) const TEST_SECRET: &[u8] = b"test-secret-test-secret-test-secret";

    /// State over an in-memory database with no chain and no pinning keys.
    pub(crate) fn test_state() -> (AppState, UnboundedReceiver<AnchorJob>) {
        let (anchor_queue, jobs) = AnchorQueue::channel();
        let state = AppState {
            db: Arc::new(Database::in_memory().unwrap()),
            tokens: Arc::new(TokenService::new(TEST_SECRET, 24)),
            ipfs: Arc::new(PinataClient::new(None, vec![]).unwrap()),
            chain: None,
            anchor_queue,
            institution_name: Arc::from("MarkChain University"),
        };
        (state, jobs)
    }

    /// Register `wallet` with `role` and sign a session token for it.
    pub(crate) fn user_with_role(state: &AppState, wallet: &str, role: Role) -> (StoredUser, String) {
        let wallet = wallet.to_ascii_lowercase();
        let users = UserRepository::new(&state.db);
        let (user, _) = users
            .issue_nonce(&wallet, &format!("did:ethr:{wallet}"), "seed", Utc::now())
            .unwrap();
        let user = users.set_role(&user.id, role).unwrap();
        let (token, _) = state.tokens.issue(&user, Utc::now()).unwrap();
        (user, token)
    }

    pub(crate) fn bearer_parts(token: &str) -> Parts {
        axum::http::Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }
}
