// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markchain_server::{
    api::{admin::init_server_start_time, router},
    blockchain::ChainGateway,
    config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    issuance::{AnchorQueue, AnchorWorker, CredentialPinner, CredentialRegistry},
    ipfs::PinataClient,
    state::AppState,
    storage::Database,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing();
    init_server_start_time();

    let config = AppConfig::from_env()?;

    let db = Arc::new(Database::open(&config.database_path())?);
    tracing::info!(path = %config.database_path().display(), "Database opened");

    let ipfs = Arc::new(PinataClient::from_config(&config)?);
    if !ipfs.is_configured() {
        tracing::warn!("Pinning service not configured; anchoring will fail until keys are set");
    }

    let chain = match config.chain.as_ref() {
        Some(chain_config) => {
            let gateway = Arc::new(ChainGateway::new(chain_config)?);
            tracing::info!(
                contract = %gateway.contract_address(),
                issuer = %gateway.signer_address(),
                "Blockchain gateway configured"
            );
            Some(gateway)
        }
        None => {
            tracing::warn!("Blockchain gateway not configured; credentials will not be anchored");
            None
        }
    };

    let shutdown = CancellationToken::new();
    let (anchor_queue, jobs) = AnchorQueue::channel();
    let worker = AnchorWorker::new(
        Arc::clone(&db),
        jobs,
        Arc::clone(&ipfs) as Arc<dyn CredentialPinner>,
        chain
            .as_ref()
            .map(|c| Arc::clone(c) as Arc<dyn CredentialRegistry>),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let state = AppState::new(&config, db, ipfs, chain, anchor_queue);
    let app = router(state, &config.cors_origins);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "MarkChain server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        tracing::warn!(error = %e, "Anchor worker task failed");
    }
    tracing::info!("Server stopped");
    Ok(())
}
