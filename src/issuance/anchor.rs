// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Anchoring
//!
//! Background pipeline that pins a credential to IPFS and records its hash
//! on-chain, detached from the request that issued it.
//!
//! ```text
//! issue_credential ──► AnchorQueue ──► AnchorWorker ──► task per job
//!                                                         ├─ skip if revoked meanwhile
//!                                                         ├─ pin VC  (CredentialPinner)
//!                                                         ├─ anchor  (CredentialRegistry)
//!                                                         ├─ record_anchor(pending → confirmed | failed)
//!                                                         └─ publish AnchorOutcome
//! ```
//!
//! ## Shutdown
//!
//! The worker loop stops on a `CancellationToken`. Jobs already spawned run
//! to completion; jobs still queued stay `pending`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::blockchain::{ChainError, ChainGateway, OnChainCredential};
use crate::ipfs::{IpfsError, PinataClient};
use crate::storage::{AnchorStatus, AnchorUpdate, CredentialRepository, Database};

/// Boxed future returned by the gateway seams.
pub type GatewayFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

const REVOKED_BEFORE_ANCHOR: &str = "credential revoked";

/// Pins credential payloads.
pub trait CredentialPinner: Send + Sync {
    fn pin_credential<'a>(&'a self, vc: &'a Value, credential_id: &'a str) -> GatewayFuture<'a, String, IpfsError>;
}

/// On-chain credential registry.
pub trait CredentialRegistry: Send + Sync {
    fn anchor_credential<'a>(
        &'a self,
        student_address: &'a str,
        subject: &'a str,
        vc_hash: &'a str,
        ipfs_hash: &'a str,
    ) -> GatewayFuture<'a, String, ChainError>;

    fn revoke_credential<'a>(&'a self, student_address: &'a str, subject: &'a str) -> GatewayFuture<'a, String, ChainError>;

    fn credential_record<'a>(
        &'a self,
        student_address: &'a str,
        subject: &'a str,
    ) -> GatewayFuture<'a, OnChainCredential, ChainError>;

    /// Address recorded as the credential issuer.
    fn issuer_address(&self) -> String;
}

impl CredentialPinner for PinataClient {
    fn pin_credential<'a>(&'a self, vc: &'a Value, credential_id: &'a str) -> GatewayFuture<'a, String, IpfsError> {
        Box::pin(self.upload_credential(vc, credential_id))
    }
}

impl CredentialRegistry for ChainGateway {
    fn anchor_credential<'a>(
        &'a self,
        student_address: &'a str,
        subject: &'a str,
        vc_hash: &'a str,
        ipfs_hash: &'a str,
    ) -> GatewayFuture<'a, String, ChainError> {
        Box::pin(self.issue_or_update_credential(student_address, subject, vc_hash, ipfs_hash))
    }

    fn revoke_credential<'a>(&'a self, student_address: &'a str, subject: &'a str) -> GatewayFuture<'a, String, ChainError> {
        Box::pin(ChainGateway::revoke_credential(self, student_address, subject))
    }

    fn credential_record<'a>(
        &'a self,
        student_address: &'a str,
        subject: &'a str,
    ) -> GatewayFuture<'a, OnChainCredential, ChainError> {
        Box::pin(self.get_student_subject_credential(student_address, subject))
    }

    fn issuer_address(&self) -> String {
        self.signer_address()
    }
}

/// One credential waiting to be anchored.
#[derive(Debug, Clone)]
pub struct AnchorJob {
    pub credential_id: String,
    pub student_address: String,
    pub subject: String,
    pub vc_hash: String,
    pub vc_json: Value,
}

/// Final status of an anchoring job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorOutcome {
    pub credential_id: String,
    pub update: AnchorUpdate,
}

impl AnchorOutcome {
    pub fn status(&self) -> AnchorStatus {
        self.update.status()
    }
}

/// Sending side of the anchoring queue.
#[derive(Clone)]
pub struct AnchorQueue {
    jobs: mpsc::UnboundedSender<AnchorJob>,
}

impl AnchorQueue {
    /// Create a queue and the receiver to hand to [`AnchorWorker::new`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AnchorJob>) {
        let (jobs, rx) = mpsc::unbounded_channel();
        (Self { jobs }, rx)
    }

    /// Queue a job. Returns `false` if the worker is gone; the credential
    /// then stays `pending`.
    pub fn enqueue(&self, job: AnchorJob) -> bool {
        let credential_id = job.credential_id.clone();
        match self.jobs.send(job) {
            Ok(()) => true,
            Err(_) => {
                warn!(credential_id = %credential_id, "Anchor worker stopped; credential left pending");
                false
            }
        }
    }
}

/// Consumes [`AnchorJob`]s and spawns one task per job.
pub struct AnchorWorker {
    db: Arc<Database>,
    jobs: mpsc::UnboundedReceiver<AnchorJob>,
    pinner: Arc<dyn CredentialPinner>,
    registry: Option<Arc<dyn CredentialRegistry>>,
    outcomes: broadcast::Sender<AnchorOutcome>,
}

impl AnchorWorker {
    pub fn new(
        db: Arc<Database>,
        jobs: mpsc::UnboundedReceiver<AnchorJob>,
        pinner: Arc<dyn CredentialPinner>,
        registry: Option<Arc<dyn CredentialRegistry>>,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        Self {
            db,
            jobs,
            pinner,
            registry,
            outcomes,
        }
    }

    /// Receive outcomes of jobs completed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AnchorOutcome> {
        self.outcomes.subscribe()
    }

    /// Run until cancelled or until every queue sender is dropped.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(chain_configured = self.registry.is_some(), "Anchor worker starting");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Anchor worker shutting down");
                    return;
                }
                job = self.jobs.recv() => match job {
                    Some(job) => self.spawn_job(job),
                    None => {
                        info!("Anchor queue closed; worker exiting");
                        return;
                    }
                },
            }
        }
    }

    fn spawn_job(&self, job: AnchorJob) {
        let db = Arc::clone(&self.db);
        let pinner = Arc::clone(&self.pinner);
        let registry = self.registry.clone();
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            let update = anchor_job(&db, pinner.as_ref(), registry.as_deref(), &job).await;

            match CredentialRepository::new(&db).record_anchor(&job.credential_id, &update, Utc::now()) {
                Ok(_) => match &update {
                    AnchorUpdate::Confirmed { tx_hash, ipfs_hash, .. } => info!(
                        credential_id = %job.credential_id,
                        tx_hash = %tx_hash,
                        ipfs_hash = %ipfs_hash,
                        "Credential anchored"
                    ),
                    AnchorUpdate::Failed { error, .. } => warn!(
                        credential_id = %job.credential_id,
                        error = %error,
                        "Credential anchoring failed"
                    ),
                },
                Err(e) => warn!(
                    credential_id = %job.credential_id,
                    error = %e,
                    "Failed to record anchor outcome"
                ),
            }

            // No subscribers is fine
            let _ = outcomes.send(AnchorOutcome {
                credential_id: job.credential_id,
                update,
            });
        });
    }
}

/// Pin then anchor one credential. Never errors; failures become
/// [`AnchorUpdate::Failed`].
///
/// A credential revoked while queued is never written to the contract, since
/// anchoring would reopen its (student, subject) slot.
async fn anchor_job(
    db: &Database,
    pinner: &dyn CredentialPinner,
    registry: Option<&dyn CredentialRegistry>,
    job: &AnchorJob,
) -> AnchorUpdate {
    let Some(registry) = registry else {
        return AnchorUpdate::Failed {
            error: ChainError::NotConfigured.to_string(),
            ipfs_hash: None,
        };
    };

    if let Some(update) = revoked_before_anchor(db, job, None) {
        return update;
    }

    let ipfs_hash = match pinner.pin_credential(&job.vc_json, &job.credential_id).await {
        Ok(cid) => cid,
        Err(e) => {
            return AnchorUpdate::Failed {
                error: e.to_string(),
                ipfs_hash: None,
            }
        }
    };

    if let Some(update) = revoked_before_anchor(db, job, Some(&ipfs_hash)) {
        return update;
    }

    match registry
        .anchor_credential(&job.student_address, &job.subject, &job.vc_hash, &ipfs_hash)
        .await
    {
        Ok(tx_hash) => AnchorUpdate::Confirmed {
            tx_hash,
            ipfs_hash,
            issuer_address: registry.issuer_address(),
        },
        Err(e) => AnchorUpdate::Failed {
            error: e.to_string(),
            ipfs_hash: Some(ipfs_hash),
        },
    }
}

fn revoked_before_anchor(db: &Database, job: &AnchorJob, ipfs_hash: Option<&str>) -> Option<AnchorUpdate> {
    match CredentialRepository::new(db).get(&job.credential_id) {
        Ok(credential) if credential.is_revoked => {
            warn!(credential_id = %job.credential_id, "Skipping anchor for revoked credential");
            Some(AnchorUpdate::Failed {
                error: REVOKED_BEFORE_ANCHOR.to_string(),
                ipfs_hash: ipfs_hash.map(str::to_string),
            })
        }
        Ok(_) => None,
        Err(e) => Some(AnchorUpdate::Failed {
            error: e.to_string(),
            ipfs_hash: ipfs_hash.map(str::to_string),
        }),
    }
}
