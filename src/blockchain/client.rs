// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway to the MarkChain registry contract.

use std::str::FromStr;

use alloy::{
    contract::SolCallBuilder,
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};

use super::contract::IMarkChain;
use super::types::*;
use crate::config::ChainConfig;

/// Signing client for the registry contract.
///
/// Built once at startup and shared through `AppState`. Every write waits
/// for its receipt; there are no retries.
pub struct ChainGateway {
    contract: IMarkChain::IMarkChainInstance<DynProvider>,
    provider: DynProvider,
    signer_address: Address,
}

impl ChainGateway {
    /// Create a gateway from configuration.
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;
        let contract_address = parse_address(&config.contract_address)?;
        let signer = Self::create_signer(&config.private_key)?;
        let signer_address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        let contract = IMarkChain::new(contract_address, provider.clone());

        Ok(Self {
            contract,
            provider,
            signer_address,
        })
    }

    /// Create a signer from a hex private key (with or without `0x`).
    pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
        let key_bytes = alloy::hex::decode(private_key_hex.trim())
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

        PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
    }

    /// Lowercase address of the signing account (the credential issuer).
    pub fn signer_address(&self) -> String {
        format!("{:#x}", self.signer_address)
    }

    pub fn contract_address(&self) -> String {
        format!("{:#x}", self.contract.address())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn grant_role(&self, role: &str, account: &str) -> Result<String, ChainError> {
        let role = role_id(role)?;
        let account = parse_address(account)?;
        self.submit("grantRole", self.contract.grantRole(role, account))
            .await
    }

    pub async fn revoke_role(&self, role: &str, account: &str) -> Result<String, ChainError> {
        let role = role_id(role)?;
        let account = parse_address(account)?;
        self.submit("revokeRole", self.contract.revokeRole(role, account))
            .await
    }

    pub async fn register_did(&self, user: &str, did: &str) -> Result<String, ChainError> {
        let user = parse_address(user)?;
        self.submit("registerDID", self.contract.registerDID(user, did.to_string()))
            .await
    }

    pub async fn issue_or_update_credential(
        &self,
        student: &str,
        subject: &str,
        vc_hash: &str,
        ipfs_hash: &str,
    ) -> Result<String, ChainError> {
        let student = parse_address(student)?;
        let vc_hash = parse_hash(vc_hash)?;
        self.submit(
            "issueOrUpdateCredential",
            self.contract.issueOrUpdateCredential(
                student,
                subject.to_string(),
                vc_hash,
                ipfs_hash.to_string(),
            ),
        )
        .await
    }

    pub async fn revoke_credential(&self, student: &str, subject: &str) -> Result<String, ChainError> {
        let student = parse_address(student)?;
        self.submit(
            "revokeCredential",
            self.contract.revokeCredential(student, subject.to_string()),
        )
        .await
    }

    pub async fn assign_subject_to_teacher(
        &self,
        teacher: &str,
        subject: &str,
    ) -> Result<String, ChainError> {
        let teacher = parse_address(teacher)?;
        self.submit(
            "assignSubjectToTeacher",
            self.contract.assignSubjectToTeacher(teacher, subject.to_string()),
        )
        .await
    }

    pub async fn remove_subject_from_teacher(
        &self,
        teacher: &str,
        subject: &str,
    ) -> Result<String, ChainError> {
        let teacher = parse_address(teacher)?;
        self.submit(
            "removeSubjectFromTeacher",
            self.contract.removeSubjectFromTeacher(teacher, subject.to_string()),
        )
        .await
    }

    /// Send a contract call, wait for one confirmation and return the tx hash.
    async fn submit<C: SolCall>(
        &self,
        operation: &'static str,
        call: SolCallBuilder<&DynProvider, C>,
    ) -> Result<String, ChainError> {
        tracing::debug!(operation, "Submitting contract transaction");

        let pending = call
            .send()
            .await
            .map_err(|e| ChainError::Contract(format!("{operation}: {e}")))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(format!("{operation} receipt: {e}")))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        if !receipt.status() {
            tracing::warn!(operation, tx_hash = %tx_hash, "Contract transaction reverted");
            return Err(ChainError::Reverted { operation, tx_hash });
        }

        tracing::info!(operation, tx_hash = %tx_hash, "Contract transaction confirmed");
        Ok(tx_hash)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn has_role(&self, role: &str, account: &str) -> Result<bool, ChainError> {
        let role = role_id(role)?;
        let account = parse_address(account)?;
        self.contract
            .hasRole(role, account)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    pub async fn get_did(&self, user: &str) -> Result<String, ChainError> {
        let user = parse_address(user)?;
        self.contract
            .didRegistry(user)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    pub async fn get_student_subject_credential(
        &self,
        student: &str,
        subject: &str,
    ) -> Result<OnChainCredential, ChainError> {
        let student = parse_address(student)?;
        let record = self
            .contract
            .getStudentSubjectCredential(student, subject.to_string())
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(OnChainCredential {
            vc_hash: format!("{:?}", record.vcHash),
            ipfs_hash: record.ipfsHash,
            issuer: format!("{:#x}", record.issuer),
            issued_at: record.issuedAt.saturating_to::<u64>(),
            revoked: record.revoked,
        })
    }

    /// Enumerate a teacher's on-chain subjects.
    ///
    /// Probes indices until a call fails or returns an empty string, capped at
    /// [`MAX_TEACHER_SUBJECT_PROBES`].
    pub async fn get_teacher_subjects(&self, teacher: &str) -> Result<Vec<String>, ChainError> {
        let teacher = parse_address(teacher)?;
        let mut subjects = Vec::new();
        for index in 0..MAX_TEACHER_SUBJECT_PROBES {
            match self
                .contract
                .teacherSubjects(teacher, U256::from(index))
                .call()
                .await
            {
                Ok(subject) if !subject.is_empty() => subjects.push(subject),
                Ok(_) => break,
                Err(e) => {
                    tracing::debug!(index, error = %e, "teacherSubjects probe stopped");
                    break;
                }
            }
        }
        Ok(subjects)
    }

    /// Get the current block number.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

fn parse_address(raw: &str) -> Result<Address, ChainError> {
    Address::from_str(raw.trim()).map_err(|e| ChainError::InvalidAddress(format!("{raw}: {e}")))
}

/// Parse a 32-byte hex hash with or without `0x`.
fn parse_hash(raw: &str) -> Result<B256, ChainError> {
    let bytes = alloy::hex::decode(raw.trim()).map_err(|e| ChainError::InvalidHash(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(ChainError::InvalidHash(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}
