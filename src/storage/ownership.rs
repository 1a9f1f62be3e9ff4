// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for wallet-scoped documents.
//!
//! Documents that belong to a single wallet (credentials for students,
//! exam schedules for teachers, notifications for recipients) implement
//! [`OwnedResource`]. A mismatch is reported as not found so callers cannot
//! probe for other users' documents.

use super::{StorageError, StorageResult};

/// Trait for resources that have an owning wallet.
pub trait OwnedResource {
    /// Lowercase wallet address of the owner.
    fn owner_address(&self) -> &str;

    /// Human-readable kind used in not-found messages.
    fn resource_kind(&self) -> &'static str;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that `wallet_address` owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if the wallet doesn't own the resource.
    fn verify_ownership(&self, wallet_address: &str) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, wallet_address: &str) -> StorageResult<()> {
        if self.owner_address().eq_ignore_ascii_case(wallet_address) {
            Ok(())
        } else {
            Err(StorageError::NotFound(self.resource_kind().to_string()))
        }
    }
}

/// Extension trait for ownership verification on lookups.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the resource if authorized.
    fn verify_owner(self, wallet_address: &str) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<T> {
    fn verify_owner(self, wallet_address: &str) -> StorageResult<T> {
        let resource = self?;
        resource.verify_ownership(wallet_address)?;
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestResource {
        owner: String,
    }

    impl OwnedResource for TestResource {
        fn owner_address(&self) -> &str {
            &self.owner
        }

        fn resource_kind(&self) -> &'static str {
            "Test resource"
        }
    }

    const OWNER: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    #[test]
    fn ownership_passes_for_owner_in_any_case() {
        let resource = TestResource {
            owner: OWNER.to_string(),
        };
        assert!(resource.verify_ownership(OWNER).is_ok());
        assert!(resource
            .verify_ownership("0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD")
            .is_ok());
    }

    #[test]
    fn ownership_fails_as_not_found_for_other_wallet() {
        let resource = TestResource {
            owner: OWNER.to_string(),
        };
        let result = resource.verify_ownership("0x2222222222222222222222222222222222222222");
        assert!(matches!(result, Err(StorageError::NotFound(kind)) if kind == "Test resource"));
    }

    #[test]
    fn ownership_check_on_result() {
        let ok: StorageResult<TestResource> = Ok(TestResource {
            owner: OWNER.to_string(),
        });
        assert!(ok.verify_owner(OWNER).is_ok());

        let missing: StorageResult<TestResource> = Err(StorageError::NotFound("x".into()));
        assert!(matches!(missing.verify_owner(OWNER), Err(StorageError::NotFound(_))));
    }
}
