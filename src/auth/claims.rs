// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Claims carried by a MarkChain session token (HS256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,

    /// Lowercase wallet address
    pub wallet_address: String,

    pub did: String,

    /// Role at issuance; informational only, the stored role is authoritative
    pub role: Role,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated user information.
///
/// Built from the stored user after the session token is verified, so the
/// role reflects the database rather than the token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Canonical user id
    pub user_id: String,

    pub wallet_address: String,

    pub did: String,

    /// Current stored role
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_user(user: &StoredUser) -> Self {
        Self {
            user_id: user.id.clone(),
            wallet_address: user.wallet_address.clone(),
            did: user.did.clone(),
            role: user.role,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "65a1b2c3d4e5f60718293a4b".to_string(),
            wallet_address: "0x1111111111111111111111111111111111111111".to_string(),
            did: "did:ethr:0x1111111111111111111111111111111111111111".to_string(),
            role,
        }
    }

    #[test]
    fn has_role_checks_privilege() {
        let admin = sample_user(Role::Admin);
        assert!(admin.is_admin());
        assert!(admin.has_role(Role::Teacher));

        let teacher = sample_user(Role::Teacher);
        assert!(!teacher.is_admin());
        assert!(teacher.has_role(Role::Teacher));
        assert!(!teacher.has_role(Role::Student));
    }

    #[test]
    fn claims_use_camel_case_wallet_field() {
        let claims = SessionClaims {
            sub: "id".into(),
            wallet_address: "0xabc".into(),
            did: "did:ethr:0xabc".into(),
            role: Role::Student,
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["walletAddress"], "0xabc");
        assert_eq!(json["role"], "STUDENT");
    }
}
