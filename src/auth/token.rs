// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::{claims::SessionClaims, AuthError};
use crate::storage::StoredUser;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Issues and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Sign a token for `user`. Returns the token and its expiry.
    pub fn issue(&self, user: &StoredUser, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.lifetime;
        let claims = SessionClaims {
            sub: user.id.clone(),
            wallet_address: user.wallet_address.clone(),
            did: user.did.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;
        Ok((token, expires_at))
    }

    /// Verify signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime_hours", &self.lifetime.num_hours())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn user() -> StoredUser {
        let now = Utc::now();
        StoredUser {
            id: "65a1b2c3d4e5f60718293a4b".into(),
            wallet_address: "0x1111111111111111111111111111111111111111".into(),
            did: "did:ethr:0x1111111111111111111111111111111111111111".into(),
            role: Role::Teacher,
            nonce: None,
            nonce_issued_at: None,
            name: None,
            student_id: None,
            email: None,
            is_active: true,
            did_registered: false,
            blockchain_role: None,
            assigned_subjects: vec![],
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let tokens = TokenService::new(SECRET, 24);
        let now = Utc::now();
        let (token, expires_at) = tokens.issue(&user(), now).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "65a1b2c3d4e5f60718293a4b");
        assert_eq!(claims.role, Role::Teacher);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let (token, _) = TokenService::new(SECRET, 24).issue(&user(), Utc::now()).unwrap();
        let other = TokenService::new(b"another-secret-another-secret-xx", 24);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(SECRET, 1);
        let (token, _) = tokens
            .issue(&user(), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = TokenService::new(SECRET, 1);
        assert!(matches!(tokens.verify("not.a.jwt"), Err(AuthError::MalformedToken)));
    }
}
