// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! The token only proves identity. The user is re-loaded on every request,
//! so deactivation and role changes take effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;
use crate::storage::UserRepository;

/// Extractor for authenticated users.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_credentials(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<StoredCredential>>, ApiError> {
///     // user.wallet_address scopes the query
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = authenticate(token, state)?;
        Ok(Auth(user))
    }
}

/// Verify a session token and load the current user.
pub fn authenticate(token: &str, state: &AppState) -> Result<AuthenticatedUser, AuthError> {
    let claims = state.tokens.verify(token)?;

    let user = UserRepository::new(&state.db)
        .get(&claims.sub)
        .map_err(|e| match e {
            crate::storage::StorageError::NotFound(_) => AuthError::UserNotFound,
            other => other.into(),
        })?;

    if !user.is_active {
        return Err(AuthError::AccountDeactivated);
    }

    Ok(AuthenticatedUser::from_user(&user))
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    required: Role,
) -> Result<AuthenticatedUser, AuthError> {
    let Auth(user) = Auth::from_request_parts(parts, state).await?;
    if !user.has_role(required) {
        tracing::debug!(user_id = %user.user_id, role = %user.role, required = %required, "Role check failed");
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(user)
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(AdminOnly)
    }
}

/// Extractor that requires teacher role (admins pass).
pub struct TeacherOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for TeacherOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Teacher).await.map(TeacherOnly)
    }
}

/// Extractor that requires student role (admins pass).
pub struct StudentOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for StudentOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Student).await.map(StudentOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{bearer_parts, test_state, user_with_role};

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _jobs) = test_state();
        let mut parts = axum::http::Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer_scheme() {
        let (state, _jobs) = test_state();
        let mut parts = axum::http::Request::builder()
            .uri("/test")
            .header("Authorization", "Basic abc")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_loads_stored_user() {
        let (state, _jobs) = test_state();
        let (user, token) = user_with_role(&state, "0x1111111111111111111111111111111111111111", Role::Teacher);
        let mut parts = bearer_parts(&token);

        let Auth(authed) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authed.user_id, user.id);
        assert_eq!(authed.role, Role::Teacher);
    }

    #[tokio::test]
    async fn stored_role_wins_over_token_role() {
        let (state, _jobs) = test_state();
        let (user, token) = user_with_role(&state, "0x1111111111111111111111111111111111111111", Role::Admin);
        UserRepository::new(&state.db).set_role(&user.id, Role::Student).unwrap();

        let mut parts = bearer_parts(&token);
        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn deactivated_user_is_rejected() {
        let (state, _jobs) = test_state();
        let (user, token) = user_with_role(&state, "0x1111111111111111111111111111111111111111", Role::Student);
        UserRepository::new(&state.db).set_active(&user.id, false).unwrap();

        let mut parts = bearer_parts(&token);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::AccountDeactivated)));
    }

    #[tokio::test]
    async fn teacher_only_rejects_student_and_accepts_admin() {
        let (state, _jobs) = test_state();
        let (_, student) = user_with_role(&state, "0x1111111111111111111111111111111111111111", Role::Student);
        let (_, admin) = user_with_role(&state, "0x2222222222222222222222222222222222222222", Role::Admin);

        let result = TeacherOnly::from_request_parts(&mut bearer_parts(&student), &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let result = TeacherOnly::from_request_parts(&mut bearer_parts(&admin), &state).await;
        assert!(result.is_ok());
    }
}
