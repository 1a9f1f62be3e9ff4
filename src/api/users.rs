// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-user endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{ProfileUpdate, UserRepository, UserResponse},
};

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let stored = UserRepository::new(&state.db).get(&user.user_id)?;
    Ok(Json(stored.into()))
}

/// Update the current user's profile.
///
/// Only `name`, `studentId` and `email` can be changed; an empty string
/// clears the field.
#[utoipa::path(
    put,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn update_current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = UserRepository::new(&state.db).update_profile(&user.user_id, &update)?;
    tracing::info!(user_id = %user.user_id, "Profile updated");
    Ok(Json(updated.into()))
}
