// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbox endpoints. Every operation is scoped to the caller's wallet; another
//! user's notification is reported as not found.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{validate_object_id, SuccessResponse},
    state::AppState,
    storage::{NotificationRepository, StoredNotification},
};

/// Default page size for the inbox.
const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum number of results (default 50, max 200)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub updated: usize,
}

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Notifications",
    params(NotificationQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, body = [StoredNotification]))
)]
pub async fn list_notifications(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<StoredNotification>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let items = NotificationRepository::new(&state.db).list_for_recipient(
        &user.wallet_address,
        query.unread_only,
        Some(limit),
    )?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/v1/notifications/unread-count",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, body = UnreadCountResponse))
)]
pub async fn unread_count(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = NotificationRepository::new(&state.db).unread_count(&user.wallet_address)?;
    Ok(Json(UnreadCountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = StoredNotification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    Auth(user): Auth,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredNotification>, ApiError> {
    let id = validate_object_id(&id)?;
    let notification = NotificationRepository::new(&state.db).mark_read(id, &user.wallet_address)?;
    Ok(Json(notification))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = NotificationRepository::new(&state.db).mark_all_read(&user.wallet_address)?;
    Ok(Json(MarkAllReadResponse {
        success: true,
        updated,
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/notifications/{id}",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = SuccessResponse),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    Auth(user): Auth,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let id = validate_object_id(&id)?;
    NotificationRepository::new(&state.db).delete(id, &user.wallet_address)?;
    Ok((StatusCode::OK, Json(SuccessResponse::ok("Notification deleted"))))
}
