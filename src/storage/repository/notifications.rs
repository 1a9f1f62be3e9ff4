// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notification repository.
//!
//! Every recipient operation is scoped to the caller's wallet; another
//! wallet's notification is reported as not found.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{Database, StorageError, StorageResult, NOTIFICATIONS};
use super::super::{OwnedResource, OwnershipCheck};

/// Notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    RoleAssigned,
    SubjectAssigned,
    SubjectRemoved,
    CredentialIssued,
    CredentialRevoked,
    ExamScheduled,
    ExamUpdated,
    ExamCancelled,
    AccountStatusChanged,
}

/// Pointer to the document a notification is about.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RelatedEntity {
    /// e.g. `credential`, `exam`, `teacher_subject`
    pub kind: String,
    pub id: String,
}

impl RelatedEntity {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

/// Notification document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    pub id: String,
    pub recipient_did: String,
    pub recipient_address: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity: Option<RelatedEntity>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for StoredNotification {
    fn owner_address(&self) -> &str {
        &self.recipient_address
    }

    fn resource_kind(&self) -> &'static str {
        "Notification"
    }
}

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    db: &'a Database,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, notification: &StoredNotification) -> StorageResult<()> {
        self.db
            .insert_json(NOTIFICATIONS, &notification.id, notification)
    }

    fn get_owned(&self, id: &str, recipient_address: &str) -> StorageResult<StoredNotification> {
        self.db
            .get_json::<StoredNotification>(NOTIFICATIONS, id)?
            .ok_or_else(|| StorageError::NotFound("Notification".into()))
            .verify_owner(recipient_address)
    }

    /// A recipient's notifications, newest first.
    pub fn list_for_recipient(
        &self,
        recipient_address: &str,
        unread_only: bool,
        limit: Option<usize>,
    ) -> StorageResult<Vec<StoredNotification>> {
        let mut items = self.db.scan_json(NOTIFICATIONS, |n: &StoredNotification| {
            n.recipient_address.eq_ignore_ascii_case(recipient_address)
                && (!unread_only || !n.is_read)
        })?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    pub fn unread_count(&self, recipient_address: &str) -> StorageResult<usize> {
        Ok(self.list_for_recipient(recipient_address, true, None)?.len())
    }

    pub fn mark_read(&self, id: &str, recipient_address: &str) -> StorageResult<StoredNotification> {
        // Ownership check first so a foreign id never gets written
        self.get_owned(id, recipient_address)?;
        self.db
            .update_json(NOTIFICATIONS, id, |n: &mut StoredNotification| {
                if !n.is_read {
                    n.is_read = true;
                    n.read_at = Some(Utc::now());
                }
                Ok(())
            })
    }

    /// Mark every unread notification of the recipient as read; returns the count.
    pub fn mark_all_read(&self, recipient_address: &str) -> StorageResult<usize> {
        let now = Utc::now();
        self.db.update_where(
            NOTIFICATIONS,
            |n: &StoredNotification| {
                !n.is_read && n.recipient_address.eq_ignore_ascii_case(recipient_address)
            },
            |n: &mut StoredNotification| {
                n.is_read = true;
                n.read_at = Some(now);
            },
        )
    }

    pub fn delete(&self, id: &str, recipient_address: &str) -> StorageResult<()> {
        self.get_owned(id, recipient_address)?;
        self.db.remove(NOTIFICATIONS, id)
    }
}
