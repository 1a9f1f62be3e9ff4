// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Notification Fan-out
//!
//! Writes inbox rows for users affected by a mutation. Delivery is
//! best-effort: a failed write is logged and never fails the mutation that
//! triggered it.
//!
//! ```rust,ignore
//! let notice = Notice::new(NotificationType::CredentialIssued, "New credential", msg)
//!     .from_sender(&teacher.did)
//!     .about("credential", &credential.id);
//! notify(&db, &student.did, Some(&student.wallet_address), &notice);
//! ```

use chrono::Utc;
use serde_json::Value;

use crate::auth::Role;
use crate::storage::{
    new_object_id, Database, NotificationRepository, NotificationType, RelatedEntity,
    StorageError, StorageResult, StoredNotification, StoredUser, UserRepository,
};

/// Content of a notification, independent of its recipient.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub sender_did: Option<String>,
    pub related_entity: Option<RelatedEntity>,
    pub metadata: Value,
}

impl Notice {
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            sender_did: None,
            related_entity: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn from_sender(mut self, sender_did: &str) -> Self {
        self.sender_did = Some(sender_did.to_string());
        self
    }

    pub fn about(mut self, kind: &str, id: &str) -> Self {
        self.related_entity = Some(RelatedEntity::new(kind, id));
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

fn deliver(
    db: &Database,
    recipient_did: &str,
    recipient_address: Option<&str>,
    notice: &Notice,
) -> StorageResult<StoredNotification> {
    let recipient_address = match recipient_address {
        Some(address) => address.to_ascii_lowercase(),
        None => UserRepository::new(db)
            .find_by_did(recipient_did)?
            .map(|u| u.wallet_address)
            .ok_or_else(|| StorageError::NotFound(format!("User with DID {recipient_did}")))?,
    };

    let notification = StoredNotification {
        id: new_object_id(),
        recipient_did: recipient_did.to_string(),
        recipient_address,
        notification_type: notice.kind,
        title: notice.title.clone(),
        message: notice.message.clone(),
        sender_did: notice.sender_did.clone(),
        related_entity: notice.related_entity.clone(),
        metadata: notice.metadata.clone(),
        is_read: false,
        read_at: None,
        created_at: Utc::now(),
    };
    NotificationRepository::new(db).create(&notification)?;
    Ok(notification)
}

/// Write one notification. The wallet address is resolved from the DID
/// when omitted. Returns `None` if the write failed.
pub fn notify(
    db: &Database,
    recipient_did: &str,
    recipient_address: Option<&str>,
    notice: &Notice,
) -> Option<StoredNotification> {
    match deliver(db, recipient_did, recipient_address, notice) {
        Ok(notification) => {
            tracing::debug!(
                notification_id = %notification.id,
                recipient = %notification.recipient_address,
                kind = ?notice.kind,
                "Notification created"
            );
            Some(notification)
        }
        Err(e) => {
            tracing::warn!(recipient_did, kind = ?notice.kind, error = %e, "Failed to create notification");
            None
        }
    }
}

pub fn notify_user(db: &Database, user: &StoredUser, notice: &Notice) -> Option<StoredNotification> {
    notify(db, &user.did, Some(&user.wallet_address), notice)
}

/// Send `notice` to every active student. Returns how many were written.
pub fn notify_active_students(db: &Database, notice: &Notice) -> usize {
    let students = match UserRepository::new(db).list(Some(Role::Student), true) {
        Ok(students) => students,
        Err(e) => {
            tracing::warn!(kind = ?notice.kind, error = %e, "Failed to list students for fan-out");
            return 0;
        }
    };

    let delivered = students
        .iter()
        .filter(|student| notify_user(db, student, notice).is_some())
        .count();
    tracing::info!(kind = ?notice.kind, delivered, total = students.len(), "Fan-out complete");
    delivered
}
