// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Document-style persistence on an embedded **redb** database. Each entity
//! is stored as a JSON document keyed by a 24-character hex id, with
//! secondary index tables for unique lookups.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/markchain.redb
//!   users                  + user_wallet_index
//!   credentials            + credential_hash_index
//!   teacher_subjects       + teacher_subject_index
//!   exam_schedules
//!   notifications
//! ```
//!
//! Repositories borrow the [`Database`] and expose typed operations. Any
//! read-check-write rule (single-use nonce, revoke-once, anchor transition,
//! unique assignment) is evaluated inside one write transaction.

pub mod database;
pub mod ownership;
pub mod repository;

pub use database::{new_object_id, Database, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipEnforcer};
pub use repository::{
    AnchorStatus, AnchorUpdate, CredentialFilter, CredentialRepository, ExamRepository,
    ExamScheduleUpdate, ExamStatus, NotificationRepository, NotificationType, ProfileUpdate,
    RelatedEntity, StoredCredential, StoredExamSchedule, StoredNotification, StoredTeacherSubject,
    StoredUser, TeacherSubjectRepository, UserRepository, UserResponse,
};
