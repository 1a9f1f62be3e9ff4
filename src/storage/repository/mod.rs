// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document database.
//!
//! Each repository provides the operations for one entity type on top of
//! the shared [`Database`](super::Database).

pub mod credentials;
pub mod exams;
pub mod notifications;
pub mod teacher_subjects;
pub mod users;

pub use credentials::{
    AnchorStatus, AnchorUpdate, CredentialFilter, CredentialRepository, StoredCredential,
};
pub use exams::{ExamRepository, ExamScheduleUpdate, ExamStatus, StoredExamSchedule};
pub use notifications::{
    NotificationRepository, NotificationType, RelatedEntity, StoredNotification,
};
pub use teacher_subjects::{StoredTeacherSubject, TeacherSubjectRepository};
pub use users::{ProfileUpdate, StoredUser, UserRepository, UserResponse};
