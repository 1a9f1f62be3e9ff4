// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exam schedule repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{Database, StorageError, StorageResult, EXAM_SCHEDULES};
use super::super::OwnedResource;

/// Exam status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Scheduled,
    Ongoing,
    Completed,
    /// Terminal; set on delete
    Cancelled,
}

/// Exam schedule document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredExamSchedule {
    pub id: String,
    pub subject: String,
    /// e.g. `midterm`, `final`, `quiz`
    pub exam_type: String,
    pub exam_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub total_marks: u32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub academic_year: String,
    pub semester: u8,
    pub status: ExamStatus,
    pub teacher_did: String,
    pub teacher_address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for StoredExamSchedule {
    fn owner_address(&self) -> &str {
        &self.teacher_address
    }

    fn resource_kind(&self) -> &'static str {
        "Exam schedule"
    }
}

/// Fields a teacher may change on an existing exam.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamScheduleUpdate {
    pub exam_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub total_marks: Option<u32>,
    pub venue: Option<String>,
    pub instructions: Option<String>,
    pub status: Option<ExamStatus>,
}

impl ExamScheduleUpdate {
    fn apply(&self, exam: &mut StoredExamSchedule) {
        if let Some(date) = self.exam_date {
            exam.exam_date = date;
        }
        if let Some(duration) = self.duration_minutes {
            exam.duration_minutes = duration;
        }
        if let Some(total) = self.total_marks {
            exam.total_marks = total;
        }
        if let Some(venue) = &self.venue {
            exam.venue = Some(venue.clone());
        }
        if let Some(instructions) = &self.instructions {
            exam.instructions = Some(instructions.clone());
        }
        if let Some(status) = self.status {
            exam.status = status;
        }
    }
}

/// Repository for exam schedules.
pub struct ExamRepository<'a> {
    db: &'a Database,
}

impl<'a> ExamRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, exam: &StoredExamSchedule) -> StorageResult<()> {
        self.db.insert_json(EXAM_SCHEDULES, &exam.id, exam)
    }

    /// Get an exam that has not been deleted.
    pub fn get_active(&self, id: &str) -> StorageResult<StoredExamSchedule> {
        self.db
            .get_json::<StoredExamSchedule>(EXAM_SCHEDULES, id)?
            .filter(|e| e.is_active)
            .ok_or_else(|| StorageError::NotFound(format!("Exam schedule {id}")))
    }

    /// A teacher's active exams, soonest first.
    pub fn list_by_teacher(&self, teacher_address: &str) -> StorageResult<Vec<StoredExamSchedule>> {
        let mut exams = self.db.scan_json(EXAM_SCHEDULES, |e: &StoredExamSchedule| {
            e.is_active && e.teacher_address.eq_ignore_ascii_case(teacher_address)
        })?;
        exams.sort_by_key(|e| e.exam_date);
        Ok(exams)
    }

    /// Active, not-yet-finished exams on or after `from`, soonest first.
    pub fn list_upcoming(
        &self,
        from: DateTime<Utc>,
        subject: Option<&str>,
    ) -> StorageResult<Vec<StoredExamSchedule>> {
        let mut exams = self.db.scan_json(EXAM_SCHEDULES, |e: &StoredExamSchedule| {
            e.is_active
                && matches!(e.status, ExamStatus::Scheduled | ExamStatus::Ongoing)
                && e.exam_date >= from
                && subject.is_none_or(|s| e.subject.eq_ignore_ascii_case(s))
        })?;
        exams.sort_by_key(|e| e.exam_date);
        Ok(exams)
    }

    /// Apply an allow-listed update to an active, non-cancelled exam.
    pub fn update(&self, id: &str, update: &ExamScheduleUpdate) -> StorageResult<StoredExamSchedule> {
        self.db
            .update_json(EXAM_SCHEDULES, id, |e: &mut StoredExamSchedule| {
                if !e.is_active {
                    return Err(StorageError::NotFound(format!("Exam schedule {id}")));
                }
                if e.status == ExamStatus::Cancelled {
                    return Err(StorageError::Conflict("Exam is cancelled".into()));
                }
                update.apply(e);
                e.updated_at = Utc::now();
                Ok(())
            })
            .map_err(|e| not_found_as_exam(e, id))
    }

    /// Soft delete: `isActive=false`, `status=cancelled`.
    ///
    /// Deleting an already deleted exam reports `NotFound`.
    pub fn soft_delete(&self, id: &str) -> StorageResult<StoredExamSchedule> {
        self.db
            .update_json(EXAM_SCHEDULES, id, |e: &mut StoredExamSchedule| {
                if !e.is_active {
                    return Err(StorageError::NotFound(format!("Exam schedule {id}")));
                }
                e.is_active = false;
                e.status = ExamStatus::Cancelled;
                e.updated_at = Utc::now();
                Ok(())
            })
            .map_err(|e| not_found_as_exam(e, id))
    }
}

fn not_found_as_exam(err: StorageError, id: &str) -> StorageError {
    match err {
        StorageError::NotFound(_) => StorageError::NotFound(format!("Exam schedule {id}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::new_object_id;
    use chrono::Duration;

    const TEACHER: &str = "0x2222222222222222222222222222222222222222";

    fn exam(subject: &str, in_days: i64) -> StoredExamSchedule {
        let now = Utc::now();
        StoredExamSchedule {
            id: new_object_id(),
            subject: subject.into(),
            exam_type: "midterm".into(),
            exam_date: now + Duration::days(in_days),
            duration_minutes: 90,
            total_marks: 100,
            venue: Some("Hall A".into()),
            instructions: None,
            academic_year: "2024-2025".into(),
            semester: 1,
            status: ExamStatus::Scheduled,
            teacher_did: format!("did:ethr:{TEACHER}"),
            teacher_address: TEACHER.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn delete_sets_inactive_and_cancelled_then_not_found() {
        let db = Database::in_memory().unwrap();
        let repo = ExamRepository::new(&db);
        let e = exam("Mathematics", 3);
        repo.create(&e).unwrap();

        let deleted = repo.soft_delete(&e.id).unwrap();
        assert!(!deleted.is_active);
        assert_eq!(deleted.status, ExamStatus::Cancelled);

        assert!(matches!(repo.soft_delete(&e.id), Err(StorageError::NotFound(_))));
        assert!(matches!(repo.get_active(&e.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn update_is_allow_listed() {
        let db = Database::in_memory().unwrap();
        let repo = ExamRepository::new(&db);
        let e = exam("Mathematics", 3);
        repo.create(&e).unwrap();

        let update: ExamScheduleUpdate = serde_json::from_value(serde_json::json!({
            "venue": "Hall B",
            "durationMinutes": 120,
            "teacherAddress": "0x9999999999999999999999999999999999999999",
            "isActive": false
        }))
        .unwrap();
        let updated = repo.update(&e.id, &update).unwrap();

        assert_eq!(updated.venue.as_deref(), Some("Hall B"));
        assert_eq!(updated.duration_minutes, 120);
        assert_eq!(updated.teacher_address, TEACHER);
        assert!(updated.is_active);
    }

    #[test]
    fn cancelled_exam_cannot_be_updated() {
        let db = Database::in_memory().unwrap();
        let repo = ExamRepository::new(&db);
        let e = exam("Mathematics", 3);
        repo.create(&e).unwrap();

        repo.update(
            &e.id,
            &ExamScheduleUpdate {
                status: Some(ExamStatus::Cancelled),
                ..Default::default()
            },
        )
        .unwrap();
        let result = repo.update(
            &e.id,
            &ExamScheduleUpdate {
                venue: Some("Hall C".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn upcoming_excludes_past_cancelled_and_deleted() {
        let db = Database::in_memory().unwrap();
        let repo = ExamRepository::new(&db);

        let soon = exam("Mathematics", 1);
        let later = exam("Physics", 5);
        let past = exam("Chemistry", -2);
        let deleted = exam("Biology", 2);
        for e in [&soon, &later, &past, &deleted] {
            repo.create(e).unwrap();
        }
        repo.soft_delete(&deleted.id).unwrap();

        let upcoming = repo.list_upcoming(Utc::now(), None).unwrap();
        let ids: Vec<_> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![soon.id.as_str(), later.id.as_str()]);

        let physics = repo.list_upcoming(Utc::now(), Some("physics")).unwrap();
        assert_eq!(physics.len(), 1);

        assert_eq!(repo.list_by_teacher(TEACHER).unwrap().len(), 3);
    }
}
