// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Teacher subject assignments.
//!
//! Unique per (teacher, subject code, academic year, semester). Removal is a
//! soft delete; assigning the same tuple again reactivates the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    put_doc, put_index, read_doc, read_index, Database, StorageError, StorageResult,
    TEACHER_SUBJECTS, TEACHER_SUBJECT_INDEX,
};

/// Teacher subject assignment document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredTeacherSubject {
    pub id: String,
    pub teacher_address: String,
    pub teacher_did: String,
    /// Upper-cased subject code, e.g. `MATH101`
    pub subject_code: String,
    pub subject_name: String,
    pub academic_year: String,
    pub semester: u8,
    #[serde(default)]
    pub batches: Vec<String>,
    /// DID of the admin who made the assignment
    pub assigned_by: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTeacherSubject {
    /// Unique-index key for this assignment.
    pub fn assignment_key(&self) -> String {
        assignment_key(
            &self.teacher_address,
            &self.subject_code,
            &self.academic_year,
            self.semester,
        )
    }

    /// Whether this assignment covers `subject` (code or name, any case).
    pub fn covers(&self, subject: &str) -> bool {
        let subject = subject.trim();
        self.subject_code.eq_ignore_ascii_case(subject)
            || self.subject_name.eq_ignore_ascii_case(subject)
    }
}

fn assignment_key(teacher: &str, subject_code: &str, academic_year: &str, semester: u8) -> String {
    format!(
        "{}|{}|{}|{}",
        teacher.to_ascii_lowercase(),
        subject_code.to_ascii_uppercase(),
        academic_year,
        semester
    )
}

/// Repository for teacher subject assignments.
pub struct TeacherSubjectRepository<'a> {
    db: &'a Database,
}

impl<'a> TeacherSubjectRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an assignment, or reactivate a soft-deleted one.
    ///
    /// Fails with `AlreadyExists` if an active assignment holds the tuple.
    pub fn assign(&self, assignment: StoredTeacherSubject) -> StorageResult<StoredTeacherSubject> {
        let key = assignment.assignment_key();
        self.db.write(|txn| {
            if let Some(existing_id) = read_index(txn, TEACHER_SUBJECT_INDEX, &key)? {
                let mut existing: StoredTeacherSubject =
                    read_doc(txn, TEACHER_SUBJECTS, &existing_id)?.ok_or_else(|| {
                        StorageError::NotFound(format!("Subject assignment {existing_id}"))
                    })?;
                if existing.is_active {
                    return Err(StorageError::AlreadyExists("Subject assignment".into()));
                }
                existing.is_active = true;
                existing.subject_name = assignment.subject_name;
                existing.batches = assignment.batches;
                existing.assigned_by = assignment.assigned_by;
                existing.updated_at = assignment.updated_at;
                put_doc(txn, TEACHER_SUBJECTS, &existing.id, &existing)?;
                return Ok(existing);
            }

            put_doc(txn, TEACHER_SUBJECTS, &assignment.id, &assignment)?;
            put_index(txn, TEACHER_SUBJECT_INDEX, &key, &assignment.id)?;
            Ok(assignment)
        })
    }

    pub fn get(&self, id: &str) -> StorageResult<StoredTeacherSubject> {
        self.db
            .get_json(TEACHER_SUBJECTS, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Subject assignment {id}")))
    }

    /// Soft-delete an active assignment.
    pub fn deactivate(&self, id: &str) -> StorageResult<StoredTeacherSubject> {
        self.db
            .update_json(TEACHER_SUBJECTS, id, |a: &mut StoredTeacherSubject| {
                if !a.is_active {
                    return Err(StorageError::NotFound(format!("Subject assignment {id}")));
                }
                a.is_active = false;
                a.updated_at = Utc::now();
                Ok(())
            })
            .map_err(|e| match e {
                StorageError::NotFound(_) => {
                    StorageError::NotFound(format!("Subject assignment {id}"))
                }
                other => other,
            })
    }

    /// Active assignments, optionally for a single teacher.
    pub fn list_active(&self, teacher_address: Option<&str>) -> StorageResult<Vec<StoredTeacherSubject>> {
        let mut assignments = self.db.scan_json(TEACHER_SUBJECTS, |a: &StoredTeacherSubject| {
            a.is_active
                && teacher_address.is_none_or(|t| a.teacher_address.eq_ignore_ascii_case(t))
        })?;
        assignments.sort_by(|a, b| {
            a.subject_code
                .cmp(&b.subject_code)
                .then_with(|| b.academic_year.cmp(&a.academic_year))
        });
        Ok(assignments)
    }

    /// Whether the teacher holds an active assignment covering `subject`.
    pub fn is_teacher_assigned(&self, teacher_address: &str, subject: &str) -> StorageResult<bool> {
        Ok(self
            .list_active(Some(teacher_address))?
            .iter()
            .any(|a| a.covers(subject)))
    }
}
