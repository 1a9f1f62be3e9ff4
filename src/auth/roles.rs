// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Manages users, subject assignments, revocation and the contract
/// - `Teacher` - Issues credentials and schedules exams for assigned subjects
/// - `Student` - Reads own credentials and upcoming exams (default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Credential issuer
    Teacher,
    /// Credential holder
    Student,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            (Role::Teacher, Role::Teacher) => true,
            (Role::Student, Role::Student) => true,
            _ => false,
        }
    }

    /// Name of the matching contract role (`ADMIN_ROLE`, ...).
    pub fn chain_role_name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN_ROLE",
            Role::Teacher => "TEACHER_ROLE",
            Role::Student => "STUDENT_ROLE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parse role from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "TEACHER" => Ok(Role::Teacher),
            "STUDENT" => Ok(Role::Student),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl Default for Role {
    /// New wallets start as students.
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::Teacher));
        assert!(Role::Admin.has_privilege(Role::Student));
    }

    #[test]
    fn teacher_and_student_are_disjoint() {
        assert!(Role::Teacher.has_privilege(Role::Teacher));
        assert!(!Role::Teacher.has_privilege(Role::Admin));
        assert!(!Role::Teacher.has_privilege(Role::Student));
        assert!(!Role::Student.has_privilege(Role::Teacher));
        assert!(!Role::Student.has_privilege(Role::Admin));
    }

    #[test]
    fn from_str_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("TEACHER".parse::<Role>(), Ok(Role::Teacher));
        assert_eq!("Student".parse::<Role>(), Ok(Role::Student));
        assert!("client".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"TEACHER\"");
        let parsed: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
        assert_eq!(Role::Student.chain_role_name(), "STUDENT_ROLE");
    }
}
