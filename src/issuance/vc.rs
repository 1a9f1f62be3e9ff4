// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verifiable credential documents and their content hash.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const VC_TYPES: [&str; 2] = ["VerifiableCredential", "AcademicCredential"];

/// Letter grade for a mark out of 100.
pub fn grade_for_marks(marks: u32) -> &'static str {
    match marks {
        90.. => "A+",
        80..=89 => "A",
        70..=79 => "B",
        60..=69 => "C",
        50..=59 => "D",
        _ => "F",
    }
}

/// Inputs for one academic credential.
#[derive(Debug, Clone)]
pub struct AcademicAchievement<'a> {
    pub student_did: &'a str,
    pub student_address: &'a str,
    pub issuer_did: &'a str,
    pub institution: &'a str,
    pub subject: &'a str,
    pub marks: u32,
    pub grade: &'a str,
    pub exam_type: &'a str,
    pub academic_year: &'a str,
    pub semester: u8,
}

/// Build the credential JSON with a fresh `urn:uuid` id.
pub fn build_credential(achievement: &AcademicAchievement<'_>, issued_at: DateTime<Utc>) -> Value {
    json!({
        "@context": [VC_CONTEXT],
        "id": format!("urn:uuid:{}", uuid::Uuid::new_v4()),
        "type": VC_TYPES,
        "issuer": {
            "id": achievement.issuer_did,
            "name": achievement.institution,
        },
        "issuanceDate": issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "credentialSubject": {
            "id": achievement.student_did,
            "walletAddress": achievement.student_address,
            "achievement": {
                "subject": achievement.subject,
                "marks": achievement.marks,
                "grade": achievement.grade,
                "examType": achievement.exam_type,
                "academicYear": achievement.academic_year,
                "semester": achievement.semester,
                "institution": achievement.institution,
            }
        }
    })
}

/// Lowercase hex SHA-256 of the RFC 8785 canonical form of `vc`.
pub fn vc_hash(vc: &Value) -> Result<String, serde_json::Error> {
    let canonical = serde_jcs::to_vec(vc)?;
    Ok(alloy::hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn achievement(marks: u32) -> AcademicAchievement<'static> {
        AcademicAchievement {
            student_did: "did:ethr:0x1111111111111111111111111111111111111111",
            student_address: "0x1111111111111111111111111111111111111111",
            issuer_did: "did:ethr:0x2222222222222222222222222222222222222222",
            institution: "MarkChain University",
            subject: "Mathematics",
            marks,
            grade: grade_for_marks(marks),
            exam_type: "final",
            academic_year: "2024-2025",
            semester: 1,
        }
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_for_marks(100), "A+");
        assert_eq!(grade_for_marks(90), "A+");
        assert_eq!(grade_for_marks(89), "A");
        assert_eq!(grade_for_marks(80), "A");
        assert_eq!(grade_for_marks(70), "B");
        assert_eq!(grade_for_marks(60), "C");
        assert_eq!(grade_for_marks(50), "D");
        assert_eq!(grade_for_marks(49), "F");
        assert_eq!(grade_for_marks(0), "F");
    }

    #[test]
    fn credential_shape() {
        let vc = build_credential(&achievement(88), Utc::now());
        assert_eq!(vc["@context"][0], VC_CONTEXT);
        assert_eq!(vc["type"], json!(["VerifiableCredential", "AcademicCredential"]));
        assert!(vc["id"].as_str().unwrap().starts_with("urn:uuid:"));
        assert_eq!(vc["issuer"]["name"], "MarkChain University");
        assert_eq!(vc["credentialSubject"]["achievement"]["marks"], 88);
        assert_eq!(vc["credentialSubject"]["achievement"]["grade"], "A");
        assert_eq!(vc["credentialSubject"]["achievement"]["semester"], 1);
    }

    #[test]
    fn each_credential_gets_a_fresh_id() {
        let now = Utc::now();
        let a = build_credential(&achievement(70), now);
        let b = build_credential(&achievement(70), now);
        assert_ne!(a["id"], b["id"]);
        assert_ne!(vc_hash(&a).unwrap(), vc_hash(&b).unwrap());
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = json!({"b": 2, "a": {"y": "x", "c": [1, 2]}});
        let b = json!({"a": {"c": [1, 2], "y": "x"}, "b": 2});
        assert_eq!(vc_hash(&a).unwrap(), vc_hash(&b).unwrap());
    }

    #[test]
    fn hash_is_sha256_of_canonical_bytes() {
        // sha256("{}")
        assert_eq!(
            vc_hash(&json!({})).unwrap(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
