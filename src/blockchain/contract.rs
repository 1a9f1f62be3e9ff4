// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MarkChain registry contract interface.
//!
//! Only the functions the service calls are declared; the contract itself is
//! operated externally.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IMarkChain {
        // Access control
        function grantRole(bytes32 role, address account) external;
        function revokeRole(bytes32 role, address account) external;
        function hasRole(bytes32 role, address account) external view returns (bool);

        // DID registry
        function registerDID(address user, string did) external;
        function didRegistry(address user) external view returns (string);

        // Credentials
        function issueOrUpdateCredential(address student, string subject, bytes32 vcHash, string ipfsHash) external;
        function revokeCredential(address student, string subject) external;
        function getStudentSubjectCredential(address student, string subject)
            external
            view
            returns (bytes32 vcHash, string ipfsHash, address issuer, uint256 issuedAt, bool revoked);

        // Teacher subjects
        function assignSubjectToTeacher(address teacher, string subject) external;
        function removeSubjectFromTeacher(address teacher, string subject) external;
        function teacherSubjects(address teacher, uint256 index) external view returns (string);
    }
}
