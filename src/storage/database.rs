// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded document database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → JSON document
//! - `user_wallet_index`: lowercase wallet address → user id
//! - `credentials`: credential id → JSON document
//! - `credential_hash_index`: vc hash → credential id
//! - `teacher_subjects`: assignment id → JSON document
//! - `teacher_subject_index`: `teacher|SUBJECT|year|semester` → assignment id
//! - `exam_schedules`: exam id → JSON document
//! - `notifications`: notification id → JSON document
//!
//! Every mutation runs in a single write transaction, so read-check-write
//! sequences inside one repository call are atomic.

use std::path::Path;

use chrono::Utc;
use redb::{
    backends::InMemoryBackend, Database as RedbDatabase, ReadableDatabase, ReadableTable,
    TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Table holding JSON-serialized documents keyed by id.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Table mapping a lookup key to a document id.
pub type IndexTable = TableDefinition<'static, &'static str, &'static str>;

pub const USERS: JsonTable = TableDefinition::new("users");
pub const USER_WALLET_INDEX: IndexTable = TableDefinition::new("user_wallet_index");
pub const CREDENTIALS: JsonTable = TableDefinition::new("credentials");
pub const CREDENTIAL_HASH_INDEX: IndexTable = TableDefinition::new("credential_hash_index");
pub const TEACHER_SUBJECTS: JsonTable = TableDefinition::new("teacher_subjects");
pub const TEACHER_SUBJECT_INDEX: IndexTable = TableDefinition::new("teacher_subject_index");
pub const EXAM_SCHEDULES: JsonTable = TableDefinition::new("exam_schedules");
pub const NOTIFICATIONS: JsonTable = TableDefinition::new("notifications");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// State precondition failed (already revoked, terminal status, ...).
    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Generate a 24-character hex document id.
///
/// Layout: 4 bytes of creation time (seconds, big-endian) followed by
/// 8 random bytes, so ids sort roughly by creation time.
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    bytes[4..].copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..8]);
    alloy::hex::encode(bytes)
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID document database.
pub struct Database {
    db: RedbDatabase,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::DataDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let db = RedbDatabase::create(path)?;
        Self::with_tables(db)
    }

    /// Volatile database for tests and tooling.
    pub fn in_memory() -> StorageResult<Self> {
        let db = RedbDatabase::builder().create_with_backend(InMemoryBackend::new())?;
        Self::with_tables(db)
    }

    fn with_tables(db: RedbDatabase) -> StorageResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            for table in [USERS, CREDENTIALS, TEACHER_SUBJECTS, EXAM_SCHEDULES, NOTIFICATIONS] {
                let _ = write_txn.open_table(table)?;
            }
            for index in [USER_WALLET_INDEX, CREDENTIAL_HASH_INDEX, TEACHER_SUBJECT_INDEX] {
                let _ = write_txn.open_table(index)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Cheap read probe used by health checks.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    // =========================================================================
    // Document reads
    // =========================================================================

    /// Load a single document.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        id: &str,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve an index key to a document id.
    pub fn lookup(&self, index: IndexTable, key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(index)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Load every document matching `filter`.
    pub fn scan_json<T, F>(&self, table: JsonTable, filter: F) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;

        let mut results = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let doc: T = serde_json::from_slice(value.value())?;
            if filter(&doc) {
                results.push(doc);
            }
        }
        Ok(results)
    }

    // =========================================================================
    // Document writes
    // =========================================================================

    /// Run `f` inside a single write transaction and commit on success.
    pub fn write<R, F>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&WriteTransaction) -> StorageResult<R>,
    {
        let write_txn = self.db.begin_write()?;
        let result = f(&write_txn)?;
        write_txn.commit()?;
        Ok(result)
    }

    /// Insert a new document; fails if the id is taken.
    pub fn insert_json<T: Serialize>(
        &self,
        table: JsonTable,
        id: &str,
        value: &T,
    ) -> StorageResult<()> {
        self.write(|txn| insert_doc(txn, table, id, value))
    }

    /// Read-modify-write a document atomically and return the new version.
    ///
    /// If `mutate` returns an error nothing is written.
    pub fn update_json<T, F>(&self, table: JsonTable, id: &str, mutate: F) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> StorageResult<()>,
    {
        self.write(|txn| {
            let mut doc: T = read_doc(txn, table, id)?
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            mutate(&mut doc)?;
            put_doc(txn, table, id, &doc)?;
            Ok(doc)
        })
    }

    /// Apply `mutate` to every document matching `filter`; returns the count.
    pub fn update_where<T, P, F>(&self, table: JsonTable, filter: P, mutate: F) -> StorageResult<usize>
    where
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
        F: Fn(&mut T),
    {
        self.write(|txn| {
            let mut matched: Vec<(String, T)> = Vec::new();
            {
                let table = txn.open_table(table)?;
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    let doc: T = serde_json::from_slice(value.value())?;
                    if filter(&doc) {
                        matched.push((key.value().to_string(), doc));
                    }
                }
            }

            let count = matched.len();
            for (id, mut doc) in matched {
                mutate(&mut doc);
                put_doc(txn, table, &id, &doc)?;
            }
            Ok(count)
        })
    }

    /// Remove a document; fails if it does not exist.
    pub fn remove(&self, table: JsonTable, id: &str) -> StorageResult<()> {
        self.write(|txn| {
            let mut table = txn.open_table(table)?;
            if table.remove(id)?.is_none() {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }
}

// =============================================================================
// Transaction-scoped helpers (for multi-table writes)
// =============================================================================

/// Read a document inside a write transaction.
pub fn read_doc<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: JsonTable,
    id: &str,
) -> StorageResult<Option<T>> {
    let table = txn.open_table(table)?;
    // Copy the bytes out before the guard borrows the table any further
    let bytes = match table.get(id)? {
        Some(value) => value.value().to_vec(),
        None => return Ok(None),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write (insert or replace) a document inside a write transaction.
pub fn put_doc<T: Serialize>(
    txn: &WriteTransaction,
    table: JsonTable,
    id: &str,
    value: &T,
) -> StorageResult<()> {
    let json = serde_json::to_vec(value)?;
    let mut table = txn.open_table(table)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Insert a document that must not exist yet.
pub fn insert_doc<T: Serialize>(
    txn: &WriteTransaction,
    table: JsonTable,
    id: &str,
    value: &T,
) -> StorageResult<()> {
    {
        let existing = txn.open_table(table)?;
        if existing.get(id)?.is_some() {
            return Err(StorageError::AlreadyExists(format!("Document {id}")));
        }
    }
    put_doc(txn, table, id, value)
}

/// Read an index entry inside a write transaction.
pub fn read_index(
    txn: &WriteTransaction,
    index: IndexTable,
    key: &str,
) -> StorageResult<Option<String>> {
    let table = txn.open_table(index)?;
    let id = table.get(key)?.map(|v| v.value().to_string());
    Ok(id)
}

/// Write an index entry inside a write transaction.
pub fn put_index(
    txn: &WriteTransaction,
    index: IndexTable,
    key: &str,
    id: &str,
) -> StorageResult<()> {
    let mut table = txn.open_table(index)?;
    table.insert(key, id)?;
    Ok(())
}
