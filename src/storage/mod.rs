// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Profile Storage Module
//!
//! Persistent profile records in an embedded redb database (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! ```text
//! profiles: identity (token sub) → JSON-encoded ProfileRecord
//! ```
//!
//! ## Important Notes
//!
//! - The only key ever used is the caller's verified identity
//! - Every operation is a single redb transaction: a write either commits
//!   fully or leaves the record untouched
//! - redb is synchronous; calls run on the blocking pool with a timeout

use std::time::Duration;

pub mod profiles;

pub use profiles::ProfileStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("profile already exists: {0}")]
    AlreadyExists(String),

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

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
}

pub type StorageResult<T> = Result<T, StorageError>;
