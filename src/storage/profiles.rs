// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-keyed profile store backed by redb.

use std::{path::Path, sync::Arc, time::Duration};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{StorageError, StorageResult};
use crate::{
    auth::VerifiedIdentity,
    models::{ProfileFields, ProfileRecord},
};

/// identity → serialized ProfileRecord (JSON bytes).
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Profile repository.
///
/// Cloning is cheap; clones share the same database handle.
#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<Database>,
    timeout: Duration,
}

impl ProfileStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROFILES)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened profile database");
        Ok(Self {
            db: Arc::new(db),
            timeout: DEFAULT_STORAGE_TIMEOUT,
        })
    }

    /// Upper bound on any single storage call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point lookup of the caller's profile.
    pub async fn get(&self, identity: &VerifiedIdentity) -> StorageResult<ProfileRecord> {
        let id = identity.subject().to_string();
        self.run(move |db| read_profile(db, &id)?.ok_or(StorageError::NotFound(id)))
            .await
    }

    /// Insert the caller's profile. Fails with `AlreadyExists` if one is stored.
    ///
    /// A `Timeout` does not mean nothing was written: the insert may still
    /// commit in the background, and a retried create then gets `AlreadyExists`.
    pub async fn create(
        &self,
        identity: &VerifiedIdentity,
        fields: ProfileFields,
    ) -> StorageResult<ProfileRecord> {
        let record = ProfileRecord::new(identity, fields);
        let created = self.run(move |db| insert_profile(db, record)).await?;
        tracing::info!(subject = %created.id, "Created profile");
        Ok(created)
    }

    /// Update the caller's existing profile. Fails with `NotFound` if absent.
    ///
    /// Concurrent updates for one identity are serialized by redb; the last
    /// committed write wins.
    pub async fn update(
        &self,
        identity: &VerifiedIdentity,
        fields: ProfileFields,
    ) -> StorageResult<ProfileRecord> {
        let id = identity.subject().to_string();
        let updated = self.run(move |db| update_profile(db, &id, fields)).await?;
        tracing::info!(subject = %updated.id, "Updated profile");
        Ok(updated)
    }

    /// Open a read transaction on the profile table.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.run(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(PROFILES)?;
            Ok(())
        })
        .await
    }

    /// Run a synchronous database operation on the blocking pool.
    ///
    /// On timeout the caller gets `StorageError::Timeout`; the blocking task
    /// itself cannot be interrupted and finishes (or aborts) its transaction
    /// atomically in the background.
    async fn run<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || op(&db));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StorageError::Backend(format!(
                "storage task failed: {join_err}"
            ))),
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Storage call timed out");
                Err(StorageError::Timeout(self.timeout))
            }
        }
    }
}

fn read_profile(db: &Database, id: &str) -> StorageResult<Option<ProfileRecord>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(PROFILES)?;
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn insert_profile(db: &Database, record: ProfileRecord) -> StorageResult<ProfileRecord> {
    let json = serde_json::to_vec(&record)?;

    let write_txn = db.begin_write()?;
    let exists = {
        let mut table = write_txn.open_table(PROFILES)?;
        let exists = table.get(record.id.as_str())?.is_some();
        if !exists {
            table.insert(record.id.as_str(), json.as_slice())?;
        }
        exists
    };

    if exists {
        write_txn.abort()?;
        return Err(StorageError::AlreadyExists(record.id));
    }
    write_txn.commit()?;
    Ok(record)
}

fn update_profile(db: &Database, id: &str, fields: ProfileFields) -> StorageResult<ProfileRecord> {
    let write_txn = db.begin_write()?;
    let updated = {
        let mut table = write_txn.open_table(PROFILES)?;
        let existing: Option<ProfileRecord> = match table.get(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };

        match existing {
            Some(mut record) => {
                record.apply(fields);
                let json = serde_json::to_vec(&record)?;
                table.insert(id, json.as_slice())?;
                Some(record)
            }
            None => None,
        }
    };

    match updated {
        Some(record) => {
            write_txn.commit()?;
            Ok(record)
        }
        None => {
            write_txn.abort()?;
            Err(StorageError::NotFound(id.to_string()))
        }
    }
}
