// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Durable storage for accepted submissions.
//!
//! The pipeline only sees [`SubmissionStore`]. Two implementations ship:
//! [`MemoryStore`] for tests and throwaway runs, and [`JsonlStore`], an
//! append-only JSON Lines file that is read back into memory on open.

use crate::error::StoreError;
use crate::validator::ContactFields;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// An accepted contact submission. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub name: String,
    /// Normalized by the validator
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub message: String,
    pub source_address: IpAddr,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(
        fields: ContactFields,
        source_address: IpAddr,
        user_agent: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            email: fields.email,
            company: fields.company,
            message: fields.message,
            source_address,
            user_agent,
            created_at,
        }
    }

    fn matches(&self, email: &str, since: DateTime<Utc>) -> bool {
        self.email == email && self.created_at >= since
    }
}

/// Persistence collaborator for the admission pipeline.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, record: SubmissionRecord) -> Result<(), StoreError>;

    /// Records for `email` created at or after `since`. Emails compare
    /// exactly; pass the validator's normalized form.
    async fn count_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Records for `email` created at or after `since`, oldest first.
    async fn find_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SubmissionRecord>, StoreError>;
}

/// Open the store named by `path`: `memory` or a JSON Lines file.
pub async fn open_store(path: &str) -> Result<Arc<dyn SubmissionStore>, StoreError> {
    if path == "memory" {
        info!("Using in-memory submission store");
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Ok(Arc::new(JsonlStore::open(path).await?))
    }
}

fn count_matching(records: &[SubmissionRecord], email: &str, since: DateTime<Utc>) -> u64 {
    records.iter().filter(|r| r.matches(email, since)).count() as u64
}

fn find_matching(
    records: &[SubmissionRecord],
    email: &str,
    since: DateTime<Utc>,
) -> Vec<SubmissionRecord> {
    let mut found: Vec<SubmissionRecord> = records
        .iter()
        .filter(|r| r.matches(email, since))
        .cloned()
        .collect();
    found.sort_by_key(|r| r.created_at);
    found
}

/// Submission store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SubmissionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, record: SubmissionRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn count_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(count_matching(&self.records.read().await, email, since))
    }

    async fn find_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SubmissionRecord>, StoreError> {
        Ok(find_matching(&self.records.read().await, email, since))
    }
}

/// Append-only JSON Lines store, one record per line.
///
/// Appends run on a spawned task so a caller that gives up waiting
/// cannot leave a line half written or written but unindexed.
pub struct JsonlStore {
    path: PathBuf,
    inner: Arc<JsonlInner>,
}

struct JsonlInner {
    file: Mutex<JsonlFile>,
    records: RwLock<Vec<SubmissionRecord>>,
}

struct JsonlFile {
    handle: File,
    /// Length covering complete lines only
    len: u64,
}

impl JsonlStore {
    /// Open or create the file at `path` and load existing records.
    ///
    /// Lines that fail to parse are skipped with a warning. A trailing
    /// fragment without a newline is cut off so the next append starts
    /// on a fresh line.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let complete = raw.rfind('\n').map_or(0, |i| i + 1);

        let mut records = Vec::new();
        for (lineno, line) in raw[..complete].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SubmissionRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %err,
                    "Skipping unreadable submission record"
                ),
            }
        }

        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let len = complete as u64;
        if complete < raw.len() {
            warn!(
                path = %path.display(),
                bytes = raw.len() - complete,
                "Truncating incomplete trailing record"
            );
            handle.set_len(len).await?;
        }

        info!(path = %path.display(), records = records.len(), "Opened submission store");

        Ok(Self {
            path,
            inner: Arc::new(JsonlInner {
                file: Mutex::new(JsonlFile { handle, len }),
                records: RwLock::new(records),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JsonlInner {
    /// Append one line, rolling the file back to its last complete line
    /// on failure. Memory is updated only once the line is durable.
    async fn append(&self, record: SubmissionRecord, line: Vec<u8>) -> Result<(), StoreError> {
        let mut file = self.file.lock().await;

        let written = async {
            file.handle.write_all(&line).await?;
            file.handle.sync_data().await
        }
        .await;

        if let Err(err) = written {
            if let Err(rollback) = file.handle.set_len(file.len).await {
                warn!(error = %rollback, "Failed to roll back partial submission record");
            }
            return Err(err.into());
        }

        file.len += line.len() as u64;
        self.records.write().await.push(record);
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for JsonlStore {
    async fn insert(&self, record: SubmissionRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.append(record, line).await })
            .await
            .map_err(|err| StoreError::Unavailable(format!("append task failed: {}", err)))?
    }

    async fn count_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(count_matching(&self.inner.records.read().await, email, since))
    }

    async fn find_by_email_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SubmissionRecord>, StoreError> {
        Ok(find_matching(&self.inner.records.read().await, email, since))
    }
}
