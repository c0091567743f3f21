//! Invocation ledger.
//!
//! An append-only record of the calls made through the tester, read back
//! newest first. The file format is a run of JSON objects, each followed by
//! a comma, so an append never has to rewrite what is already there:
//!
//! ```text
//! {"method":"GET","uri":"/api/users","parameters":{"page":"2"},"user":null},{"method":"POST",...},
//! ```
//!
//! The ledger is a debugging aid. Failures are logged by
//! [`InvocationLedger::record`] and [`InvocationLedger::history`] and never
//! reach the caller.

use crate::error::LedgerError;
use armature_core::logging::error;
use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One stored call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub method: String,
    pub uri: String,
    #[serde(default, deserialize_with = "parameter_map")]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub user: Option<String>,
}

impl LedgerRecord {
    pub fn new(method: &str, uri: &str, parameters: &[(String, String)], user: Option<&str>) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            parameters: parameters
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect(),
            user: user.map(str::to_string),
        }
    }
}

// Older writers store an empty parameter set as `[]`.
fn parameter_map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, value)| (index.to_string(), value))
            .collect()),
        other => Err(D::Error::custom(format!("invalid parameters: {}", other))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerParameter {
    pub name: String,
    #[serde(rename = "defaultValue")]
    pub default_value: Value,
}

/// A stored call as shown in history, parameters ready to pre-fill a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub method: String,
    pub uri: String,
    pub parameters: Vec<LedgerParameter>,
    pub user: Option<String>,
}

impl From<LedgerRecord> for LedgerEntry {
    fn from(record: LedgerRecord) -> Self {
        Self {
            method: record.method,
            uri: record.uri,
            parameters: record
                .parameters
                .into_iter()
                .map(|(name, default_value)| LedgerParameter { name, default_value })
                .collect(),
            user: record.user,
        }
    }
}

/// Oldest-first records to newest-first entries, at most `max_entries` of them.
pub fn to_entries(records: Vec<LedgerRecord>, max_entries: Option<usize>) -> Vec<LedgerEntry> {
    records
        .into_iter()
        .rev()
        .take(max_entries.unwrap_or(usize::MAX))
        .map(LedgerEntry::from)
        .collect()
}

#[async_trait]
pub trait InvocationLedger: Send + Sync {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError>;

    /// All entries, newest first.
    async fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Append, logging instead of failing.
    async fn record(&self, record: &LedgerRecord) {
        if let Err(err) = self.append(record).await {
            error!(error = %err, method = %record.method, uri = %record.uri, "Failed to append to invocation ledger");
        }
    }

    /// Load, falling back to an empty history.
    async fn history(&self) -> Vec<LedgerEntry> {
        self.load().await.unwrap_or_else(|err| {
            error!(error = %err, "Failed to read invocation ledger");
            Vec::new()
        })
    }
}

/// Ledger stored in a single file.
pub struct FileLedger {
    path: PathBuf,
    max_entries: Option<usize>,
    lock: Mutex<()>,
}

impl FileLedger {
    /// # Examples
    ///
    /// ```no_run
    /// use armature_api_tester::FileLedger;
    ///
    /// let ledger = FileLedger::new("storage/api-tester/api-tester.json").with_max_entries(Some(100));
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: None,
            lock: Mutex::new(()),
        }
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InvocationLedger for FileLedger {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(record)?;
        line.push(',');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let contents = {
            let _guard = self.lock.lock().await;
            match fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            }
        };

        let body = contents.trim().trim_matches(',');
        if body.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<LedgerRecord> = serde_json::from_str(&format!("[{}]", body))?;
        Ok(to_entries(records, self.max_entries))
    }
}

/// In-process ledger for tests and embedding.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    records: Arc<Mutex<Vec<LedgerRecord>>>,
    max_entries: Option<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Stored records, oldest first.
    pub async fn records(&self) -> Vec<LedgerRecord> {
        self.records.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}

#[async_trait]
impl InvocationLedger for MemoryLedger {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let records = self.records.lock().await.clone();
        Ok(to_entries(records, self.max_entries))
    }
}
