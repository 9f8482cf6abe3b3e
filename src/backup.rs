//! JSON backup and restore of the whole ledger.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{FinanceError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{AppSettings, Contact, Loan, Transaction};
use crate::repository;
use crate::utils::{millis_to_datetime, Clock, SystemClock};
use crate::validation::InputValidator;

/// Format version written into every backup
pub const BACKUP_VERSION: &str = "1.0.0";
const FILE_PREFIX: &str = "backup_";

/// Everything needed to rebuild the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Settings keys present when the backup was taken
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// RFC 3339 creation time
    pub backup_date: String,
    pub version: String,
}

/// A backup file in the backup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

#[derive(Clone)]
pub struct BackupService {
    db: Database,
    directory: PathBuf,
    metrics: MetricsCollector,
    clock: Arc<dyn Clock>,
}

impl BackupService {
    pub fn new(db: Database, directory: impl Into<PathBuf>, metrics: MetricsCollector) -> Self {
        Self::with_clock(db, directory, metrics, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Database,
        directory: impl Into<PathBuf>,
        metrics: MetricsCollector,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, directory: directory.into(), metrics, clock }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        InputValidator::validate_backup_name(name)?;
        Ok(self.directory.join(name))
    }

    /// Capture the current ledger and `settings` in memory
    pub fn snapshot(&self, settings: &AppSettings) -> Result<BackupSnapshot> {
        let now = millis_to_datetime(self.clock.now_millis()).unwrap_or_else(Utc::now);
        let settings = match serde_json::to_value(settings)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let conn = self.db.get_connection()?;
        Ok(BackupSnapshot {
            transactions: repository::transactions::list(&conn)?,
            loans: repository::loans::list(&conn)?,
            contacts: repository::contacts::list(&conn)?,
            settings,
            backup_date: now.to_rfc3339(),
            version: BACKUP_VERSION.to_string(),
        })
    }

    /// Write a snapshot to `backup_<timestamp>.json` and return the file name
    pub fn export(&self, settings: &AppSettings) -> Result<String> {
        self.metrics.track("backup.export", || {
            let snapshot = self.snapshot(settings)?;
            let stamp = millis_to_datetime(self.clock.now_millis()).unwrap_or_else(Utc::now);
            let name = format!("{FILE_PREFIX}{}.json", stamp.format("%Y-%m-%dT%H-%M-%S%.3fZ"));

            fs::create_dir_all(&self.directory)?;
            let json = serde_json::to_vec_pretty(&snapshot)?;
            fs::write(self.directory.join(&name), &json)?;

            self.metrics.record_backup_size(json.len() as u64);
            info!(
                file = %name,
                contacts = snapshot.contacts.len(),
                transactions = snapshot.transactions.len(),
                loans = snapshot.loans.len(),
                "Backup written"
            );
            Ok(name)
        })
    }

    /// Backup files, newest first
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata()?;
            entries.push(BackupEntry { name, modified: metadata.modified()?.into(), size: metadata.len() });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(entries)
    }

    pub fn read(&self, name: &str) -> Result<BackupSnapshot> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(FinanceError::BackupNotFound(name.to_string()));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(FinanceError::BackupNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        info!(file = name, "Backup deleted");
        Ok(())
    }

    /// Replace the whole ledger with `snapshot`.
    ///
    /// All three tables are emptied and refilled, ids included, in a single
    /// unit of work. Returns `current` with the snapshot's settings keys
    /// applied on top.
    pub fn restore(&self, snapshot: &BackupSnapshot, current: &AppSettings) -> Result<AppSettings> {
        self.metrics.track("backup.restore", || {
            if snapshot.version != BACKUP_VERSION {
                warn!(version = %snapshot.version, "Restoring backup with unknown version");
            }
            let settings = merge_settings(current, &snapshot.settings)?;

            self.db.unit_of_work("backup.restore", |conn| {
                repository::clear_all(conn)?;
                for contact in &snapshot.contacts {
                    repository::contacts::insert_with_id(conn, contact)?;
                }
                for tx in &snapshot.transactions {
                    repository::transactions::insert_with_id(conn, tx)?;
                }
                for loan in &snapshot.loans {
                    repository::loans::insert_with_id(conn, loan)?;
                }
                Ok(())
            })?;

            info!(
                contacts = snapshot.contacts.len(),
                transactions = snapshot.transactions.len(),
                loans = snapshot.loans.len(),
                backup_date = %snapshot.backup_date,
                "Backup restored"
            );
            Ok(settings)
        })
    }

    /// Read `name` from the backup directory and restore it
    pub fn restore_file(&self, name: &str, current: &AppSettings) -> Result<AppSettings> {
        let snapshot = self.read(name)?;
        self.restore(&snapshot, current)
    }
}

/// `current` with every key of `overlay` written over it
fn merge_settings(current: &AppSettings, overlay: &Map<String, Value>) -> Result<AppSettings> {
    let mut merged = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    Ok(serde_json::from_value(Value::Object(merged))?)
}
