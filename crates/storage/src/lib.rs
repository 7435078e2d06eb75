//! JSON-backed reading-record store.
//!
//! One file holds the display configuration and the progress of every
//! document. Each operation reads the whole file, changes it in memory and
//! writes it back; there is no locking, the process is assumed to be the only
//! writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};
use tracing::{debug, warn};
use txtreader_core::{DisplayConfig, DocumentRecord};

mod format;

use format::StoreDocument;

pub const STORE_FILE_NAME: &str = "bookmark.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store {} is malformed", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode store")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

/// Display configuration plus records, most recently read first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub config: DisplayConfig,
    pub records: Vec<DocumentRecord>,
}

impl Snapshot {
    pub fn get(&self, file_path: &str) -> Option<&DocumentRecord> {
        self.records.iter().find(|r| r.file_path == file_path)
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.get(file_path).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing store file is not an error and yields the defaults.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let Some(doc) = self.read_document()? else {
            debug!(path = %self.path.display(), "no store file; using defaults");
            return Ok(Snapshot::default());
        };
        Ok(Snapshot {
            config: doc.config(),
            records: sort_by_recency(doc.records()),
        })
    }

    /// Like [`RecordStore::load`], but falls back to defaults on any failure and
    /// hands the failure back for reporting.
    pub fn load_or_default(&self) -> (Snapshot, Option<StoreError>) {
        match self.load() {
            Ok(snapshot) => (snapshot, None),
            Err(err) => {
                warn!(error = %err, "failed to load store; using defaults");
                (Snapshot::default(), Some(err))
            }
        }
    }

    /// Saves progress for `identity` and snapshots `config`.
    ///
    /// Returns `None` without touching the file when `identity` is blank.
    pub fn upsert(
        &self,
        identity: &str,
        current_page: u32,
        config: &DisplayConfig,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        self.upsert_at(identity, current_page, config, Local::now().naive_local())
    }

    /// Like [`RecordStore::upsert`] with an explicit time. `at` is a lower
    /// bound: if another record is stamped at or after it, the saved record is
    /// stamped just past the newest one so it still lists first.
    pub fn upsert_at(
        &self,
        identity: &str,
        current_page: u32,
        config: &DisplayConfig,
        at: NaiveDateTime,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        if identity.trim().is_empty() {
            warn!("refusing to save progress for a blank document path");
            return Ok(None);
        }

        let mut doc = self.read_document()?.unwrap_or_default();
        let mut records = doc.records();
        let saved = upsert_record(&mut records, identity, current_page, at);
        doc.set_records(&records);
        doc.set_config(config);
        self.write_document(&doc)?;

        debug!(
            path = %saved.file_path,
            page = saved.current_page,
            "progress saved"
        );
        Ok(Some(saved))
    }

    /// Removes the record for `identity`. Returns whether one was removed;
    /// nothing is written otherwise.
    pub fn delete(&self, identity: &str) -> Result<bool, StoreError> {
        let Some(mut doc) = self.read_document()? else {
            return Ok(false);
        };
        let mut records = doc.records();
        if !remove_record(&mut records, identity) {
            return Ok(false);
        }
        doc.set_records(&records);
        self.write_document(&doc)?;
        debug!(path = %identity, "record deleted");
        Ok(true)
    }

    fn read_document(&self) -> Result<Option<StoreDocument>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        // A zero-length file is what an interrupted first save leaves behind.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(StoreDocument::default()));
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    fn write_document(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(StoreError::Encode)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &bytes).map_err(write_err)?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        debug!(path = %self.path.display(), bytes = bytes.len(), "store written");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| STORE_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replaces every record for `identity` with one fresh record, stamped
/// strictly later than every other record so it sorts first. At the end of
/// the representable range the stamp saturates instead.
fn upsert_record(
    records: &mut Vec<DocumentRecord>,
    identity: &str,
    current_page: u32,
    at: NaiveDateTime,
) -> DocumentRecord {
    let newest_other = records
        .iter()
        .filter(|r| r.file_path != identity)
        .map(|r| r.last_reading_time)
        .max();
    let at = match newest_other {
        Some(newest) if newest >= at => newest
            .checked_add_signed(TimeDelta::microseconds(1))
            .unwrap_or(newest),
        _ => at,
    };

    remove_record(records, identity);
    let record = DocumentRecord::new(identity, current_page, at);
    records.push(record.clone());
    record
}

fn remove_record(records: &mut Vec<DocumentRecord>, identity: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.file_path != identity);
    records.len() != before
}

/// Most recent first. Equal timestamps keep their stored order, and only the
/// most recent entry of a duplicated path survives.
fn sort_by_recency(mut records: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
    records.sort_by(|a, b| b.last_reading_time.cmp(&a.last_reading_time));
    let mut seen = std::collections::HashSet::new();
    records.retain(|r| seen.insert(r.file_path.clone()));
    records
}
