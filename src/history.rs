//! Generation history.
//!
//! A bounded, newest-first list of past generations persisted as a JSON
//! array in a single key-value [`Slot`]. Every operation reads the slot,
//! transforms the list and writes it back; there is no in-memory cache, so
//! two stores over the same slot always agree.
//!
//! # Invariants
//!
//! - At most [`HISTORY_LIMIT`] entries are kept; appends evict the oldest.
//! - `id` is unique within the list.
//! - After an import the list is sorted by timestamp, newest first.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::Settings;

/// Maximum number of entries kept.
pub const HISTORY_LIMIT: usize = 50;

/// Key of the history slot (also the file stem on disk).
pub const HISTORY_KEY: &str = "qr_history";

/// Errors from history persistence and import.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to access history storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Import file is not valid JSON: {0}")]
    MalformedImport(String),

    #[error("Import file must contain a JSON array of history items")]
    NotAnArray,

    #[error("Import item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: String },
}

/// One past generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Creation time in milliseconds since the epoch; unique key.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub settings: Settings,
    /// Embedded logo as a `data:` URL.
    #[serde(default)]
    pub logo_data_url: Option<String>,
}

impl HistoryItem {
    /// Snapshot `settings` at `now`.
    pub fn new(settings: &Settings, logo_data_url: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: now.timestamp_millis(),
            timestamp: now,
            content: settings.content.clone(),
            settings: settings.clone(),
            logo_data_url,
        }
    }

    /// Snapshot `settings` at the current time.
    pub fn capture(settings: &Settings, logo_data_url: Option<String>) -> Self {
        Self::new(settings, logo_data_url, Utc::now())
    }
}

/// A single persistent key-value slot holding serialized text.
pub trait Slot {
    /// Current contents, or `None` when the slot has never been written.
    fn read(&self) -> Result<Option<String>, HistoryError>;
    fn write(&self, value: &str) -> Result<(), HistoryError>;
    fn remove(&self) -> Result<(), HistoryError>;
}

/// Slot stored as a file, written atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The history slot inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(format!("{HISTORY_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Slot for FileSlot {
    fn read(&self) -> Result<Option<String>, HistoryError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, value)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), HistoryError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory slot, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: RefCell<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: RefCell::new(Some(value.into())),
        }
    }
}

impl Slot for MemorySlot {
    fn read(&self) -> Result<Option<String>, HistoryError> {
        Ok(self.value.borrow().clone())
    }

    fn write(&self, value: &str) -> Result<(), HistoryError> {
        *self.value.borrow_mut() = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), HistoryError> {
        *self.value.borrow_mut() = None;
        Ok(())
    }
}

/// Newest-first history over a [`Slot`].
#[derive(Debug)]
pub struct HistoryStore<S: Slot> {
    slot: S,
}

impl HistoryStore<FileSlot> {
    /// Open the history kept in `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        Self::new(FileSlot::in_dir(data_dir))
    }
}

impl<S: Slot> HistoryStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    fn load(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        let Some(raw) = self.slot.read()? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("history: stored data is unreadable, starting empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, items: &[HistoryItem]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(items)?;
        self.slot.write(&json)
    }

    /// Insert `item` at the head, evicting entries beyond [`HISTORY_LIMIT`].
    ///
    /// Returns the id the item was stored under, which differs from
    /// `item.id` only if that id was already taken.
    pub fn append(&self, mut item: HistoryItem) -> Result<i64, HistoryError> {
        let mut items = self.load()?;
        if items.iter().any(|i| i.id == item.id) {
            let next = items.iter().map(|i| i.id).max().unwrap_or(item.id) + 1;
            debug!(old = item.id, new = next, "history: re-keyed colliding id");
            item.id = next;
        }
        let id = item.id;
        items.insert(0, item);
        items.truncate(HISTORY_LIMIT);
        self.save(&items)?;
        debug!(id, len = items.len(), "history: appended");
        Ok(id)
    }

    /// All entries, newest first.
    pub fn list(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        self.load()
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.load()?.is_empty())
    }

    pub fn get(&self, id: i64) -> Result<Option<HistoryItem>, HistoryError> {
        Ok(self.load()?.into_iter().find(|i| i.id == id))
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: i64) -> Result<bool, HistoryError> {
        let mut items = self.load()?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save(&items)?;
        debug!(id, "history: deleted");
        Ok(true)
    }

    /// Union `incoming` with the stored entries by id.
    ///
    /// For a shared id the entry with the newer timestamp wins (ties keep
    /// the stored one). The result is sorted newest first and capped.
    /// Returns the number of entries after the merge.
    pub fn import_merge(&self, incoming: Vec<HistoryItem>) -> Result<usize, HistoryError> {
        let current = self.load()?;
        let merged = merge_items(current, incoming);
        self.save(&merged)?;
        debug!(len = merged.len(), "history: merged import");
        Ok(merged.len())
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        self.slot.remove()?;
        debug!("history: cleared");
        Ok(())
    }

    /// Pretty JSON array of all entries, as written by history export.
    pub fn export_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(&self.load()?)?)
    }
}

/// Merge two item sets by id; see [`HistoryStore::import_merge`].
pub fn merge_items(current: Vec<HistoryItem>, incoming: Vec<HistoryItem>) -> Vec<HistoryItem> {
    let mut by_id: HashMap<i64, HistoryItem> = HashMap::with_capacity(current.len());
    for item in current.into_iter().chain(incoming) {
        let keep_existing = by_id
            .get(&item.id)
            .is_some_and(|existing| existing.timestamp >= item.timestamp);
        if !keep_existing {
            by_id.insert(item.id, item);
        }
    }
    let mut merged: Vec<HistoryItem> = by_id.into_values().collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    merged.truncate(HISTORY_LIMIT);
    merged
}

/// Validate and parse an import document.
///
/// The document must be a JSON array; each element must be a history item.
pub fn parse_import(text: &str) -> Result<Vec<HistoryItem>, HistoryError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| HistoryError::MalformedImport(e.to_string()))?;
    let serde_json::Value::Array(elements) = value else {
        return Err(HistoryError::NotAnArray);
    };
    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value(element).map_err(|e| HistoryError::InvalidItem {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}
