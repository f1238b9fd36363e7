//! History archive
//!
//! Named, timestamped snapshots of whole plans, plus the load-all/save-all
//! persistence contract the archive is flushed through.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::{generate_id, HistoryItem, PlanState};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine the home directory")]
    NoHomeDir,
}

/// A single durable slot holding the serialized archive.
///
/// The archive is read once at startup and fully rewritten on every change.
pub trait ArchiveStore: Send {
    fn load_all(&self) -> Result<Vec<HistoryItem>, StorageError>;
    fn save_all(&mut self, items: &[HistoryItem]) -> Result<(), StorageError>;
}

/// Returns the default archive location, `~/.goal-architect/history.json`
pub fn default_archive_path() -> Result<PathBuf, StorageError> {
    let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
    Ok(home.join(".goal-architect").join("history.json"))
}

/// Archive store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<HistoryItem>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_all(&mut self, items: &[HistoryItem]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory archive store; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Vec<HistoryItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<HistoryItem>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(items)),
        }
    }

    /// A copy of what was last written
    pub fn snapshot(&self) -> Vec<HistoryItem> {
        match self.slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ArchiveStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<HistoryItem>, StorageError> {
        Ok(self.snapshot())
    }

    fn save_all(&mut self, items: &[HistoryItem]) -> Result<(), StorageError> {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = items.to_vec();
        Ok(())
    }
}

/// The in-memory archive of saved plans
#[derive(Debug, Clone, Default)]
pub struct HistoryArchive {
    items: Vec<HistoryItem>,
}

impl HistoryArchive {
    pub fn new(items: Vec<HistoryItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Saves `plan`, returning the id of the entry written.
    ///
    /// When `active_id` names an existing entry it is updated in place (id and
    /// name kept, plan and timestamp replaced). Otherwise a new entry named
    /// after the plan title is created.
    pub fn save<R: Rng + ?Sized>(
        &mut self,
        plan: &PlanState,
        active_id: Option<&str>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> String {
        if let Some(item) = active_id.and_then(|id| self.items.iter_mut().find(|i| i.id == id)) {
            item.plan = plan.clone();
            item.timestamp = now;
            return item.id.clone();
        }

        let item = HistoryItem {
            id: generate_id(rng),
            name: plan.plan_title.clone(),
            timestamp: now,
            plan: plan.clone(),
        };
        let id = item.id.clone();
        self.items.insert(0, item);
        id
    }

    /// Returns an independent copy of the archived plan
    pub fn load(&self, id: &str) -> Option<PlanState> {
        self.get(id).map(|item| item.plan.clone())
    }

    /// Renames an entry. Blank names and unknown ids are ignored.
    pub fn rename(&mut self, id: &str, new_name: &str) -> bool {
        let name = new_name.trim();
        if name.is_empty() {
            return false;
        }
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes an entry. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// The entry saved most recently
    pub fn most_recent(&self) -> Option<&HistoryItem> {
        self.items.iter().max_by_key(|item| item.timestamp)
    }

    /// Entries ordered newest first
    pub fn list(&self) -> Vec<&HistoryItem> {
        let mut items: Vec<&HistoryItem> = self.items.iter().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items
    }
}
