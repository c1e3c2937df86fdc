//! Local draft storage.
//!
//! The [`DraftStore`] owns the ordered collection of unpublished drafts and
//! writes the whole collection through a [`DraftPersistence`] backend after
//! every mutation.
use std::{
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, error, info, trace, warn};

use crate::{load_json_file, validate_fields, write_json_atomic, Draft, Result};

/// Durable backing for the draft collection.
pub trait DraftPersistence: Send + Sync {
    /// Loads the saved collection, most recent draft first
    fn load(&self) -> Result<Vec<Draft>>;

    /// Replaces the saved collection
    fn save(&self, drafts: &[Draft]) -> Result<()>;
}

/// Stores the collection as a JSON array in a single file.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DraftPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Vec<Draft>> {
        if !self.path.exists() {
            debug!(
                "Drafts file {} does not exist yet, starting empty",
                self.path.display()
            );
            return Ok(Vec::new());
        }
        load_json_file(&self.path)
    }

    fn save(&self, drafts: &[Draft]) -> Result<()> {
        write_json_atomic(&self.path, drafts)
    }
}

/// Keeps the serialized collection in memory.
///
/// Drafts still go through JSON so timestamps take the same path as on disk.
#[derive(Default)]
pub struct MemoryPersistence {
    raw: Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an already serialized (possibly corrupt) collection
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// The last saved serialized collection
    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DraftPersistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<Draft>> {
        match self.raw() {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, drafts: &[Draft]) -> Result<()> {
        let json = serde_json::to_string(drafts)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }
}

/// The authoritative list of drafts that have not been published yet.
pub struct DraftStore {
    /// Drafts ordered most recent first
    drafts: Mutex<Vec<Draft>>,

    /// Where every mutation is written
    persistence: Box<dyn DraftPersistence>,
}

impl DraftStore {
    /// Opens the store, loading whatever the backend holds.
    ///
    /// A backend that fails to load (for example a corrupt file) yields an
    /// empty store; the failure is logged rather than returned.
    pub fn open(persistence: Box<dyn DraftPersistence>) -> Self {
        let drafts = match persistence.load() {
            Ok(drafts) => {
                info!("Loaded {} drafts", drafts.len());
                drafts
            }
            Err(e) => {
                error!("Failed to load drafts, starting with an empty list: {}", e);
                Vec::new()
            }
        };

        Self {
            drafts: Mutex::new(drafts),
            persistence,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Draft>> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort write of the collection; called with the lock held
    fn persist(&self, drafts: &[Draft]) {
        match self.persistence.save(drafts) {
            Ok(()) => trace!("Persisted {} drafts", drafts.len()),
            Err(e) => warn!("Failed to save drafts: {}", e),
        }
    }

    /// Snapshot of all drafts, most recent first
    pub fn list(&self) -> Vec<Draft> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Draft> {
        self.lock().iter().find(|d| d.id == id).cloned()
    }

    /// The most recently added draft
    pub fn first(&self) -> Option<Draft> {
        self.lock().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Creates a draft at the front of the collection.
    ///
    /// A blank title or body is rejected with a validation error and the
    /// collection is left as it was.
    pub fn add(&self, title: &str, body: &str) -> Result<Draft> {
        let draft = Draft::new(title.to_string(), body.to_string())?;

        let mut drafts = self.lock();
        drafts.insert(0, draft.clone());
        self.persist(&drafts);

        info!("Added draft {} ({})", draft.id, draft.title);
        Ok(draft)
    }

    /// Replaces title and body of a draft in place.
    ///
    /// Returns `Ok(false)` when no draft has that id.
    pub fn update(&self, id: &str, title: &str, body: &str) -> Result<bool> {
        validate_fields(title, body)?;

        let mut drafts = self.lock();
        let Some(draft) = drafts.iter_mut().find(|d| d.id == id) else {
            debug!("Update ignored, no draft with id {}", id);
            return Ok(false);
        };

        draft.title = title.to_string();
        draft.body = body.to_string();
        self.persist(&drafts);

        info!("Updated draft {}", id);
        Ok(true)
    }

    /// Removes a draft; returns whether one was removed
    pub fn delete(&self, id: &str) -> bool {
        let mut drafts = self.lock();
        let before = drafts.len();
        drafts.retain(|d| d.id != id);

        if drafts.len() == before {
            debug!("Delete ignored, no draft with id {}", id);
            return false;
        }

        self.persist(&drafts);
        info!("Deleted draft {}", id);
        true
    }

    /// Removes every draft whose id is listed; returns how many were removed
    pub fn remove_many(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let mut drafts = self.lock();
        let before = drafts.len();
        drafts.retain(|d| !ids.contains(&d.id));
        let removed = before - drafts.len();

        if removed > 0 {
            self.persist(&drafts);
            info!("Removed {} drafts", removed);
        }
        removed
    }

    pub fn clear_all(&self) {
        let mut drafts = self.lock();
        drafts.clear();
        self.persist(&drafts);
        info!("Cleared all drafts");
    }
}
