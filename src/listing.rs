//! Cached snapshot of the files already published to the remote folder.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::remote::{RemoteResult, RemoteStore};
use crate::{RemoteError, RemoteErrorKind};

/// A published Markdown file with its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub name: String,
    pub path: String,
    pub sha: Option<String>,
    pub content: String,
}

#[derive(Default)]
struct ListingState {
    files: Vec<RemoteFile>,
    loading: bool,
    error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Read-only view of the remote folder, refreshed on demand.
///
/// A failed refresh records an error message and keeps the previous files.
pub struct RemoteListing {
    remote: Arc<dyn RemoteStore>,
    folder: String,
    state: Mutex<ListingState>,
}

impl RemoteListing {
    pub fn new(remote: Arc<dyn RemoteStore>, folder: impl Into<String>) -> Self {
        Self {
            remote,
            folder: folder.into(),
            state: Mutex::new(ListingState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached files with the current remote folder contents
    pub async fn fetch(&self) -> RemoteResult<usize> {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.load_files().await;

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(files) => {
                let count = files.len();
                state.files = files;
                state.fetched_at = Some(Utc::now());
                info!("Fetched {} published files from {}", count, self.folder);
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to fetch published files: {}", e);
                state.error = Some(e.message.clone());
                Err(e)
            }
        }
    }

    /// Same as [`fetch`](Self::fetch); used after publishing or on manual refresh
    pub async fn refetch(&self) -> RemoteResult<usize> {
        self.fetch().await
    }

    async fn load_files(&self) -> RemoteResult<Vec<RemoteFile>> {
        if !self.remote.has_credential() {
            return Err(RemoteError::new(
                RemoteErrorKind::Unauthorized,
                "GitHub token not set",
            ));
        }

        let entries = self.remote.list_folder(&self.folder).await?;
        let mut files = Vec::new();

        for entry in entries.into_iter().filter(|e| e.is_markdown()) {
            // One unreadable file should not hide the rest of the listing
            let content = match &entry.download_url {
                Some(url) => match self.remote.read_file(url).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("Failed to read {}: {}", entry.path, e);
                        String::new()
                    }
                },
                None => String::new(),
            };
            debug!("Read {} ({} bytes)", entry.path, content.len());

            files.push(RemoteFile {
                name: entry.name,
                path: entry.path,
                sha: entry.sha,
                content,
            });
        }

        Ok(files)
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn files(&self) -> Vec<RemoteFile> {
        self.lock().files.clone()
    }

    pub fn find(&self, name: &str) -> Option<RemoteFile> {
        self.lock().files.iter().find(|f| f.name == name).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Message from the last failed refresh, cleared by the next attempt
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock().fetched_at
    }
}
