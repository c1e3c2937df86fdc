//! An in-process remote store.
//!
//! Behaves like the Contents API for the operations the workflow uses and can
//! be told to fail or slow down specific calls. Used as the test backend.
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;

use super::{CommitResult, FileMetadata, RemoteEntry, RemoteResult, RemoteStore, WriteRequest};
use crate::{RemoteError, RemoteErrorKind};

const DOWNLOAD_PREFIX: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    sha: String,
}

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, StoredFile>,
    next_sha: u64,
    writes: Vec<WriteRequest>,
    list_calls: usize,
    /// Failure returned by every call while set
    outage: Option<RemoteError>,
    /// Failures returned by writes to a specific path
    write_failures: HashMap<String, RemoteError>,
    list_failure: Option<RemoteError>,
}

impl MemoryState {
    fn next_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("sha-{}", self.next_sha)
    }
}

pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    credential: bool,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            credential: true,
            read_delay: None,
            write_delay: None,
        }
    }

    /// Behaves as if no access token were configured
    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    /// Makes every folder listing wait before completing
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Makes every write wait before completing
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a file directly, returning its hash
    pub fn insert_file(&self, path: &str, content: &str) -> String {
        let mut state = self.lock();
        let sha = state.next_sha();
        state.files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn remove_file(&self, path: &str) -> bool {
        self.lock().files.remove(path).is_some()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).map(|f| f.content.clone())
    }

    pub fn sha_of(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).map(|f| f.sha.clone())
    }

    /// Every write that reached the store, failed ones included
    pub fn writes(&self) -> Vec<WriteRequest> {
        self.lock().writes.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Fails every call until cleared with `None`
    pub fn set_outage(&self, error: Option<RemoteError>) {
        self.lock().outage = error;
    }

    /// Fails writes to `path` with `error` until cleared
    pub fn fail_writes_to(&self, path: &str, error: RemoteError) {
        self.lock().write_failures.insert(path.to_string(), error);
    }

    pub fn clear_write_failure(&self, path: &str) {
        self.lock().write_failures.remove(path);
    }

    pub fn fail_listing(&self, error: Option<RemoteError>) {
        self.lock().list_failure = error;
    }

    fn check_outage(&self) -> RemoteResult<()> {
        match &self.lock().outage {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn list_folder(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_outage()?;
        let mut state = self.lock();
        state.list_calls += 1;
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }

        let prefix = format!("{}/", path.trim_matches('/'));
        let mut entries: Vec<RemoteEntry> = Vec::new();
        for (file_path, file) in state.files.iter() {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                None => entries.push(RemoteEntry {
                    name: rest.to_string(),
                    path: file_path.clone(),
                    entry_type: "file".to_string(),
                    sha: Some(file.sha.clone()),
                    download_url: Some(format!("{}{}", DOWNLOAD_PREFIX, file_path)),
                }),
                Some((dir, _)) => {
                    if !entries.iter().any(|e| e.name == dir && e.entry_type == "dir") {
                        entries.push(RemoteEntry {
                            name: dir.to_string(),
                            path: format!("{}{}", prefix, dir),
                            entry_type: "dir".to_string(),
                            sha: None,
                            download_url: None,
                        });
                    }
                }
            }
        }

        if entries.is_empty() {
            return Err(RemoteError::not_found(format!("{} does not exist", path)));
        }
        Ok(entries)
    }

    async fn read_file(&self, download_ref: &str) -> RemoteResult<String> {
        self.check_outage()?;
        let path = download_ref
            .strip_prefix(DOWNLOAD_PREFIX)
            .unwrap_or(download_ref);
        self.file(path)
            .ok_or_else(|| RemoteError::not_found(format!("{} does not exist", path)))
    }

    async fn get_file_metadata(&self, path: &str) -> RemoteResult<FileMetadata> {
        self.check_outage()?;
        self.sha_of(path)
            .map(|sha| FileMetadata { sha })
            .ok_or_else(|| RemoteError::not_found(format!("{} does not exist", path)))
    }

    async fn write_file(&self, request: WriteRequest) -> RemoteResult<CommitResult> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_outage()?;

        let mut state = self.lock();
        state.writes.push(request.clone());

        if let Some(err) = state.write_failures.get(&request.path) {
            return Err(err.clone());
        }

        let current = state.files.get(&request.path).map(|f| f.sha.clone());
        if current != request.expected_sha {
            let message = match (&current, &request.expected_sha) {
                (Some(_), None) => format!("{} exists and no sha was supplied", request.path),
                _ => format!("{} does not match {:?}", request.path, request.expected_sha),
            };
            return Err(RemoteError::new(RemoteErrorKind::Conflict, message));
        }

        let sha = state.next_sha();
        let commit_sha = state.next_sha();
        state.files.insert(
            request.path.clone(),
            StoredFile {
                content: request.content,
                sha: sha.clone(),
            },
        );

        Ok(CommitResult {
            content_sha: Some(sha),
            commit_sha: Some(commit_sha),
            html_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Committer;

    fn write(path: &str, sha: Option<String>) -> WriteRequest {
        WriteRequest {
            path: path.to_string(),
            content: "text".to_string(),
            message: "msg".to_string(),
            committer: Committer::default(),
            branch: "main".to_string(),
            expected_sha: sha,
        }
    }

    #[tokio::test]
    async fn listing_missing_folder_is_not_found() {
        let remote = MemoryRemote::new();
        let err = remote.list_folder("drafts").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn listing_shows_direct_children() {
        let remote = MemoryRemote::new();
        remote.insert_file("drafts/a.md", "A");
        remote.insert_file("drafts/sub/b.md", "B");
        remote.insert_file("other/c.md", "C");

        let entries = remote.list_folder("drafts").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "sub"]);
        assert!(entries[0].is_markdown());
        assert!(!entries[1].is_markdown());
    }

    #[tokio::test]
    async fn stale_sha_is_a_conflict() {
        let remote = MemoryRemote::new();
        remote.insert_file("drafts/a.md", "A");

        let blind = remote.write_file(write("drafts/a.md", None)).await.unwrap_err();
        assert_eq!(blind.kind, RemoteErrorKind::Conflict);

        let stale = remote
            .write_file(write("drafts/a.md", Some("sha-999".into())))
            .await
            .unwrap_err();
        assert_eq!(stale.kind, RemoteErrorKind::Conflict);

        let sha = remote.sha_of("drafts/a.md");
        remote.write_file(write("drafts/a.md", sha)).await.unwrap();
        assert_eq!(remote.file("drafts/a.md").as_deref(), Some("text"));
    }
}
