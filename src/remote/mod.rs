//! The remote file store that drafts are published to.
//!
//! [`RemoteStore`] is the seam between the publish workflow and the transport.
//! Every backend reports failures as a [`RemoteError`] whose kind has already
//! been classified, so callers never inspect status codes or message text.
mod github;
pub mod memory;

pub use github::GitHubStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    /// `file` or `dir`
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: Option<String>,
    /// Where the raw content can be read from; absent for directories
    pub download_url: Option<String>,
}

impl RemoteEntry {
    pub fn is_markdown(&self) -> bool {
        self.entry_type == "file" && self.name.ends_with(".md")
    }
}

/// Metadata of an existing remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub sha: String,
}

/// Identity recorded on commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

impl Committer {
    pub fn is_set(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// A create-or-update of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub path: String,
    /// Plain text; backends encode it as their wire format requires
    pub content: String,
    pub message: String,
    pub committer: Committer,
    pub branch: String,
    /// Current hash of the file being replaced; `None` creates the file
    pub expected_sha: Option<String>,
}

/// What the remote store reports after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Hash of the written file
    pub content_sha: Option<String>,
    /// Hash of the commit that wrote it
    pub commit_sha: Option<String>,
    pub html_url: Option<String>,
}

/// Operations the publish workflow needs from a remote file host.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether an access credential is configured at all
    fn has_credential(&self) -> bool;

    /// Lists a folder; fails with `NotFound` when it does not exist
    async fn list_folder(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Reads raw text through an entry's download reference
    async fn read_file(&self, download_ref: &str) -> RemoteResult<String>;

    /// Looks up a file; fails with `NotFound` when it does not exist
    async fn get_file_metadata(&self, path: &str) -> RemoteResult<FileMetadata>;

    /// Creates or updates a file
    async fn write_file(&self, request: WriteRequest) -> RemoteResult<CommitResult>;
}
