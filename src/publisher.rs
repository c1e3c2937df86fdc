//! Publishing drafts to the remote store.
//!
//! Each publish runs `Pending -> Checking-Remote -> Create | Update ->
//! Succeeded | Failed`. The create/update decision is keyed by the remote
//! path derived from the draft title. A draft leaves the local store only
//! after its write succeeded.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, info, warn};
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::remote::{RemoteResult, RemoteStore, WriteRequest};
use crate::{
    remote_path, BatchReport, Committer, Draft, DraftError, DraftStore, ItemOutcome, ItemResult,
    PublishAction, PublishedDraft, RemoteConfig, RemoteListing, Result,
};

const FOLDER_MARKER: &str = ".gitkeep";

/// Where published files go and who commits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub folder: String,
    pub branch: String,
    pub committer: Committer,
}

impl From<&RemoteConfig> for PublishSettings {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            folder: config.folder.clone(),
            branch: config.branch.clone(),
            committer: config.committer(),
        }
    }
}

/// Moves drafts from the local store to the remote store.
///
/// Holds a single publish permit: a second publish started while one is in
/// flight fails with [`DraftError::PublishInProgress`] instead of waiting.
pub struct PublishCoordinator {
    store: Arc<DraftStore>,
    listing: Arc<RemoteListing>,
    remote: Arc<dyn RemoteStore>,
    settings: PublishSettings,
    permit: Semaphore,
    /// Set once the target folder is known to exist in this process
    folder_ready: AtomicBool,
}

impl PublishCoordinator {
    pub fn new(
        store: Arc<DraftStore>,
        listing: Arc<RemoteListing>,
        remote: Arc<dyn RemoteStore>,
        settings: PublishSettings,
    ) -> Self {
        Self {
            store,
            listing,
            remote,
            settings,
            permit: Semaphore::new(1),
            folder_ready: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Whether a publish currently holds the permit
    pub fn is_publishing(&self) -> bool {
        self.permit.available_permits() == 0
    }

    fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.permit.try_acquire().map_err(|_| {
            debug!("Publish refused, another publish is in flight");
            DraftError::PublishInProgress
        })
    }

    fn require_credential(&self) -> Result<()> {
        if self.remote.has_credential() {
            Ok(())
        } else {
            Err(DraftError::ConfigError {
                message: "GitHub token not set".to_string(),
            })
        }
    }

    /// Publishes one draft and removes it from the local store on success.
    ///
    /// On failure the draft is left untouched and the listing is not refreshed.
    pub async fn publish_one(&self, id: &str) -> Result<PublishedDraft> {
        let _permit = self.acquire()?;

        let draft = self
            .store
            .get(id)
            .ok_or_else(|| DraftError::DraftNotFound { id: id.to_string() })?;
        if !draft.has_title() {
            return Err(DraftError::validation("Draft title cannot be empty"));
        }
        self.require_credential()?;

        let published = match self.publish_remote(&draft).await {
            Ok(published) => published,
            Err(e) => {
                warn!("Publishing draft {} failed: {}", draft.id, e);
                return Err(e.into());
            }
        };

        self.store.delete(&draft.id);
        self.refresh_listing().await;

        info!("Published draft {} to {}", draft.id, published.path);
        Ok(published)
    }

    /// Publishes every local draft, strictly in stored order.
    ///
    /// An `Err` means the batch itself did not go through (folder check
    /// failed, or a credential was rejected) and no local draft was removed.
    /// Otherwise the report lists each draft's outcome and only the drafts
    /// that were published are removed locally.
    pub async fn publish_all(&self) -> Result<BatchReport> {
        let _permit = self.acquire()?;

        let drafts = self.store.list();
        if drafts.is_empty() {
            return Err(DraftError::validation("No drafts to publish!"));
        }
        self.require_credential()?;

        if let Err(e) = self.ensure_folder().await {
            error!("Batch publish aborted, folder check failed: {}", e);
            return Err(e.into());
        }

        let mut report = BatchReport::default();
        for draft in drafts {
            if !draft.has_title() {
                debug!("Skipping draft {} with empty title", draft.id);
                report.results.push(ItemResult {
                    draft_id: draft.id,
                    title: draft.title,
                    outcome: ItemOutcome::Skipped {
                        reason: "Skipped due to empty title".to_string(),
                    },
                });
                continue;
            }

            let outcome = match self.publish_draft(&draft).await {
                Ok(published) => ItemOutcome::Published(published),
                Err(e) if e.kind.is_auth() => {
                    error!("Batch publish aborted, credential rejected: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Publishing draft {} failed: {}", draft.id, e);
                    ItemOutcome::Failed(e)
                }
            };
            report.results.push(ItemResult {
                draft_id: draft.id,
                title: draft.title,
                outcome,
            });
        }

        let published_ids: Vec<String> = report.published().map(|p| p.draft_id.clone()).collect();
        if report.all_published() {
            self.store.clear_all();
        } else {
            self.store.remove_many(&published_ids);
        }
        self.refresh_listing().await;

        info!(
            "Batch publish finished: {} published, {} failed, {} skipped",
            report.published_count(),
            report.failed_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    async fn publish_remote(&self, draft: &Draft) -> RemoteResult<PublishedDraft> {
        self.ensure_folder().await?;
        self.publish_draft(draft).await
    }

    /// Creates the target folder with a marker file unless it already exists
    async fn ensure_folder(&self) -> RemoteResult<()> {
        if self.folder_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.remote.list_folder(&self.settings.folder).await {
            Ok(_) => debug!("Folder {} exists", self.settings.folder),
            Err(e) if e.is_not_found() => {
                info!("Creating folder {}", self.settings.folder);
                self.remote
                    .write_file(WriteRequest {
                        path: remote_path(&self.settings.folder, FOLDER_MARKER),
                        content: String::new(),
                        message: "Create drafts folder".to_string(),
                        committer: self.settings.committer.clone(),
                        branch: self.settings.branch.clone(),
                        expected_sha: None,
                    })
                    .await?;
            }
            Err(e) => return Err(e),
        }

        self.folder_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Checks for an existing file, then creates or updates it
    async fn publish_draft(&self, draft: &Draft) -> RemoteResult<PublishedDraft> {
        let path = remote_path(&self.settings.folder, &draft.remote_filename());

        let expected_sha = match self.remote.get_file_metadata(&path).await {
            Ok(meta) => Some(meta.sha),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let action = if expected_sha.is_some() {
            PublishAction::Update
        } else {
            PublishAction::Create
        };
        debug!("Draft {} -> {} ({:?})", draft.id, path, action);

        let request = WriteRequest {
            path: path.clone(),
            content: draft.render_document(),
            message: action.commit_message(&draft.title),
            committer: self.settings.committer.clone(),
            branch: self.settings.branch.clone(),
            expected_sha,
        };

        let commit = self.remote.write_file(request).await.map_err(|e| {
            if e.is_not_found() {
                // The folder may have gone away; check again next time
                self.folder_ready.store(false, Ordering::Release);
            }
            e
        })?;

        Ok(PublishedDraft {
            draft_id: draft.id.clone(),
            title: draft.title.clone(),
            path,
            action,
            commit,
        })
    }

    async fn refresh_listing(&self) {
        if let Err(e) = self.listing.refetch().await {
            warn!("Published, but refreshing the remote listing failed: {}", e);
        }
    }
}
