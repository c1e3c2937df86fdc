//! User actions over drafts, published files and the publish workflow.
//!
//! A [`Session`] wires the local store, the remote listing, the publish
//! coordinator and the edit/confirmation gate together. Every action answers
//! with [`Notice`]s instead of errors so that each outcome can be shown.
use std::sync::Arc;

use log::{debug, info};

use crate::remote::{GitHubStore, RemoteStore};
use crate::{
    Config, ConfirmationRequest, DraftError, DraftStore, Gate, ItemOutcome, JsonFilePersistence,
    Notice, PendingAction, PublishCoordinator, PublishSettings, RemoteListing, Result,
};

pub struct Session {
    store: Arc<DraftStore>,
    listing: Arc<RemoteListing>,
    coordinator: Arc<PublishCoordinator>,
    gate: Gate,
}

impl Session {
    /// Builds a session over an already opened store and a remote backend
    pub fn new(
        store: Arc<DraftStore>,
        remote: Arc<dyn RemoteStore>,
        settings: PublishSettings,
    ) -> Self {
        let listing = Arc::new(RemoteListing::new(
            Arc::clone(&remote),
            settings.folder.clone(),
        ));
        let coordinator = Arc::new(PublishCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&listing),
            remote,
            settings,
        ));

        Self {
            store,
            listing,
            coordinator,
            gate: Gate::new(),
        }
    }

    /// Opens the drafts file and the GitHub backend named by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(DraftStore::open(Box::new(JsonFilePersistence::new(
            &config.drafts_file,
        ))));
        let remote: Arc<dyn RemoteStore> = Arc::new(GitHubStore::new(&config.remote)?);
        Ok(Self::new(store, remote, PublishSettings::from(&config.remote)))
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    pub fn listing(&self) -> &RemoteListing {
        &self.listing
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn is_publishing(&self) -> bool {
        self.coordinator.is_publishing()
    }

    pub fn pending_confirmation(&self) -> Option<&ConfirmationRequest> {
        self.gate.pending()
    }

    fn notice_for(&self, err: &DraftError) -> Notice {
        match err {
            DraftError::EditLocked { id } => {
                let title = self
                    .store
                    .get(id)
                    .map(|d| d.title)
                    .unwrap_or_else(|| id.clone());
                Notice::error(format!("Finish editing \"{}\" first", title))
            }
            other => Notice::error(other.to_string()),
        }
    }

    pub fn add_draft(&mut self, title: &str, body: &str) -> Notice {
        match self.store.add(title, body) {
            Ok(draft) => Notice::success(format!("\"{}\" saved as draft {}", draft.title, draft.id)),
            Err(e) => self.notice_for(&e),
        }
    }

    /// Takes the edit lock for a draft
    pub fn start_edit(&mut self, id: &str) -> Notice {
        let Some(draft) = self.store.get(id) else {
            return self.notice_for(&DraftError::DraftNotFound { id: id.to_string() });
        };
        match self.gate.start_edit(id) {
            Ok(()) => Notice::info(format!("Editing \"{}\"", draft.title)),
            Err(e) => self.notice_for(&e),
        }
    }

    /// Saves the locked draft and releases the lock.
    ///
    /// Invalid fields keep the lock so the edit can be corrected.
    pub fn finish_edit(&mut self, title: &str, body: &str) -> Notice {
        let Some(id) = self.gate.editing().map(str::to_string) else {
            return Notice::error("No draft is being edited");
        };

        match self.store.update(&id, title, body) {
            Ok(true) => {
                self.gate.end_edit();
                Notice::success(format!("\"{}\" updated", title))
            }
            Ok(false) => {
                // The draft vanished underneath the edit
                self.gate.end_edit();
                self.notice_for(&DraftError::DraftNotFound { id })
            }
            Err(e) => self.notice_for(&e),
        }
    }

    pub fn cancel_edit(&mut self) -> Notice {
        match self.gate.end_edit() {
            Some(_) => Notice::info("Edit cancelled"),
            None => Notice::info("No draft is being edited"),
        }
    }

    fn request(&mut self, request: ConfirmationRequest) -> Notice {
        let queued = self.gate.request(request).map(|pending| pending.message.clone());
        match queued {
            Ok(message) => Notice::info(message),
            Err(e) => self.notice_for(&e),
        }
    }

    /// Asks for confirmation before deleting a draft
    pub fn request_delete(&mut self, id: &str) -> Notice {
        if let Err(e) = self.gate.ensure_unlocked() {
            return self.notice_for(&e);
        }
        let Some(draft) = self.store.get(id) else {
            return self.notice_for(&DraftError::DraftNotFound { id: id.to_string() });
        };

        self.request(ConfirmationRequest {
            message: format!("Delete \"{}\"?", draft.title),
            target: Some(draft),
            action: PendingAction::DeleteDraft,
        })
    }

    /// The Delete-key shortcut: asks to delete the most recent draft.
    ///
    /// Does nothing while a draft is being edited or when there are no drafts.
    pub fn request_delete_latest(&mut self) -> Option<Notice> {
        if self.gate.is_locked() {
            debug!("Delete shortcut ignored while editing");
            return None;
        }
        let draft = self.store.first()?;
        Some(self.request_delete(&draft.id))
    }

    /// Asks for confirmation before publishing one draft
    pub fn request_publish(&mut self, id: &str) -> Notice {
        if let Err(e) = self.gate.ensure_unlocked() {
            return self.notice_for(&e);
        }
        if self.is_publishing() {
            return self.notice_for(&DraftError::PublishInProgress);
        }
        let Some(draft) = self.store.get(id) else {
            return self.notice_for(&DraftError::DraftNotFound { id: id.to_string() });
        };

        self.request(ConfirmationRequest {
            message: format!("Publish \"{}\"?", draft.title),
            target: Some(draft),
            action: PendingAction::PublishDraft,
        })
    }

    /// Asks for confirmation before publishing every draft
    pub fn request_publish_all(&mut self) -> Notice {
        if let Err(e) = self.gate.ensure_unlocked() {
            return self.notice_for(&e);
        }
        if self.is_publishing() {
            return self.notice_for(&DraftError::PublishInProgress);
        }
        let count = self.store.len();
        if count == 0 {
            return Notice::error("No drafts to publish!");
        }

        self.request(ConfirmationRequest {
            message: format!("Publish {} draft(s)?", count),
            target: None,
            action: PendingAction::PublishAll,
        })
    }

    /// Drops the pending confirmation without running it
    pub fn cancel_confirmation(&mut self) -> Notice {
        match self.gate.cancel() {
            Some(request) => Notice::info(format!("Cancelled: {}", request.message)),
            None => Notice::info("Nothing to cancel"),
        }
    }

    /// Runs the pending action with the draft captured at request time
    pub async fn confirm(&mut self) -> Vec<Notice> {
        let Some(request) = self.gate.confirm() else {
            return vec![Notice::info("Nothing to confirm")];
        };
        // The lock may have been taken after the request was made
        if let Err(e) = self.gate.ensure_unlocked() {
            return vec![self.notice_for(&e)];
        }

        match (request.action, request.target) {
            (PendingAction::DeleteDraft, Some(draft)) => {
                if self.store.delete(&draft.id) {
                    vec![Notice::success(format!(
                        "\"{}\" deleted successfully!",
                        draft.title
                    ))]
                } else {
                    vec![self.notice_for(&DraftError::DraftNotFound { id: draft.id })]
                }
            }
            (PendingAction::PublishDraft, Some(draft)) => {
                match self.coordinator.publish_one(&draft.id).await {
                    Ok(_) => vec![Notice::success(format!(
                        "\"{}\" published successfully!",
                        draft.title
                    ))],
                    Err(e) => vec![Notice::error(format!(
                        "Failed to publish \"{}\": {}",
                        draft.title, e
                    ))],
                }
            }
            (PendingAction::PublishAll, _) => self.publish_all().await,
            (action, None) => {
                vec![Notice::error(format!("{:?} needs a target draft", action))]
            }
        }
    }

    async fn publish_all(&mut self) -> Vec<Notice> {
        let report = match self.coordinator.publish_all().await {
            Ok(report) => report,
            Err(e) => return vec![Notice::error(format!("Error publishing drafts: {}", e))],
        };

        if report.all_published() {
            return vec![Notice::success("Drafts published successfully!")];
        }

        let mut notices = vec![Notice::info(format!(
            "Published {} of {} draft(s)",
            report.published_count(),
            report.results.len()
        ))];
        for item in &report.results {
            match &item.outcome {
                ItemOutcome::Published(_) => {}
                ItemOutcome::Skipped { reason } => {
                    notices.push(Notice::info(format!("Draft {}: {}", item.draft_id, reason)))
                }
                ItemOutcome::Failed(e) => notices.push(Notice::error(format!(
                    "Failed to publish \"{}\": {}",
                    item.title, e
                ))),
            }
        }
        notices
    }

    /// Reloads the published file listing
    pub async fn refresh(&mut self) -> Notice {
        match self.listing.refetch().await {
            Ok(count) => {
                info!("Listing refreshed");
                Notice::info(format!("{} published file(s)", count))
            }
            Err(e) => Notice::error(format!("Failed to fetch drafts: {}", e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;
    use crate::{Committer, MemoryPersistence, NoticeLevel};

    fn session() -> (Session, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let store = Arc::new(DraftStore::open(Box::new(MemoryPersistence::new())));
        let settings = PublishSettings {
            folder: "drafts".to_string(),
            branch: "main".to_string(),
            committer: Committer::default(),
        };
        let dyn_remote: Arc<dyn RemoteStore> = remote.clone();
        (Session::new(store, dyn_remote, settings), remote)
    }

    #[test]
    fn add_reports_validation_errors() {
        let (mut session, _) = session();
        assert!(session.add_draft("", "x").is_error());
        assert!(!session.add_draft("T", "x").is_error());
        assert_eq!(session.store().len(), 1);
    }

    #[tokio::test]
    async fn edit_lock_blocks_delete_and_publish_of_other_drafts() {
        let (mut session, remote) = session();
        session.add_draft("X", "x");
        session.add_draft("Y", "y");
        let drafts = session.store().list();
        let (y, x) = (drafts[0].clone(), drafts[1].clone());

        assert_eq!(session.start_edit(&x.id).level, NoticeLevel::Info);

        let refused = session.start_edit(&y.id);
        assert!(refused.is_error());
        assert_eq!(refused.message, "Finish editing \"X\" first");

        assert!(session.request_delete(&y.id).is_error());
        assert!(session.request_publish(&y.id).is_error());
        assert!(session.request_publish_all().is_error());
        assert!(session.request_delete_latest().is_none());
        assert!(session.pending_confirmation().is_none());

        assert_eq!(session.store().list(), vec![y, x]);
        assert!(remote.writes().is_empty());
    }

    #[test]
    fn finish_edit_updates_locked_draft_and_releases_lock() {
        let (mut session, _) = session();
        session.add_draft("Old", "body");
        let id = session.store().first().unwrap().id;

        session.start_edit(&id);
        assert!(session.finish_edit("", "body").is_error());
        assert!(session.gate().is_locked());

        assert!(!session.finish_edit("New", "body 2").is_error());
        assert!(!session.gate().is_locked());
        assert_eq!(session.store().get(&id).unwrap().title, "New");
    }

    #[test]
    fn cancel_edit_releases_lock_without_changes() {
        let (mut session, _) = session();
        session.add_draft("Old", "body");
        let id = session.store().first().unwrap().id;

        session.start_edit(&id);
        session.cancel_edit();

        assert!(!session.gate().is_locked());
        assert_eq!(session.store().get(&id).unwrap().title, "Old");
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let (mut session, _) = session();
        session.add_draft("A", "a");
        let id = session.store().first().unwrap().id;

        let asked = session.request_delete(&id);
        assert_eq!(asked.message, "Delete \"A\"?");
        assert_eq!(session.store().len(), 1);

        session.cancel_confirmation();
        assert_eq!(session.store().len(), 1);

        session.request_delete(&id);
        let notices = session.confirm().await;
        assert_eq!(notices[0].message, "\"A\" deleted successfully!");
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn delete_key_targets_most_recent_draft() {
        let (mut session, _) = session();
        session.add_draft("Old", "a");
        session.add_draft("New", "b");

        let asked = session.request_delete_latest().unwrap();
        assert_eq!(asked.message, "Delete \"New\"?");

        session.confirm().await;
        let titles: Vec<_> = session.store().list().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Old"]);
    }

    #[tokio::test]
    async fn confirmed_publish_removes_draft() {
        let (mut session, remote) = session();
        session.add_draft("Post", "body");
        let id = session.store().first().unwrap().id;

        assert_eq!(session.request_publish(&id).message, "Publish \"Post\"?");
        let notices = session.confirm().await;

        assert_eq!(notices[0].message, "\"Post\" published successfully!");
        assert!(session.store().is_empty());
        assert!(remote.file("drafts/Post.md").is_some());
        assert_eq!(session.listing().files().len(), 1);
    }

    #[tokio::test]
    async fn publish_all_reports_partial_failures() {
        let (mut session, remote) = session();
        remote.insert_file("drafts/.gitkeep", "");
        remote.fail_writes_to(
            "drafts/Bad.md",
            crate::RemoteError::new(crate::RemoteErrorKind::Conflict, "sha mismatch"),
        );
        session.add_draft("Bad", "x");
        session.add_draft("Good", "y");

        assert_eq!(session.request_publish_all().message, "Publish 2 draft(s)?");
        let notices = session.confirm().await;

        assert_eq!(notices[0].message, "Published 1 of 2 draft(s)");
        assert!(notices[1].is_error());
        let titles: Vec<_> = session.store().list().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Bad"]);
    }

    #[test]
    fn publish_all_without_drafts_is_refused() {
        let (mut session, _) = session();
        let notice = session.request_publish_all();
        assert_eq!(notice.message, "No drafts to publish!");
        assert!(session.pending_confirmation().is_none());
    }
}
