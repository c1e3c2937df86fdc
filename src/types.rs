//! Shared result types and the command-line surface.
use std::{fmt, path::PathBuf};

use clap::Subcommand;
use serde::Serialize;

use crate::{remote::CommitResult, DraftError, RemoteError};

/// A specialized Result type for draftpress operations.
pub type Result<T> = std::result::Result<T, DraftError>;

/// Whether a publish created a new remote file or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishAction {
    Create,
    Update,
}

impl PublishAction {
    pub fn commit_message(self, title: &str) -> String {
        match self {
            PublishAction::Create => format!("Create draft {}", title),
            PublishAction::Update => format!("Update draft {}", title),
        }
    }
}

/// A draft that reached the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedDraft {
    pub draft_id: String,
    pub title: String,
    /// Path of the remote file that was written
    pub path: String,
    pub action: PublishAction,
    pub commit: CommitResult,
}

/// What happened to one draft during a batch publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Published(PublishedDraft),
    /// Not sent to the remote store; the draft stays local
    Skipped { reason: String },
    /// The remote write failed; the draft stays local
    Failed(RemoteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub draft_id: String,
    pub title: String,
    pub outcome: ItemOutcome,
}

/// Per-draft results of a batch publish that ran to completion.
///
/// A report exists only when the batch itself went through; individual
/// entries may still have failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<ItemResult>,
}

impl BatchReport {
    pub fn published(&self) -> impl Iterator<Item = &PublishedDraft> {
        self.results.iter().filter_map(|r| match &r.outcome {
            ItemOutcome::Published(p) => Some(p),
            _ => None,
        })
    }

    pub fn published_count(&self) -> usize {
        self.published().count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Skipped { .. }))
            .count()
    }

    /// True when every draft in the batch was published
    pub fn all_published(&self) -> bool {
        self.published_count() == self.results.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A human-readable outcome shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Available subcommands for the draftpress application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new draft
    Add {
        /// Title of the draft
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Markdown body of the draft
        #[clap(short, long)]
        body: Option<String>,

        /// Path to a file containing the draft's body
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Edit an existing draft
    Edit {
        /// ID of the draft to edit
        id: String,

        /// New title for the draft
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New body for the draft
        #[clap(short, long)]
        body: Option<String>,

        /// Path to a file containing the new body
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a draft (the most recent one when no ID is given)
    Delete {
        /// ID of the draft to delete
        id: Option<String>,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// List local drafts
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Show full bodies instead of a preview
        #[clap(short, long)]
        detailed: bool,
    },

    /// Show the document a draft would publish
    Preview {
        /// ID of the draft
        id: String,

        /// Render as HTML
        #[clap(long)]
        html: bool,
    },

    /// Publish one draft to the remote repository
    Publish {
        /// ID of the draft to publish
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Publish every local draft, one after another
    PublishAll {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Browse files already published
    #[clap(subcommand)]
    Remote(RemoteCommands),

    /// Interactive session
    Shell,

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// List published Markdown files
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show one published file
    Show {
        /// File name, e.g. My_Draft.md
        name: String,

        /// Render as HTML
        #[clap(long)]
        html: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteErrorKind;

    fn item(outcome: ItemOutcome) -> ItemResult {
        ItemResult {
            draft_id: "id".into(),
            title: "t".into(),
            outcome,
        }
    }

    #[test]
    fn commit_messages_differ_by_action() {
        assert_eq!(PublishAction::Create.commit_message("A"), "Create draft A");
        assert_eq!(PublishAction::Update.commit_message("A"), "Update draft A");
    }

    #[test]
    fn report_counts_outcomes() {
        let published = PublishedDraft {
            draft_id: "id".into(),
            title: "t".into(),
            path: "drafts/t.md".into(),
            action: PublishAction::Create,
            commit: CommitResult {
                content_sha: None,
                commit_sha: None,
                html_url: None,
            },
        };
        let report = BatchReport {
            results: vec![
                item(ItemOutcome::Published(published)),
                item(ItemOutcome::Skipped {
                    reason: "empty".into(),
                }),
                item(ItemOutcome::Failed(RemoteError::new(
                    RemoteErrorKind::Conflict,
                    "stale",
                ))),
            ],
        };

        assert_eq!(report.published_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.all_published());
        assert!(BatchReport::default().all_published());
    }
}
