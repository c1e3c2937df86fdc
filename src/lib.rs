//! Markdown draft publishing library
//!
//! This library keeps Markdown drafts in a local JSON store, lists the files
//! already published to a folder of a GitHub repository, and publishes drafts
//! there one at a time or as a batch.

mod cli;
mod config;
mod draft;
mod errors;
mod gate;
mod helper;
mod listing;
mod publisher;
pub mod remote;
mod session;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use draft::*;
pub use errors::*;
pub use gate::*;
pub use helper::*;
pub use listing::*;
pub use publisher::*;
pub use remote::{CommitResult, Committer, FileMetadata, GitHubStore, RemoteEntry, RemoteStore, WriteRequest};
pub use session::*;
pub use storage::*;
pub use types::*;
