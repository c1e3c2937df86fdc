//! The local draft and the naming rules that map it onto the remote store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DraftError, Result};

/// Represents a single unpublished draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Unique identifier, fixed at creation
    pub id: String,
    /// Draft title, also the source of the remote filename
    pub title: String,
    /// Markdown body
    pub body: String,
    /// When the draft was created locally
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// Creates a new draft after checking that title and body are present
    pub fn new(title: String, body: String) -> Result<Self> {
        validate_fields(&title, &body)?;

        Ok(Draft {
            id: Uuid::new_v4().simple().to_string(),
            title,
            body,
            created_at: Utc::now(),
        })
    }

    /// Filename this draft publishes to, e.g. `My_Draft.md`
    pub fn remote_filename(&self) -> String {
        remote_filename(&self.title)
    }

    /// The Markdown document written to the remote store
    pub fn render_document(&self) -> String {
        format!("# {}\n\n{}", self.title, self.body)
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Rejects a title or body that is empty after trimming
pub fn validate_fields(title: &str, body: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(DraftError::validation("Draft title cannot be empty"));
    }
    if body.trim().is_empty() {
        return Err(DraftError::validation("Draft body cannot be empty"));
    }
    Ok(())
}

/// Replaces every character outside `[A-Za-z0-9-_]` with `_`.
///
/// Replacements are counted in UTF-16 units, so a character outside the
/// Basic Multilingual Plane becomes `__`, matching files published by the
/// web publisher.
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            sanitized.push(c);
        } else {
            sanitized.extend(std::iter::repeat('_').take(c.len_utf16()));
        }
    }
    sanitized
}

pub fn remote_filename(title: &str) -> String {
    format!("{}.md", sanitize_title(title))
}

/// Joins the target folder and a filename into a remote path
pub fn remote_path(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_each_disallowed_character() {
        assert_eq!(remote_filename("My Draft #1!"), "My_Draft__1_.md");
        assert_eq!(sanitize_title("keep-this_one"), "keep-this_one");
        assert_eq!(sanitize_title("café"), "caf_");
    }

    #[test]
    fn astral_characters_take_two_underscores() {
        assert_eq!(sanitize_title("Launch 🚀"), "Launch___");
        assert_eq!(remote_filename("🎉"), "__.md");
    }

    #[test]
    fn new_rejects_blank_fields() {
        assert!(matches!(
            Draft::new("   ".into(), "body".into()),
            Err(DraftError::Validation { .. })
        ));
        assert!(matches!(
            Draft::new("title".into(), "\n\t".into()),
            Err(DraftError::Validation { .. })
        ));
    }

    #[test]
    fn new_assigns_distinct_ids() {
        let a = Draft::new("a".into(), "x".into()).unwrap();
        let b = Draft::new("a".into(), "x".into()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn document_starts_with_title_heading() {
        let draft = Draft::new("Hello".into(), "World".into()).unwrap();
        assert_eq!(draft.render_document(), "# Hello\n\nWorld");
    }

    #[test]
    fn remote_path_trims_folder_slashes() {
        assert_eq!(remote_path("/drafts/", "a.md"), "drafts/a.md");
        assert_eq!(remote_path("", "a.md"), "a.md");
    }

    #[test]
    fn serializes_with_camel_case_timestamp() {
        let draft = Draft::new("t".into(), "b".into()).unwrap();
        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("createdAt").and_then(|v| v.as_str()).is_some());
    }
}
