use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{load_json_file, write_json_atomic, Committer, DraftError, Result};

/// Where and as whom drafts are published.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the GitHub API
    pub api_base: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Branch commits are made on
    pub branch: String,

    /// Folder inside the repository that holds published drafts
    pub folder: String,

    pub committer_name: String,

    pub committer_email: String,

    /// Access token; usually supplied through `GITHUB_TOKEN` instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            folder: "drafts".to_string(),
            committer_name: String::new(),
            committer_email: String::new(),
            token: None,
        }
    }
}

impl RemoteConfig {
    pub fn committer(&self) -> Committer {
        Committer {
            name: self.committer_name.clone(),
            email: self.committer_email.clone(),
        }
    }

    /// Fails when the repository to publish to is not known
    pub fn require_repository(&self) -> Result<()> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(DraftError::ConfigError {
                message: "remote.owner and remote.repo must be set (or GITHUB_OWNER / GITHUB_REPO)"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// File holding the unpublished drafts
    pub drafts_file: PathBuf,

    /// Default editor command
    pub editor_command: Option<String>,

    pub remote: RemoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".draftpress"));

        Self {
            drafts_file: data_dir.join("markdown_drafts.json"),
            editor_command: None,
            remote: RemoteConfig::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "draftpress")
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.json"))
        .unwrap_or_else(|| PathBuf::from(".draftpress").join("config.json"))
}

impl Config {
    /// Loads the configuration file, falling back to defaults when absent,
    /// then applies environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads only what the file holds, without environment overrides
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        debug!("Loading configuration from {}", path.display());
        load_json_file(path).map_err(|e| DraftError::ConfigError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })
    }

    /// Applies `key=value` to the file at `path` and saves it.
    ///
    /// The file is re-read first so that environment overrides active in this
    /// process never end up on disk.
    pub fn set_in_file(path: &Path, assignment: &str) -> Result<Self> {
        let mut stored = Self::load_file(path)?;
        stored.set_value(assignment)?;
        stored.save(path)?;
        Ok(stored)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        // The token only ever comes from the environment or a hand-edited file
        let mut stored = self.clone();
        stored.remote.token = None;
        write_json_atomic(path, &stored)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overrides remote settings from environment variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let remote = &mut self.remote;
        let targets: [(&str, &mut String); 6] = [
            ("GITHUB_OWNER", &mut remote.owner),
            ("GITHUB_REPO", &mut remote.repo),
            ("GITHUB_BRANCH", &mut remote.branch),
            ("DRAFTS_PATH", &mut remote.folder),
            ("GITHUB_COMMITTER_NAME", &mut remote.committer_name),
            ("GITHUB_COMMITTER_EMAIL", &mut remote.committer_email),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!("{} overrides configuration", key);
                *target = value;
            }
        }

        if let Some(token) = lookup("GITHUB_TOKEN").filter(|v| !v.trim().is_empty()) {
            remote.token = Some(token);
        }
    }

    /// Applies a `key=value` setting as given on the command line
    pub fn set_value(&mut self, assignment: &str) -> Result<()> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(DraftError::ConfigError {
                message: format!("Expected key=value, got '{}'", assignment),
            });
        };
        let value = value.trim().to_string();

        match key.trim() {
            "drafts_file" => self.drafts_file = PathBuf::from(value),
            "editor_command" => {
                self.editor_command = if value.is_empty() { None } else { Some(value) }
            }
            "remote.api_base" => self.remote.api_base = value,
            "remote.owner" => self.remote.owner = value,
            "remote.repo" => self.remote.repo = value,
            "remote.branch" => self.remote.branch = value,
            "remote.folder" => self.remote.folder = value,
            "remote.committer_name" => self.remote.committer_name = value,
            "remote.committer_email" => self.remote.committer_email = value,
            other => {
                return Err(DraftError::ConfigError {
                    message: format!("Unknown configuration key '{}'", other),
                })
            }
        }
        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert!(config.drafts_file.ends_with("markdown_drafts.json"));
        assert_eq!(config.editor_command, None);
        assert_eq!(config.remote.api_base, "https://api.github.com");
    }

    #[test]
    fn env_overrides_replace_remote_settings() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_OWNER", "octo"),
            ("GITHUB_REPO", "site"),
            ("DRAFTS_PATH", "posts"),
            ("GITHUB_TOKEN", "secret"),
            ("GITHUB_BRANCH", " "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.remote.owner, "octo");
        assert_eq!(config.remote.repo, "site");
        assert_eq!(config.remote.folder, "posts");
        assert_eq!(config.remote.branch, "main");
        assert_eq!(config.remote.token.as_deref(), Some("secret"));
    }

    #[test]
    fn save_never_writes_the_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.remote.token = Some("secret".to_string());
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));
    }

    #[test]
    fn set_in_file_keeps_env_overrides_off_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut on_disk = Config::default();
        on_disk.remote.owner = "file-owner".to_string();
        on_disk.save(&path).unwrap();

        let env: HashMap<&str, &str> = [("GITHUB_OWNER", "env-owner"), ("DRAFTS_PATH", "env-folder")]
            .into_iter()
            .collect();
        let mut running = Config::load_file(&path).unwrap();
        running.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(running.remote.owner, "env-owner");

        let stored = Config::set_in_file(&path, "editor_command=vim").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("env-owner"));
        assert!(!raw.contains("env-folder"));
        assert_eq!(stored.remote.owner, "file-owner");
        assert_eq!(stored.editor_command.as_deref(), Some("vim"));
        assert_eq!(Config::load_file(&path).unwrap(), stored);
    }

    #[test]
    fn set_value_accepts_known_keys_only() {
        let mut config = Config::default();
        config.set_value("remote.owner=octo").unwrap();
        config.set_value("editor_command=").unwrap();
        assert_eq!(config.remote.owner, "octo");
        assert_eq!(config.editor_command, None);

        assert!(config.set_value("remote.nope=1").is_err());
        assert!(config.set_value("no-equals").is_err());
    }

    #[test]
    fn repository_is_required() {
        let mut config = Config::default();
        assert!(config.remote.require_repository().is_err());
        config.remote.owner = "octo".into();
        config.remote.repo = "site".into();
        assert!(config.remote.require_repository().is_ok());
    }
}
