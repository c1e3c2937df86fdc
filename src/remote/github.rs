//! GitHub Contents API backend.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use log::{debug, trace};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{CommitResult, FileMetadata, RemoteEntry, RemoteResult, RemoteStore, WriteRequest};
use crate::{RemoteConfig, RemoteError, RemoteErrorKind};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("draftpress/", env!("CARGO_PKG_VERSION"));

/// Talks to `/repos/{owner}/{repo}/contents` on a GitHub API host.
pub struct GitHubStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Deserialize)]
struct ContentInfo {
    sha: Option<String>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct CommitInfo {
    sha: Option<String>,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: Option<ContentInfo>,
    commit: Option<CommitInfo>,
}

impl GitHubStore {
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_matches('/')
        )
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self.with_headers(request).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Maps an HTTP status onto the error kinds the workflow switches on
pub fn classify_status(status: StatusCode) -> RemoteErrorKind {
    match status {
        StatusCode::NOT_FOUND => RemoteErrorKind::NotFound,
        StatusCode::UNAUTHORIZED => RemoteErrorKind::Unauthorized,
        StatusCode::FORBIDDEN => RemoteErrorKind::Forbidden,
        // 422 is what GitHub answers when a sha is required but missing
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => RemoteErrorKind::Conflict,
        _ => RemoteErrorKind::Transport,
    }
}

async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    debug!("GitHub request failed with {}: {}", status, message);
    RemoteError::new(classify_status(status), format!("{} ({})", message, status))
}

#[async_trait]
impl RemoteStore for GitHubStore {
    fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    async fn list_folder(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let url = self.contents_url(path);
        trace!("Listing {}", url);

        let response = self
            .send(self.client.get(&url).query(&[("ref", &self.branch)]))
            .await?;
        let value: serde_json::Value = response.json().await?;

        if !value.is_array() {
            return Err(RemoteError::transport(format!("{} is not a folder", path)));
        }
        serde_json::from_value(value)
            .map_err(|e| RemoteError::transport(format!("Unexpected listing format: {}", e)))
    }

    async fn read_file(&self, download_ref: &str) -> RemoteResult<String> {
        trace!("Reading {}", download_ref);
        let response = self.send(self.client.get(download_ref)).await?;
        Ok(response.text().await?)
    }

    async fn get_file_metadata(&self, path: &str) -> RemoteResult<FileMetadata> {
        let url = self.contents_url(path);
        trace!("Fetching metadata for {}", url);

        let response = self
            .send(self.client.get(&url).query(&[("ref", &self.branch)]))
            .await?;
        let info: ContentInfo = response.json().await?;

        info.sha
            .map(|sha| FileMetadata { sha })
            .ok_or_else(|| RemoteError::transport(format!("{} has no content hash", path)))
    }

    async fn write_file(&self, request: WriteRequest) -> RemoteResult<CommitResult> {
        let url = self.contents_url(&request.path);

        let mut payload = json!({
            "message": request.message,
            "content": BASE64_STANDARD.encode(request.content.as_bytes()),
            "branch": request.branch,
        });
        if request.committer.is_set() {
            payload["committer"] = json!(request.committer);
        }
        if let Some(sha) = &request.expected_sha {
            payload["sha"] = json!(sha);
        }

        debug!(
            "Writing {} ({})",
            request.path,
            if request.expected_sha.is_some() { "update" } else { "create" }
        );
        let response = self.send(self.client.put(&url).json(&payload)).await?;
        let written: WriteResponse = response.json().await?;

        let (content_sha, html_url) = match written.content {
            Some(content) => (content.sha, content.html_url),
            None => (None, None),
        };
        Ok(CommitResult {
            content_sha,
            commit_sha: written.commit.and_then(|c| c.sha),
            html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            api_base: "https://api.example.test/".to_string(),
            owner: "octo".to_string(),
            repo: "notes".to_string(),
            token: Some("  ".to_string()),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(classify_status(StatusCode::NOT_FOUND), RemoteErrorKind::NotFound);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), RemoteErrorKind::Unauthorized);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), RemoteErrorKind::Forbidden);
        assert_eq!(classify_status(StatusCode::CONFLICT), RemoteErrorKind::Conflict);
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            RemoteErrorKind::Conflict
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            RemoteErrorKind::Transport
        );
    }

    #[test]
    fn contents_url_joins_cleanly() {
        let store = GitHubStore::new(&config()).unwrap();
        assert_eq!(
            store.contents_url("/drafts/a.md"),
            "https://api.example.test/repos/octo/notes/contents/drafts/a.md"
        );
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let store = GitHubStore::new(&config()).unwrap();
        assert!(!store.has_credential());
    }
}
