//! Obsidian vault client backed by the GitHub contents API.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};
use crate::http::{auth_headers, ApiClient};
use crate::time::time_id_now;
use crate::TaskService;

pub const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
pub const DEFAULT_TASKS_FOLDER: &str = "Inbox";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A file with its content decoded to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultFile {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub content: String,
}

/// Cached state for a path: either a listing or a decoded file.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntry {
    Dir(Vec<DirEntry>),
    File(VaultFile),
}

impl CachedEntry {
    pub fn sha(&self) -> Option<&str> {
        match self {
            CachedEntry::File(file) => Some(file.sha.as_str()),
            CachedEntry::Dir(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFile {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

/// Client for an Obsidian vault stored in a GitHub repository.
#[derive(Debug)]
pub struct Obsidian {
    api: ApiClient,
    branch: String,
    tasks_folder: String,
    files: Mutex<HashMap<String, CachedEntry>>,
}

impl Obsidian {
    pub fn new(owner: &str, repository: &str, branch: &str, token: &str) -> Self {
        Self::with_api_url(GITHUB_API_URL, owner, repository, branch, token)
    }

    /// Same as [`Obsidian::new`] against a different API host.
    pub fn with_api_url(api_url: &str, owner: &str, repository: &str, branch: &str, token: &str) -> Self {
        let base = format!(
            "{}/repos/{owner}/{repository}/contents",
            api_url.trim_end_matches('/')
        );
        Self {
            api: ApiClient::new(&base, auth_headers(&format!("token {token}"), GITHUB_ACCEPT)),
            branch: branch.to_string(),
            tasks_folder: DEFAULT_TASKS_FOLDER.to_string(),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Build from the `OBSIDIAN_VAULT_*` environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new(
            &var("OBSIDIAN_VAULT_OWNER"),
            &var("OBSIDIAN_VAULT_REPOSITORY"),
            &var("OBSIDIAN_VAULT_BRANCH"),
            &var("OBSIDIAN_VAULT_TOKEN"),
        )
    }

    pub fn with_tasks_folder(mut self, folder: impl Into<String>) -> Self {
        self.tasks_folder = folder.into().trim_matches('/').to_string();
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tasks_folder(&self) -> &str {
        &self.tasks_folder
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, CachedEntry>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of everything fetched so far, keyed by path.
    pub fn files(&self) -> HashMap<String, CachedEntry> {
        self.cache().clone()
    }

    fn ref_query(&self) -> [(&'static str, &str); 1] {
        [("ref", self.branch.as_str())]
    }

    /// List a folder; `""` lists the vault root.
    pub async fn list_files(&self, path: &str) -> Result<Vec<DirEntry>> {
        let value = self.api.get(path, &self.ref_query()).await?;
        let content = value
            .get("content")
            .cloned()
            .ok_or_else(|| ServiceError::Unexpected(format!("'{path}' is not a folder")))?;
        let entries: Vec<DirEntry> = serde_json::from_value(content)?;
        debug!(path, count = entries.len(), "listed vault folder");
        self.cache()
            .insert(path.to_string(), CachedEntry::Dir(entries.clone()));
        Ok(entries)
    }

    pub async fn read_file(&self, path: &str) -> Result<VaultFile> {
        let value = self.api.get(path, &self.ref_query()).await?;
        let raw: RawFile = serde_json::from_value(value)?;

        let encoded: String = raw.content.split_whitespace().collect();
        let content = String::from_utf8(BASE64.decode(encoded)?)?;
        let file = VaultFile {
            name: raw.name,
            path: raw.path,
            sha: raw.sha,
            content,
        };
        self.cache()
            .insert(path.to_string(), CachedEntry::File(file.clone()));
        Ok(file)
    }

    pub async fn add_file(&self, path: &str, content: &str) -> Result<Value> {
        let body = json!({
            "message": format!("add {path}"),
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.branch,
        });
        let response = self.api.put(path, &body).await?;
        info!(path, "added vault file");
        Ok(response)
    }

    pub async fn update_file(&self, path: &str, content: &str, sha: Option<&str>) -> Result<Value> {
        let sha = self.resolve_sha(path, sha).await?;
        let body = json!({
            "message": format!("update {path}"),
            "content": BASE64.encode(content.as_bytes()),
            "sha": sha,
            "branch": self.branch,
        });
        let response = self.api.put(path, &body).await?;
        self.cache().remove(path);
        info!(path, "updated vault file");
        Ok(response)
    }

    pub async fn delete_file(&self, path: &str, sha: Option<&str>) -> Result<Value> {
        let sha = self.resolve_sha(path, sha).await?;
        let body = json!({
            "message": format!("delete {path}"),
            "sha": sha,
            "branch": self.branch,
        });
        let response = self.api.delete::<(), _>(path, None, Some(&body)).await?;
        self.cache().remove(path);
        info!(path, "deleted vault file");
        Ok(response)
    }

    /// Explicit SHA, else the cached one, else read the file.
    async fn resolve_sha(&self, path: &str, sha: Option<&str>) -> Result<String> {
        if let Some(sha) = sha {
            return Ok(sha.to_string());
        }
        let cached = self
            .cache()
            .get(path)
            .and_then(|entry| entry.sha().map(str::to_string));
        match cached {
            Some(sha) => Ok(sha),
            None => Ok(self.read_file(path).await?.sha),
        }
    }

    /// Write `tasks` as a new checklist note in the tasks folder.
    pub async fn add_tasks(&self, tasks: &[String]) -> Result<Value> {
        let path = format!("{}/{}.md", self.tasks_folder, time_id_now());
        self.add_file(&path, &task_note(tasks)).await
    }
}

/// Markdown checklist with one unchecked box per task.
pub fn task_note(tasks: &[String]) -> String {
    tasks
        .iter()
        .map(|task| format!("- [ ] {}\n", task.trim()))
        .collect()
}

#[async_trait]
impl TaskService for Obsidian {
    async fn add_tasks(&self, tasks: &[String]) -> Result<()> {
        Obsidian::add_tasks(self, tasks).await?;
        Ok(())
    }
}
