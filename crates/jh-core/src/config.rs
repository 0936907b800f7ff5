use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use jh_backend::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::toolset::DEFAULT_MODE;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub mealie: MealieConfig,
    pub obsidian: ObsidianConfig,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    /// OpenAI-compatible endpoint; OpenRouter by default.
    pub base_url: String,
    pub temperature: f32,
    /// Toolset mode, `default` or `shopping`.
    pub mode: String,
    /// Maximum tool calls per query.
    pub max_steps: usize,
    /// Re-asks after output that fails validation.
    pub max_retries: usize,
    /// Command to run to get the API key, via `sh -c`.
    pub api_key_cmd: Option<String>,
    pub api_key: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            mode: DEFAULT_MODE.to_string(),
            max_steps: 10,
            max_retries: 2,
            api_key_cmd: None,
            api_key: None,
        }
    }
}

impl AssistantConfig {
    /// Resolve the API key from api_key_cmd, the config file, then
    /// OPENROUTER_API_KEY or OPENAI_API_KEY.
    pub fn resolve_api_key(&self) -> io::Result<String> {
        if let Some(cmd) = &self.api_key_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        ["OPENROUTER_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "OPENROUTER_API_KEY not set and no api_key_cmd configured",
                )
            })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MealieConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub shopping_list_id: Option<String>,
}

impl MealieConfig {
    /// URL and key, if both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.api_url.as_deref().filter(|s| !s.is_empty())?;
        let key = self.api_key.as_deref().filter(|s| !s.is_empty())?;
        Some((url, key))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObsidianConfig {
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub branch: String,
    pub token: Option<String>,
    /// Folder that new task notes are written to.
    pub tasks_folder: String,
}

impl Default for ObsidianConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repository: None,
            branch: "main".to_string(),
            token: None,
            tasks_folder: jh_services::obsidian::DEFAULT_TASKS_FOLDER.to_string(),
        }
    }
}

impl ObsidianConfig {
    /// Owner, repository and token, if all are set.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        let owner = self.owner.as_deref().filter(|s| !s.is_empty())?;
        let repo = self.repository.as_deref().filter(|s| !s.is_empty())?;
        let token = self.token.as_deref().filter(|s| !s.is_empty())?;
        Some((owner, repo, token))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    /// Custom journal path. Defaults to ~/.local/share/jhutils/journal.jsonl.
    pub path: Option<String>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl JournalConfig {
    /// Resolve the journal path, using the configured path or the XDG default.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(ref custom) = self.path {
            return PathBuf::from(custom);
        }

        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".local").join("share")
            });
        base.join("jhutils").join("journal.jsonl")
    }
}

impl Config {
    /// Load from the default path and apply environment overrides.
    pub fn load_or_default() -> Self {
        Self::load_from(&config_path())
    }

    /// Load from `path`; a missing or broken file falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Override file values with non-empty environment variables.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(name).filter(|v| !v.is_empty());

        if let Some(v) = get("MEALIE_API_URL") {
            self.mealie.api_url = Some(v);
        }
        if let Some(v) = get("MEALIE_API_KEY") {
            self.mealie.api_key = Some(v);
        }
        if let Some(v) = get("MEALIE_SHOPPING_LIST_ID") {
            self.mealie.shopping_list_id = Some(v);
        }
        if let Some(v) = get("OBSIDIAN_VAULT_OWNER") {
            self.obsidian.owner = Some(v);
        }
        if let Some(v) = get("OBSIDIAN_VAULT_REPOSITORY") {
            self.obsidian.repository = Some(v);
        }
        if let Some(v) = get("OBSIDIAN_VAULT_BRANCH") {
            self.obsidian.branch = v;
        }
        if let Some(v) = get("OBSIDIAN_VAULT_TOKEN") {
            self.obsidian.token = Some(v);
        }
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let hide = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        let mut copy = self.clone();
        copy.assistant.api_key = hide(&self.assistant.api_key);
        copy.mealie.api_key = hide(&self.mealie.api_key);
        copy.obsidian.token = hide(&self.obsidian.token);
        copy
    }
}

pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("jhutils").join("config.toml")
}
