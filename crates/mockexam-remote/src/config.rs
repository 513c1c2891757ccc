//! Configuration loading and remote factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mockexam_core::model::{ExamPart, ExamProfile};
use mockexam_core::session::{ClockPolicy, SessionConfig};
use mockexam_core::traits::RemoteStore;

use crate::local::LocalRemote;
use crate::rest::{RestRemote, RestTables};

/// Which remote backend to use.
///
/// Note: Custom Debug impl masks credentials to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteConfig {
    Rest {
        url: String,
        api_key: String,
        /// User JWT for row-level security; the API key is sent when absent.
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default)]
        tables: RestTables,
    },
    Local {
        #[serde(default = "default_bank_dir")]
        bank_dir: PathBuf,
    },
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteConfig::Rest {
                url,
                api_key: _,
                access_token,
                tables,
            } => f
                .debug_struct("Rest")
                .field("url", url)
                .field("api_key", &"***")
                .field("access_token", &access_token.as_ref().map(|_| "***"))
                .field("tables", tables)
                .finish(),
            RemoteConfig::Local { bank_dir } => f
                .debug_struct("Local")
                .field("bank_dir", bank_dir)
                .finish(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig::Local {
            bank_dir: default_bank_dir(),
        }
    }
}

fn default_bank_dir() -> PathBuf {
    PathBuf::from("./question-banks")
}

/// Per-part overrides of the built-in exam profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOverride {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub question_count: Option<usize>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub pass_mark: Option<u32>,
}

impl ProfileOverride {
    fn apply(&self, mut profile: ExamProfile) -> ExamProfile {
        if let Some(title) = &self.title {
            profile.title = title.clone();
        }
        if let Some(count) = self.question_count {
            profile.question_count = count;
        }
        if let Some(minutes) = self.duration_minutes {
            profile.duration_minutes = minutes;
        }
        if let Some(mark) = self.pass_mark {
            profile.pass_mark = mark.min(100);
        }
        profile
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsConfig {
    #[serde(default)]
    pub part_a: ProfileOverride,
    #[serde(default)]
    pub part_b: ProfileOverride,
}

/// Top-level mockexam configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockexamConfig {
    /// Identity that keys snapshots and history.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Local data directory; the platform default when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub parts: PartsConfig,
    /// Deadline for each remote call in seconds (0 disables).
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,
    /// Persist the snapshot every N ticks (0 disables tick persistence).
    #[serde(default = "default_persist_every")]
    pub persist_every_ticks: u32,
    #[serde(default)]
    pub clock_policy: ClockPolicy,
}

fn default_user_id() -> String {
    "local-user".to_string()
}
fn default_submit_timeout() -> u64 {
    30
}
fn default_persist_every() -> u32 {
    1
}

impl Default for MockexamConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            data_dir: None,
            remote: RemoteConfig::default(),
            parts: PartsConfig::default(),
            submit_timeout_secs: default_submit_timeout(),
            persist_every_ticks: default_persist_every(),
            clock_policy: ClockPolicy::default(),
        }
    }
}

impl MockexamConfig {
    /// The built-in profile for `part` with configured overrides applied.
    pub fn profile(&self, part: ExamPart) -> ExamProfile {
        let overrides = match part {
            ExamPart::PartA => &self.parts.part_a,
            ExamPart::PartB => &self.parts.part_b,
        };
        overrides.apply(ExamProfile::default_for(part))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            remote_timeout: (self.submit_timeout_secs > 0)
                .then(|| Duration::from_secs(self.submit_timeout_secs)),
            persist_every_ticks: self.persist_every_ticks,
            clock_policy: self.clock_policy,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Single left-to-right pass; substituted values are never rescanned. An
/// unterminated `${` is kept verbatim.
fn substitute_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + 2 + len];
        result.push_str(&lookup(var_name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Resolve env vars in a remote config.
fn resolve_remote_config(config: &RemoteConfig) -> RemoteConfig {
    match config {
        RemoteConfig::Rest {
            url,
            api_key,
            access_token,
            tables,
        } => RemoteConfig::Rest {
            url: resolve_env_vars(url),
            api_key: resolve_env_vars(api_key),
            access_token: access_token
                .as_ref()
                .map(|t| resolve_env_vars(t))
                .filter(|t| !t.is_empty()),
            tables: tables.clone(),
        },
        RemoteConfig::Local { bank_dir } => RemoteConfig::Local {
            bank_dir: resolve_path(bank_dir),
        },
    }
}

/// Apply `MOCKEXAM_API_KEY` and `MOCKEXAM_USER` style overrides from `lookup`.
fn apply_overrides(config: &mut MockexamConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(user) = lookup("MOCKEXAM_USER").filter(|u| !u.is_empty()) {
        config.user_id = user;
    }
    if let Some(key) = lookup("MOCKEXAM_API_KEY") {
        if let RemoteConfig::Rest { api_key, .. } = &mut config.remote {
            *api_key = key;
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mockexam.toml` in the current directory
/// 2. `~/.config/mockexam/config.toml`
///
/// Environment variable overrides: `MOCKEXAM_API_KEY`, `MOCKEXAM_USER`.
pub fn load_config() -> Result<MockexamConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MockexamConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mockexam.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MockexamConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MockexamConfig::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok());

    config.user_id = resolve_env_vars(&config.user_id);
    config.data_dir = config.data_dir.as_deref().map(resolve_path);
    config.remote = resolve_remote_config(&config.remote);

    tracing::debug!(path = ?config_path, remote = ?config.remote, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mockexam"))
}

/// Create a remote store from its configuration. The offline backend keeps
/// its records under `data_dir`.
pub fn create_remote(
    config: &RemoteConfig,
    data_dir: &Path,
    timeout_secs: u64,
) -> Result<Arc<dyn RemoteStore>> {
    match config {
        RemoteConfig::Rest {
            url,
            api_key,
            access_token,
            tables,
        } => {
            if url.is_empty() {
                anyhow::bail!("remote.url is empty");
            }
            if api_key.is_empty() {
                anyhow::bail!("remote.api_key is empty (set it in config or MOCKEXAM_API_KEY)");
            }
            let mut remote = RestRemote::new(url, api_key)?
                .with_access_token(access_token.clone())
                .with_tables(tables.clone());
            if timeout_secs > 0 {
                remote = remote.with_timeout(timeout_secs)?;
            }
            Ok(Arc::new(remote))
        }
        RemoteConfig::Local { bank_dir } => Ok(Arc::new(LocalRemote::new(bank_dir, data_dir))),
    }
}
