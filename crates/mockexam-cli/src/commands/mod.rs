//! Subcommand implementations and the context they share.

pub mod discard;
pub mod history;
pub mod init;
pub mod review;
pub mod start;
pub mod status;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use mockexam_remote::config::{load_config_from, MockexamConfig};
use mockexam_store::{default_data_dir, LocalStore};

/// Loaded configuration plus the local stores it points at.
pub struct AppContext {
    pub config: MockexamConfig,
    pub store: LocalStore,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>, user: Option<String>) -> Result<Self> {
        let mut config = load_config_from(config_path)?;
        if let Some(user) = user {
            config.user_id = user;
        }
        let data_dir = config.data_dir.clone().unwrap_or_else(default_data_dir);
        tracing::debug!(user = %config.user_id, "using data directory {}", data_dir.display());

        Ok(Self {
            store: LocalStore::open(&data_dir),
            config,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_seconds(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_formatting() {
        assert_eq!(format_seconds(0), "0:00");
        assert_eq!(format_seconds(95), "1:35");
        assert_eq!(format_seconds(9000), "2:30:00");
    }
}
