use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_PUSH_ADDRESS, DEFAULT_RECONNECT_DELAY_MS};
use crate::engine::{FeedEngine, Identity};
use crate::notice::NoticePresenter;
use crate::transport::{HttpNotificationApi, SocketPushChannel};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Connection and session settings, loadable from a camelCase JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub api_base_url: String,
    /// host:port of the push socket
    pub push_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub reconnect_delay_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            push_address: DEFAULT_PUSH_ADDRESS.to_string(),
            access_token: None,
            user_id: None,
            organization_id: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl CoreConfig {
    /// `<config dir>/notifeed/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("notifeed").join("config.json"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or from the default location when it exists,
    /// otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::load(default),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(Identity::new)
    }

    /// Engine wired to the HTTP API and the socket push channel
    pub fn build_engine(&self, notices: Arc<dyn NoticePresenter>) -> FeedEngine {
        let api = HttpNotificationApi::new(self.api_base_url.clone(), self.access_token.clone());
        let push = SocketPushChannel::new(self.push_address.clone(), self.reconnect_delay());
        FeedEngine::new(Arc::new(api), Arc::new(push), notices)
    }
}
