use std::path::Path;

use anyhow::{Context, Result};
use notifeed_core::CoreConfig;

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub push_address: Option<String>,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, mut config: CoreConfig) -> CoreConfig {
        if let Some(url) = self.api_base_url {
            config.api_base_url = url;
        }
        if let Some(address) = self.push_address {
            config.push_address = address;
        }
        if self.access_token.is_some() {
            config.access_token = self.access_token;
        }
        if self.user_id.is_some() {
            config.user_id = self.user_id;
        }
        if self.organization_id.is_some() {
            config.organization_id = self.organization_id;
        }
        config
    }
}

/// Load the config file (explicit path, default location, or built-in
/// defaults) and layer the overrides on top.
pub fn resolve_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<CoreConfig> {
    let config = CoreConfig::load_or_default(path).context("Failed to load configuration")?;
    Ok(overrides.apply(config))
}
