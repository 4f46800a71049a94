use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Reply endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/api/chat";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL the reply fetcher POSTs to
    pub endpoint: String,

    /// JSON-RPC URL of the wallet used for `/connect`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_rpc_url: Option<String>,

    /// wisp home directory
    #[serde(skip)]
    pub wisp_home: PathBuf,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub theme: String,
    pub show_identity: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            show_identity: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            wallet_rpc_url: None,
            wisp_home: home.join(".wisp"),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.wisp/config.toml`, then apply environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let mut config = Self::load_from(&home.join(".wisp"))?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration rooted at `wisp_home`, writing defaults if no file exists
    pub fn load_from(wisp_home: &Path) -> Result<Self> {
        fs::create_dir_all(wisp_home).context("Failed to create .wisp directory")?;

        let config_path = wisp_home.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config {
                wisp_home: wisp_home.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            config
        };

        config.wisp_home = wisp_home.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.wisp_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply `WISP_ENDPOINT` / `WISP_WALLET_RPC` if set
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(endpoint) = non_blank("WISP_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(rpc) = non_blank("WISP_WALLET_RPC") {
            self.wallet_rpc_url = Some(rpc);
        }
    }

    /// Host part of the endpoint for the status bar
    pub fn endpoint_host(&self) -> &str {
        let without_scheme = self
            .endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.wallet_rpc_url.is_none());
        assert_eq!(config.wisp_home, dir.path());
        assert!(dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_load_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "endpoint = \"https://chat.example.com/api\"\nwallet_rpc_url = \"http://localhost:8545\"\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.endpoint, "https://chat.example.com/api");
        assert_eq!(config.wallet_rpc_url.as_deref(), Some("http://localhost:8545"));
        assert!(config.ui.show_identity);
    }

    #[test]
    fn test_env_overrides_endpoint_and_wallet() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "WISP_ENDPOINT" => Some("https://chat.example.com/api".to_string()),
            "WISP_WALLET_RPC" => Some("http://localhost:8545".to_string()),
            _ => None,
        });

        assert_eq!(config.endpoint, "https://chat.example.com/api");
        assert_eq!(config.wallet_rpc_url.as_deref(), Some("http://localhost:8545"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("   ".to_string()));

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.wallet_rpc_url.is_none());
    }

    #[test]
    fn test_apply_env_reads_process_environment() {
        // Only this test touches these variables
        unsafe {
            std::env::set_var("WISP_ENDPOINT", "http://10.0.0.2:9000/chat");
            std::env::remove_var("WISP_WALLET_RPC");
        }
        let mut config = Config::default();
        config.apply_env();
        unsafe {
            std::env::remove_var("WISP_ENDPOINT");
        }

        assert_eq!(config.endpoint, "http://10.0.0.2:9000/chat");
        assert!(config.wallet_rpc_url.is_none());
    }

    #[test]
    fn test_endpoint_host() {
        let config = Config {
            endpoint: "https://chat.example.com/api/chat".to_string(),
            ..Config::default()
        };
        assert_eq!(config.endpoint_host(), "chat.example.com");
    }
}
