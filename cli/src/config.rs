use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "LARDER_API_URL";

pub struct Config {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub remote: RemoteConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    remote: RemoteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    5
}

impl Config {
    /// Resolve paths under the platform data and config directories.
    ///
    /// The base URL comes from `--api-url`, then `LARDER_API_URL`, then
    /// `config.toml`, then the built-in default.
    pub fn load(api_url: Option<String>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = proj_dirs.config_dir().join("config.toml");
        Self::resolve(
            data_dir.join("larder.db"),
            config_path,
            api_url,
            |key| std::env::var(key).ok(),
        )
    }

    fn resolve(
        db_path: PathBuf,
        config_path: PathBuf,
        api_url: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut remote = read_file_config(&config_path)?.remote;
        let base_url = api_url
            .or_else(|| env(API_URL_ENV))
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if let Some(url) = base_url {
            remote.base_url = url;
        }
        remote.base_url = remote.base_url.trim_end_matches('/').to_string();
        Ok(Config {
            db_path,
            config_path,
            remote,
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}
