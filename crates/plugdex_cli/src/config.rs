//! Configuration file support for plugdex.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `PLUGDEX_`, e.g., `PLUGDEX_GITHUB_TOKEN`)
//! 3. Config file (./plugdex.toml, then ~/.config/plugdex/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use PLUGDEX_GITHUB_TOKEN / GITHUB_TOKEN
//!
//! [index]
//! dir = "index"
//!
//! [sync]
//! staleness_days = 3
//! max_batch_size = 200
//! blacklist_threshold = 2
//! min_call_interval_ms = 1000
//! quota_reserve = 50
//!
//! [verify]
//! package_extension = ".eagleplugin"
//! automation_identity = "github-actions[bot]"
//! manifest_path = "manifest.json"
//! locale_path = "_locales/en.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use plugdex::sync::{
    DEFAULT_BLACKLIST_THRESHOLD, DEFAULT_MAX_BATCH_SIZE, DEFAULT_QUOTA_RESERVE,
    DEFAULT_STALENESS_DAYS, SyncConfig as EngineConfig,
};
use plugdex::verify::VerifyRules;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Catalog location.
    pub index: IndexConfig,
    /// Sync run defaults.
    pub sync: SyncConfig,
    /// Admission rules.
    pub verify: VerifyConfig,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via PLUGDEX_GITHUB_TOKEN or GITHUB_TOKEN.
    pub token: Option<String>,
    /// API base URL, for GitHub Enterprise or testing.
    pub api_url: Option<String>,
}

/// Catalog location.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding alldex.json, the tier files and blacklist.json.
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("index"),
        }
    }
}

/// Sync run defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Entries changed within this many days are skipped.
    pub staleness_days: i64,
    /// Maximum entries verified per run.
    pub max_batch_size: usize,
    /// Failures after which a repository is blacklisted.
    pub blacklist_threshold: u32,
    /// Minimum spacing between remote calls.
    pub min_call_interval_ms: u64,
    /// Remote calls held back when sizing a batch.
    pub quota_reserve: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_days: DEFAULT_STALENESS_DAYS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            blacklist_threshold: DEFAULT_BLACKLIST_THRESHOLD,
            min_call_interval_ms: 1000,
            quota_reserve: DEFAULT_QUOTA_RESERVE,
        }
    }
}

/// Admission rule overrides. Unset fields keep the library defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub package_extension: Option<String>,
    pub automation_identity: Option<String>,
    pub manifest_path: Option<String>,
    pub locale_path: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/plugdex/config.toml)
    /// 3. Local config file (./plugdex.toml)
    /// 4. Environment variables with PLUGDEX_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("plugdex.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./plugdex.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // Add PLUGDEX_ prefixed environment variables
        // e.g., PLUGDEX_GITHUB_TOKEN -> github.token, PLUGDEX_INDEX_DIR -> index.dir
        builder = builder.add_source(
            Environment::with_prefix("PLUGDEX")
                .separator("_")
                .try_parsing(true),
        );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };

        if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }
        config
    }

    /// Path of the per-user config file.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "plugdex").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Engine settings from the `[sync]` section.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            staleness: chrono::Duration::days(self.sync.staleness_days.max(0)),
            max_batch_size: self.sync.max_batch_size,
            blacklist_threshold: self.sync.blacklist_threshold.max(1),
            quota_reserve: self.sync.quota_reserve,
            min_call_interval: Duration::from_millis(self.sync.min_call_interval_ms),
        }
    }

    /// Admission rules with `[verify]` overrides applied.
    pub fn verify_rules(&self) -> VerifyRules {
        let mut rules = VerifyRules::default();
        let v = &self.verify;
        if let Some(ext) = &v.package_extension {
            rules.package_extension.clone_from(ext);
        }
        if let Some(identity) = &v.automation_identity {
            rules.automation_identity.clone_from(identity);
        }
        if let Some(path) = &v.manifest_path {
            rules.manifest_path.clone_from(path);
        }
        if let Some(path) = &v.locale_path {
            rules.locale_path.clone_from(path);
        }
        rules
    }
}
