//! Application configuration for postsync.
//!
//! User config lives at `~/.postsync/postsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PostsyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "postsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".postsync";

// ---------------------------------------------------------------------------
// Config structs (matching postsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-target store layout and HTTP defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Fleet sweep settings.
    #[serde(default)]
    pub fleet: FleetSection,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding markdown post files, relative to the owner dir.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    /// Directory holding JSON metadata files, relative to the owner dir.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// Owner configuration file name.
    #[serde(default = "default_owner_file")]
    pub owner_file: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            metadata_dir: default_metadata_dir(),
            owner_file: default_owner_file(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_posts_dir() -> String {
    "posts".into()
}
fn default_metadata_dir() -> String {
    "metadata".into()
}
fn default_owner_file() -> String {
    "owner.json".into()
}
fn default_http_timeout() -> u64 {
    30
}

/// `[fleet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSection {
    /// Seconds to wait between target invocations.
    #[serde(default = "default_delay")]
    pub delay_secs: u64,

    /// Retry round budget for a sweep (round 1 included).
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Ingestion entry point file name a valid target must carry.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Program used to run the entry point.
    #[serde(default = "default_runner")]
    pub runner: String,

    /// Failure manifest file name, written beside the targets directory.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for FleetSection {
    fn default() -> Self {
        Self {
            delay_secs: default_delay(),
            rounds: default_rounds(),
            entry_point: default_entry_point(),
            runner: default_runner(),
            manifest: default_manifest(),
        }
    }
}

fn default_delay() -> u64 {
    3
}
fn default_rounds() -> u32 {
    2
}
fn default_entry_point() -> String {
    "sync.sh".into()
}
fn default_runner() -> String {
    "sh".into()
}
fn default_manifest() -> String {
    "failed-syncs.txt".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for a single owner's ingestion run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// The owner's repository directory (holds the owner file and store dirs).
    pub owner_dir: PathBuf,
    /// Markdown posts directory name.
    pub posts_dir: String,
    /// JSON metadata directory name.
    pub metadata_dir: String,
    /// Owner configuration file name.
    pub owner_file: String,
    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Whether the archive supplement pass runs after the feeds.
    pub supplement: bool,
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            owner_dir: PathBuf::from("."),
            posts_dir: config.defaults.posts_dir.clone(),
            metadata_dir: config.defaults.metadata_dir.clone(),
            owner_file: config.defaults.owner_file.clone(),
            http_timeout_secs: config.defaults.http_timeout_secs,
            supplement: true,
        }
    }
}

/// Runtime configuration for a fleet sweep.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Directory containing one subdirectory per target.
    pub targets_dir: PathBuf,
    /// Seconds between target invocations (floor 0).
    pub delay_secs: u64,
    /// Total round budget (floor 1).
    pub rounds: u32,
    /// Entry point file name required for a valid target.
    pub entry_point: String,
    /// Program used to run the entry point.
    pub runner: String,
    /// Owner configuration file name required for a valid target.
    pub owner_file: String,
    /// Path of the failure manifest.
    pub manifest_path: PathBuf,
}

impl From<&AppConfig> for FleetConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            targets_dir: PathBuf::from("."),
            delay_secs: config.fleet.delay_secs,
            rounds: config.fleet.rounds.max(1),
            entry_point: config.fleet.entry_point.clone(),
            runner: config.fleet.runner.clone(),
            owner_file: config.defaults.owner_file.clone(),
            manifest_path: PathBuf::from(&config.fleet.manifest),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.postsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PostsyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.postsync/postsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PostsyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PostsyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PostsyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PostsyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PostsyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("posts_dir"));
        assert!(toml_str.contains("failed-syncs.txt"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fleet.delay_secs, 3);
        assert_eq!(parsed.fleet.rounds, 2);
        assert_eq!(parsed.defaults.owner_file, "owner.json");
    }

    #[test]
    fn partial_config_uses_field_defaults() {
        let toml_str = r#"
[fleet]
delay_secs = 0
rounds = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fleet.delay_secs, 0);
        assert_eq!(config.fleet.rounds, 5);
        assert_eq!(config.fleet.entry_point, "sync.sh");
        assert_eq!(config.defaults.posts_dir, "posts");
    }

    #[test]
    fn sync_config_from_app_config() {
        let app = AppConfig::default();
        let sync = SyncConfig::from(&app);
        assert_eq!(sync.posts_dir, "posts");
        assert_eq!(sync.metadata_dir, "metadata");
        assert_eq!(sync.http_timeout_secs, 30);
        assert!(sync.supplement);
    }

    #[test]
    fn fleet_config_rounds_floor() {
        let mut app = AppConfig::default();
        app.fleet.rounds = 0;
        let fleet = FleetConfig::from(&app);
        assert_eq!(fleet.rounds, 1);
    }
}
