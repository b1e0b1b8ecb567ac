//! Configuration for the feed pipeline.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - `FEED_`-prefixed environment variables
//! - The flat environment variables the feed has always been deployed with
//!
//! # Environment Variables
//!
//! Prefixed variables use double underscores to separate nested levels:
//! - `FEED_WATCH__DEBOUNCE_MS=2000` sets `watch.debounce_ms`
//! - `FEED_STORE__BACKEND=local` sets `store.backend`
//!
//! Flat variables are mapped onto their nested keys (see [`LEGACY_ENV`]):
//! - `RESULTS_FILENAME_STRING=local_result` sets `feed.result_match`
//! - `FTP_SERVER=ftp.example.com` sets `sync.server`
//!
//! Flat variables are always taken as literal strings, so `FTP_PASSWORD=0042`
//! keeps its leading zeros. Prefixed variables go through figment's value
//! parsing; credential and name fields still accept the numbers that produces.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::feed::Grammar;
use crate::publish::StoreBackend;

/// Default config file, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "election-feed.toml";

/// Flat environment variables and the nested key each one sets.
pub const LEGACY_ENV: &[(&str, &str)] = &[
    ("RESULTS_FILENAME", "publish.results_filename"),
    ("SOP_FILENAME", "publish.sop_filename"),
    ("REFERENDUM_FILENAME", "publish.referendum_filename"),
    ("RESULTS_DIRECTORY", "publish.base_dir"),
    ("ELECTION_TYPE", "feed.kind"),
    ("RESULTS_FILENAME_STRING", "feed.result_match"),
    ("LOCAL_RESULTS_DIRECTORY", "feed.results_dir"),
    ("FTP_USERNAME", "sync.username"),
    ("FTP_PASSWORD", "sync.password"),
    ("FTP_SERVER", "sync.server"),
    ("STORE_ENDPOINT", "store.endpoint"),
    ("AWS_BUCKET", "store.bucket"),
    ("STORE_TOKEN", "store.bearer_token"),
];

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// What the result files contain and where they land
    #[serde(default)]
    pub feed: FeedConfig,

    /// Remote object naming
    #[serde(default)]
    pub publish: PublishConfig,

    /// Object-store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Remote mirror job
    #[serde(default)]
    pub sync: SyncConfig,

    /// Directory watching
    #[serde(default)]
    pub watch: WatchConfig,

    /// Live notification endpoint
    #[serde(default)]
    pub live: LiveConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    /// Grammar used for result files: "local" or "referendum"
    #[serde(default)]
    pub kind: Grammar,

    /// Case-insensitive substring identifying result files
    #[serde(default = "default_result_match", deserialize_with = "lenient::string")]
    pub result_match: String,

    /// Local mirror directory that is watched
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PublishConfig {
    /// Prefix for every object key
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Object name for the merged JSON results
    #[serde(default = "default_results_filename")]
    pub results_filename: String,

    /// Object name for the latest state-of-parties XML
    #[serde(default = "default_sop_filename")]
    pub sop_filename: String,

    /// Object name for the latest referendum running totals XML
    #[serde(default = "default_referendum_filename")]
    pub referendum_filename: String,

    /// Request a public-read ACL on uploads
    #[serde(default = "default_true")]
    pub public_read: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the S3-compatible endpoint
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub bucket: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub bearer_token: Option<String>,

    /// Root directory for the local backend
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// FTP host; syncing is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub username: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub password: Option<String>,

    /// Remote directory to mirror
    #[serde(default = "default_remote_dir", deserialize_with = "lenient::string")]
    pub remote_dir: String,

    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Mirror program to invoke
    #[serde(default = "default_sync_program")]
    pub program: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Quiet period after the last event for a file before it is read
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How often settled files are checked for
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Buffer between the notify thread and the watcher loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LiveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_live_bind")]
    pub bind: String,

    /// Events buffered per slow subscriber
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `election_feed::watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_result_match() -> String {
    "local_result".to_string()
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("data/results")
}
fn default_base_dir() -> String {
    "/2014/ReferendumResults/".to_string()
}
fn default_results_filename() -> String {
    "results.json".to_string()
}
fn default_sop_filename() -> String {
    "SOP.xml".to_string()
}
fn default_referendum_filename() -> String {
    "referendum_running_totals.xml".to_string()
}
fn default_store_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}
fn default_local_root() -> PathBuf {
    PathBuf::from("data/published")
}
fn default_remote_dir() -> String {
    "results".to_string()
}
fn default_sync_interval() -> u64 {
    60
}
fn default_sync_program() -> String {
    "lftp".to_string()
}
fn default_debounce_ms() -> u64 {
    5000
}
fn default_tick_ms() -> u64 {
    100
}
fn default_channel_capacity() -> usize {
    100
}
fn default_live_bind() -> String {
    "0.0.0.0:9321".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: Grammar::default(),
            result_match: default_result_match(),
            results_dir: default_results_dir(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            results_filename: default_results_filename(),
            sop_filename: default_sop_filename(),
            referendum_filename: default_referendum_filename(),
            public_read: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            endpoint: default_store_endpoint(),
            bucket: String::new(),
            bearer_token: None,
            local_root: default_local_root(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            password: None,
            remote_dir: default_remote_dir(),
            interval_secs: default_sync_interval(),
            program: default_sync_program(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_live_bind(),
            capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    /// Syncing runs only when a server is configured.
    pub fn is_enabled(&self) -> bool {
        self.server
            .as_deref()
            .is_some_and(|server| !server.trim().is_empty())
    }
}

impl Settings {
    /// Load configuration from the default file plus environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file plus environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        let figment = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // FEED_ prefix, double underscore becomes dot
            .merge(Env::prefixed("FEED_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }));

        // Flat deployment variables win over everything else
        legacy_env_values()
            .into_iter()
            .fold(figment, |figment, (key, value)| {
                figment.merge(Serialized::default(key, value))
            })
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.sync.password.is_some() {
            copy.sync.password = Some("********".to_string());
        }
        if copy.store.bearer_token.is_some() {
            copy.store.bearer_token = Some("********".to_string());
        }
        copy
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file.
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = path.as_ref().to_path_buf();

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

/// Set flat variables as `(nested key, raw value)` pairs.
fn legacy_env_values() -> Vec<(&'static str, String)> {
    LEGACY_ENV
        .iter()
        .filter_map(|(var, key)| std::env::var(var).ok().map(|value| (*key, value)))
        .collect()
}

/// String fields that also accept the scalars figment parses env values into.
mod lenient {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    impl From<Scalar> for String {
        fn from(scalar: Scalar) -> Self {
            match scalar {
                Scalar::Text(text) => text,
                Scalar::Unsigned(n) => n.to_string(),
                Scalar::Signed(n) => n.to_string(),
                Scalar::Float(n) => n.to_string(),
                Scalar::Bool(b) => b.to_string(),
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Scalar::deserialize(deserializer).map(String::from)
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Option::<Scalar>::deserialize(deserializer).map(|value| value.map(String::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.feed.kind, Grammar::Local);
        assert_eq!(settings.feed.result_match, "local_result");
        assert_eq!(settings.publish.results_filename, "results.json");
        assert_eq!(settings.publish.sop_filename, "SOP.xml");
        assert_eq!(settings.watch.debounce_ms, 5000);
        assert_eq!(settings.sync.interval_secs, 60);
        assert!(!settings.sync.is_enabled());
        assert!(settings.publish.public_read);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[feed]
kind = "referendum"
result_match = "ref_result"

[store]
backend = "local"
local_root = "/tmp/out"

[sync]
server = "ftp.example.com"
interval_secs = 30

[logging.modules]
"election_feed::watcher" = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.feed.kind, Grammar::Referendum);
        assert_eq!(settings.feed.result_match, "ref_result");
        assert_eq!(settings.store.backend, StoreBackend::Local);
        assert_eq!(settings.store.local_root, PathBuf::from("/tmp/out"));
        assert!(settings.sync.is_enabled());
        assert_eq!(settings.sync.interval_secs, 30);
        assert_eq!(settings.logging.modules["election_feed::watcher"], "debug");
        // Untouched sections keep defaults
        assert_eq!(settings.publish.referendum_filename, "referendum_running_totals.xml");
        assert_eq!(settings.watch.tick_ms, 100);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 1234;
        settings.publish.base_dir = "/2024/".to_string();

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 1234);
        assert_eq!(loaded.publish.base_dir, "/2024/");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILE);

        Settings::init_config_file(&config_path, false).unwrap();
        assert!(Settings::init_config_file(&config_path, false).is_err());
        assert!(Settings::init_config_file(&config_path, true).is_ok());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut settings = Settings::default();
        settings.sync.password = Some("hunter2".to_string());
        settings.store.bearer_token = Some("token".to_string());

        let shown = toml::to_string_pretty(&settings.redacted()).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("token\""));
        assert!(shown.contains("********"));
    }

    #[test]
    fn test_numeric_values_load_into_string_fields() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(
            &config_path,
            r#"
[store]
bucket = 2014
bearer_token = 98765

[sync]
server = "ftp.example.com"
username = 42
password = 123456
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.store.bucket, "2014");
        assert_eq!(settings.store.bearer_token.as_deref(), Some("98765"));
        assert_eq!(settings.sync.username.as_deref(), Some("42"));
        assert_eq!(settings.sync.password.as_deref(), Some("123456"));
    }

    #[test]
    fn test_legacy_table_targets_known_keys() {
        let defaults = Figment::from(Serialized::defaults(Settings::default()));
        for (var, key) in LEGACY_ENV {
            let (section, _) = key.split_once('.').unwrap();
            assert!(
                defaults.find_value(section).is_ok(),
                "{var} maps into unknown section {section}"
            );
        }
    }
}
