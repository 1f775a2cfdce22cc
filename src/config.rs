//! Run configuration.
//!
//! Settings come from an optional TOML file and are then overridden field by
//! field from the command line:
//!
//! ```toml
//! dry_run = false
//!
//! [instance]
//! id = "acme"
//! api_key = "..."
//! timeout_secs = 60
//! # endpoint = "https://eurapi.hornbill.com/acme/"   # skip zone lookup
//!
//! [input]
//! documents = "csv/documents.csv"
//! shares = "csv/shares.csv"
//! collections = "csv/collections.csv"
//! tags = "csv/tags.csv"
//!
//! [log]
//! dir = "log"
//! debug = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub instance: InstanceConfig,
    pub input: InputConfig,
    pub log: LogConfig,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub id: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl InstanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub documents: PathBuf,
    pub shares: Option<PathBuf>,
    pub collections: Option<PathBuf>,
    pub tags: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub debug: bool,
}

// ============ File layer ============

/// Configuration as it appears in the TOML file. Everything is optional so
/// that any value can come from the command line instead.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub instance: FileInstance,
    #[serde(default)]
    pub input: FileInput,
    #[serde(default)]
    pub log: FileLog,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileInstance {
    pub id: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileInput {
    pub documents: Option<PathBuf>,
    pub shares: Option<PathBuf>,
    pub collections: Option<PathBuf>,
    pub tags: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileLog {
    pub dir: Option<PathBuf>,
    pub debug: Option<bool>,
}

/// Values supplied on the command line. `None`/`false` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub instance_id: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub documents: Option<PathBuf>,
    pub shares: Option<PathBuf>,
    pub collections: Option<PathBuf>,
    pub tags: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub debug: bool,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log")
}

/// Read the TOML file at `path`.
///
/// When `required` is false a missing file yields an empty configuration;
/// a file that exists but does not parse is always an error.
pub fn load_file(path: &Path, required: bool) -> Result<FileConfig> {
    if !required && !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Error raised when mandatory options are absent. Lists every missing
/// option so the operator can fix them in one go.
#[derive(Debug)]
pub struct MissingOptions(pub Vec<&'static str>);

impl std::fmt::Display for MissingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mandatory argument not provided: {}", self.0.join(", "))
    }
}

impl std::error::Error for MissingOptions {}

/// Merge file values and command-line overrides, then validate.
pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Config> {
    let instance = InstanceConfig {
        id: cli.instance_id.or(file.instance.id).unwrap_or_default(),
        api_key: cli.api_key.or(file.instance.api_key).unwrap_or_default(),
        endpoint: cli
            .endpoint
            .or(file.instance.endpoint)
            .filter(|e| !e.is_empty()),
        timeout_secs: cli
            .timeout_secs
            .or(file.instance.timeout_secs)
            .unwrap_or_else(default_timeout_secs),
    };

    let documents = cli.documents.or(file.input.documents);

    let mut missing = Vec::new();
    if instance.id.is_empty() && instance.endpoint.is_none() {
        missing.push("--instance-id");
    }
    if instance.api_key.is_empty() {
        missing.push("--api-key");
    }
    if documents.is_none() {
        missing.push("--csvd");
    }
    if !missing.is_empty() {
        return Err(MissingOptions(missing).into());
    }

    if instance.timeout_secs == 0 {
        anyhow::bail!("instance.timeout_secs must be > 0");
    }

    let input = InputConfig {
        documents: documents.unwrap_or_default(),
        shares: cli.shares.or(file.input.shares),
        collections: cli.collections.or(file.input.collections),
        tags: cli.tags.or(file.input.tags),
    };

    let log = LogConfig {
        dir: cli
            .log_dir
            .or(file.log.dir)
            .unwrap_or_else(default_log_dir),
        debug: cli.debug || file.log.debug.unwrap_or(false),
    };

    Ok(Config {
        instance,
        input,
        log,
        dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
    })
}

impl Config {
    /// Human-readable settings for the start-up banner. The API key is not
    /// included.
    pub fn describe(&self) -> Vec<String> {
        let opt = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        vec![
            format!(" dry run      {}", self.dry_run),
            format!(" instance     {}", self.instance.id),
            format!(
                " endpoint     {}",
                self.instance.endpoint.as_deref().unwrap_or("(zone lookup)")
            ),
            format!(" documents    {}", self.input.documents.display()),
            format!(" shares       {}", opt(&self.input.shares)),
            format!(" collections  {}", opt(&self.input.collections)),
            format!(" tags         {}", opt(&self.input.tags)),
            format!(" timeout      {}s", self.instance.timeout_secs),
            format!(" debug        {}", self.log.debug),
        ]
    }
}
