//! Application configuration for linkmap.
//!
//! Settings come from an optional `linkmap.toml`; CLI flags override file
//! values, which override defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "linkmap.toml";

// ---------------------------------------------------------------------------
// Config structs (matching linkmap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// `[crawl]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Locations the crawl starts from.
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Maximum number of distinct locations fetched.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Concurrent fetch workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Substrings that keep a location from being crawled.
    #[serde(default = "CrawlSettings::default_block_list")]
    pub block_list: Vec<String>,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long workers get to wind down after a cancelled crawl.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            limit: default_limit(),
            workers: default_workers(),
            block_list: Self::default_block_list(),
            timeout_secs: default_timeout_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl CrawlSettings {
    /// Mostly sites whose link fan-out swamps the diagram; the last few are
    /// kept out of crawls so their visitor metrics stay clean.
    pub fn default_block_list() -> Vec<String> {
        [
            "aseprite.org",
            "github.com",
            "hollowknight.com",
            "linkedin.com",
            "mercadolibre.com.ar",
            "uptimerobot.com",
            "wikipedia.org",
            "youtube.com",
            "https://www.arkamitra.com",
            "https://dimitris.dev",
            "riskledger.com",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Check ranges that would otherwise only fail once crawling starts.
    pub fn validate(&self) -> Result<()> {
        if self.limit < 1 {
            return Err(CoreError::config("crawl limit must be at least 1"));
        }
        if self.workers < 1 {
            return Err(CoreError::config("worker count must be at least 1"));
        }
        if self.block_list.iter().any(|entry| entry.trim().is_empty()) {
            return Err(CoreError::config(
                "block list entries must not be empty (an empty entry blocks every location)",
            ));
        }
        Ok(())
    }
}

fn default_limit() -> usize {
    20
}
fn default_workers() -> usize {
    linkmap_scanner::crawler::DEFAULT_WORKERS
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_shutdown_grace_ms() -> u64 {
    5_000
}

/// How the discovered graph is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mermaid,
    Json,
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mermaid" | "mmd" => Ok(OutputFormat::Mermaid),
            "json" => Ok(OutputFormat::Json),
            other => Err(CoreError::config(format!("unknown output format: {other}"))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Where the graph is written.
    #[serde(default = "default_output_path")]
    pub path: String,

    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output_path() -> String {
    "flowchart.mermaid".into()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load `path` if given, else `linkmap.toml` from the working directory if
/// present, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from(path);
    }

    let path = PathBuf::from(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CoreError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.crawl.validate()?;
    Ok(config)
}

/// Write a default config file to `path`, refusing to overwrite unless
/// `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<PathBuf> {
    if path.exists() && !force {
        return Err(CoreError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CoreError::Serialize(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| CoreError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}
