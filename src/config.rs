use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::github::DEFAULT_API_URL;
use crate::paths::{DEFAULT_TEMPLATES_DIR, config_path};

/// Account whose repositories are processed when nothing else is configured.
pub const DEFAULT_USER: &str = "kaatinga";

/// Remaining API calls below which listing stops.
pub const DEFAULT_MIN_QUOTA: u32 = 300;

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// What to do when the remaining API quota drops below the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPolicy {
    /// Stop listing further pages and report it in the summary.
    #[default]
    Stop,
    /// Abort the run with an error.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGuard {
    pub floor: u32,
    pub policy: QuotaPolicy,
}

impl Default for QuotaGuard {
    fn default() -> Self {
        Self {
            floor: DEFAULT_MIN_QUOTA,
            policy: QuotaPolicy::Stop,
        }
    }
}

/// Optional `config.toml`.
///
/// Example TOML:
/// ```toml
/// user = "kaatinga"
/// templates = "templates"
/// merge = false
/// min_quota = 300
/// quota_policy = "stop"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub user: Option<String>,
    pub templates: Option<PathBuf>,
    pub merge: Option<bool>,
    pub min_quota: Option<u32>,
    pub quota_policy: Option<QuotaPolicy>,
    pub api_url: Option<String>,
}

/// Flags shared by every subcommand; each one overrides `config.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Path to config.toml (default: $XDG_CONFIG_HOME/robot/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// GitHub account whose repositories are processed
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// Directory holding the canonical workflow files
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,
    /// Stop (or fail) once fewer API calls than this remain
    #[arg(long, global = true)]
    pub min_quota: Option<u32>,
    /// Behaviour when the quota floor is reached
    #[arg(long, value_enum, global = true)]
    pub quota_policy: Option<QuotaPolicy>,
    /// Base URL of the GitHub REST API
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub user: String,
    pub templates: PathBuf,
    pub merge: bool,
    pub quota: QuotaGuard,
    pub api_url: String,
    pub token: String,
}

/// Load `config.toml` from `path`, or from the default location.
///
/// A missing file yields the defaults; an unreadable or malformed one is an
/// error naming the path.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let txt = match fs::read_to_string(&path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("cannot read config: {}", path.display()));
        }
    };
    toml::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

/// Read the access token from the environment.
pub fn github_token() -> Result<String> {
    match env::var(TOKEN_ENV) {
        Ok(tok) if !tok.trim().is_empty() => Ok(tok.trim().to_string()),
        Ok(_) => bail!("{} is empty", TOKEN_ENV),
        Err(_) => bail!("{} is not set", TOKEN_ENV),
    }
}

/// Merge defaults, `config.toml` and CLI flags (in increasing priority).
pub fn resolve(file: FileConfig, cli: &Overrides, merge_flag: bool, token: String) -> Settings {
    Settings {
        user: cli
            .user
            .clone()
            .or(file.user)
            .unwrap_or_else(|| DEFAULT_USER.to_string()),
        templates: cli
            .templates
            .clone()
            .or(file.templates)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR)),
        merge: merge_flag || file.merge.unwrap_or(false),
        quota: QuotaGuard {
            floor: cli
                .min_quota
                .or(file.min_quota)
                .unwrap_or(DEFAULT_MIN_QUOTA),
            policy: cli.quota_policy.or(file.quota_policy).unwrap_or_default(),
        },
        api_url: cli
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        token,
    }
}

/// Load settings for a run: config file, flags, then the token.
pub fn load(cli: &Overrides, merge_flag: bool) -> Result<Settings> {
    let file = load_file_config(cli.config.as_deref())?;
    let token = github_token().context("failed to load settings")?;
    Ok(resolve(file, cli, merge_flag, token))
}
