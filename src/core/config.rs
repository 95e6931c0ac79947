//! Install options and the optional `config.toml` they are loaded from.
//!
//! Precedence: built-in defaults < config file < environment variables.
//! CLI flags are applied on top by the binary.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP connect/read timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Remotes that offer `{remote}/archive/{commit}.tar.gz` downloads
pub const DEFAULT_ARCHIVE_REMOTE_PATTERN: &str = r"^(https|ssh)://github\.com/.+$";

const DEFAULT_USER_AGENT: &str = concat!("jsonnet-fetch/", env!("CARGO_PKG_VERSION"));

/// Per-call configuration threaded through every installer.
///
/// Nothing here is process-global: two installs with different options can
/// run side by side.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Suppress progress output and subprocess chatter
    pub quiet: bool,
    /// Connect and per-read timeout for HTTP requests
    pub http_timeout: Duration,
    /// The git executable to invoke
    pub git_program: PathBuf,
    /// Git remotes matching this pattern try the archive fast path first
    pub archive_remote_pattern: Regex,
    /// User-Agent header sent with downloads
    pub user_agent: String,
    /// Directory that relative local sources are resolved against
    pub local_base: PathBuf,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            git_program: PathBuf::from("git"),
            archive_remote_pattern: default_archive_pattern(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            local_base: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

fn default_archive_pattern() -> Regex {
    Regex::new(DEFAULT_ARCHIVE_REMOTE_PATTERN).expect("default archive pattern is valid")
}

impl InstallOptions {
    /// Set quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set the HTTP timeout.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the git executable.
    pub fn git_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.git_program = program.into();
        self
    }

    /// Set which remotes use the archive fast path.
    pub fn archive_remote_pattern(mut self, pattern: Regex) -> Self {
        self.archive_remote_pattern = pattern;
        self
    }

    /// Set the base directory for local sources.
    pub fn local_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_base = dir.into();
        self
    }
}

/// On-disk representation. Every field is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    quiet: Option<bool>,
    http_timeout_secs: Option<u64>,
    git: Option<PathBuf>,
    archive_remote_pattern: Option<String>,
    user_agent: Option<String>,
}

/// Loader for [`InstallOptions`].
pub struct Config;

impl Config {
    /// `$XDG_CONFIG_HOME/jfetch/config.toml` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("jfetch").join("config.toml"))
    }

    /// Load options from `path` (if it exists) and the environment.
    pub fn load(path: Option<&Path>) -> Result<InstallOptions> {
        let file = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                Self::parse(&text)
                    .with_context(|| format!("invalid config {}", p.display()))?
            }
            _ => ConfigToml::default(),
        };
        let mut options = Self::apply(InstallOptions::default(), file)?;
        Self::apply_env(&mut options, |key| std::env::var(key).ok());
        Ok(options)
    }

    fn parse(text: &str) -> Result<ConfigToml> {
        Ok(toml::from_str(text)?)
    }

    fn apply(mut options: InstallOptions, file: ConfigToml) -> Result<InstallOptions> {
        if let Some(quiet) = file.quiet {
            options.quiet = quiet;
        }
        if let Some(secs) = file.http_timeout_secs {
            options.http_timeout = clamp_timeout(secs);
        }
        if let Some(git) = file.git {
            options.git_program = git;
        }
        if let Some(pattern) = file.archive_remote_pattern {
            options.archive_remote_pattern = Regex::new(&pattern)
                .with_context(|| format!("invalid archive_remote_pattern '{}'", pattern))?;
        }
        if let Some(agent) = file.user_agent {
            options.user_agent = agent;
        }
        Ok(options)
    }

    fn apply_env(options: &mut InstallOptions, var: impl Fn(&str) -> Option<String>) {
        if let Some(quiet) = var("JFETCH_QUIET") {
            options.quiet = matches!(quiet.as_str(), "1" | "true" | "yes");
        }
        if let Some(secs) = var("JFETCH_HTTP_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            options.http_timeout = clamp_timeout(secs);
        }
        if let Some(git) = var("JFETCH_GIT").filter(|s| !s.is_empty()) {
            options.git_program = PathBuf::from(git);
        }
    }
}

// Clamp to reasonable range (5-300 seconds)
fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(5, 300))
}
