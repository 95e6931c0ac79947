//! Source descriptors: where a package comes from.
//!
//! Serialized the way jsonnetfile entries spell them, one key per kind:
//!
//! ```json
//! { "git": { "remote": "https://github.com/grafana/jsonnet-libs.git", "subdir": "grafonnet" } }
//! { "http": { "url": "https://example.com/pkg-$VERSION.tar.gz" } }
//! { "gitlab": { "project": "group/project", "package": "mixin" } }
//! { "local": { "directory": "../shared" } }
//! ```

use crate::core::error::Cause;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// A git repository, optionally narrowed to one subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    pub remote: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subdir: String,
}

/// A single `.tar.gz` at a URL. `$VERSION` in the URL is replaced with the
/// requested version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSource {
    pub url: String,
    /// Install name override
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

/// A GitLab generic package registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabSource {
    /// Project path, e.g. `group/subgroup/project`
    pub project: String,
    pub package: String,
    /// Defaults to `gitlab.com`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Defaults to `package.tar.gz`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

/// A directory on the local filesystem, linked rather than copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSource {
    pub directory: String,
}

/// Exactly one kind of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Git(GitSource),
    Http(HttpSource),
    #[serde(rename = "gitlab")]
    GitlabRegistry(GitlabSource),
    Local(LocalSource),
}

impl Source {
    /// Parse and validate a JSON descriptor.
    pub fn from_json(text: &str) -> Result<Self, Cause> {
        let source: Source = serde_json::from_str(text)
            .map_err(|e| Cause::InvalidSource(e.to_string()))?;
        source.validate()?;
        Ok(source)
    }

    /// Check the fields an installer relies on.
    pub fn validate(&self) -> Result<(), Cause> {
        match self {
            Source::Git(git) => {
                require("git remote", &git.remote)?;
                if !git.subdir.is_empty() {
                    validate_subdir(&git.subdir)?;
                }
            }
            Source::Http(http) => require("http url", &http.url)?,
            Source::GitlabRegistry(gl) => {
                require("gitlab project", &gl.project)?;
                require("gitlab package", &gl.package)?;
            }
            Source::Local(local) => require("local directory", &local.directory)?,
        }
        Ok(())
    }

    /// The name a package from this source is installed under when the
    /// caller doesn't pick one.
    pub fn legacy_name(&self) -> String {
        match self {
            Source::Git(git) => {
                let repo = basename(git.remote.trim_end_matches('/'));
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                match Path::new(&git.subdir).file_name() {
                    Some(sub) => sub.to_string_lossy().into_owned(),
                    None => repo.to_string(),
                }
            }
            Source::Http(http) => {
                if !http.target.is_empty() {
                    return http.target.clone();
                }
                let file = basename(&http.url);
                if let Some(stem) = file.strip_suffix(".tar.gz") {
                    return stem.to_string();
                }
                match file.rfind('.') {
                    Some(dot) if dot > 0 => file[..dot].to_string(),
                    _ => file.to_string(),
                }
            }
            Source::GitlabRegistry(gl) => gl.package.clone(),
            Source::Local(local) => {
                let trimmed = local.directory.trim_end_matches('/');
                Path::new(trimmed)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| trimmed.to_string())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Git(_) => "git",
            Source::Http(_) => "http",
            Source::GitlabRegistry(_) => "gitlab",
            Source::Local(_) => "local",
        }
    }
}

fn basename(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

fn require(what: &str, value: &str) -> Result<(), Cause> {
    if value.trim().is_empty() {
        Err(Cause::InvalidSource(format!("{} is empty", what)))
    } else {
        Ok(())
    }
}

fn validate_subdir(subdir: &str) -> Result<(), Cause> {
    let ok = Path::new(subdir)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(())
    } else {
        Err(Cause::InvalidSource(format!(
            "subdir must be a relative path inside the repository: {}",
            subdir
        )))
    }
}
