//! Installer for plain HTTP `.tar.gz` sources.

use super::Installer;
use super::download::download_and_extract;
use crate::core::context::InstallContext;
use crate::core::error::{InstallError, Phase, PhaseExt};
use crate::internal::scratch::ScratchDir;
use crate::source::HttpSource;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

/// `${VERSION}`, or a `$NAME` reference with its whole name
fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{VERSION\}|\$[A-Za-z_][A-Za-z0-9_]*").expect("valid regex")
    })
}

pub struct HttpInstaller {
    source: HttpSource,
}

impl HttpInstaller {
    pub fn new(source: HttpSource) -> Self {
        Self { source }
    }

    /// The URL requested for `version`.
    pub fn url(&self, version: &str) -> String {
        expand_version(&self.source.url, version)
    }
}

/// Substitute `$VERSION` / `${VERSION}` in a URL template.
///
/// Only this one variable is expanded. `$VERSIONS` or `$VERSION_2` name
/// other variables and are left untouched, like any other `$` text. The
/// process environment is never read or modified.
pub fn expand_version(template: &str, version: &str) -> String {
    variable_pattern()
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "$VERSION" | "${VERSION}" => version.to_string(),
            other => other.to_string(),
        })
        .into_owned()
}

impl Installer for HttpInstaller {
    fn install(
        &self,
        ctx: &InstallContext,
        name: &str,
        dir: &Path,
        version: &str,
    ) -> Result<String, InstallError> {
        let dest = dir.join(name);
        let scratch = ScratchDir::create(dir, name, version).phase(Phase::Scratch)?;

        let url = self.url(version);
        download_and_extract(ctx, &scratch, &url, &dest)?;

        // HTTP sources have no independent notion of a resolved version
        Ok(version.to_string())
    }
}
