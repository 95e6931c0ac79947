//! Installers - getting packages onto disk
//!
//! Every source kind implements [`Installer`]. [`installer_for`] picks the
//! implementation from a [`Source`].
//!
//! ## Installers
//!
//! - **git**: archive fast path for known hosts, falling back to a shallow
//!   (then full) fetch with optional sparse checkout
//! - **http**: a single `.tar.gz` from a URL template
//! - **gitlab**: GitLab generic package registry
//! - **local**: symlink to a directory on disk

pub mod download;
pub mod git;
pub mod gitlab;
pub mod http;
pub mod local;

use crate::core::context::InstallContext;
use crate::core::error::{InstallError, Phase, PhaseExt};
use crate::source::Source;
use std::path::Path;

pub use git::GitInstaller;
pub use gitlab::GitlabInstaller;
pub use http::HttpInstaller;
pub use local::LocalInstaller;

/// Fetches one package into `{dir}/{name}`.
///
/// `dir` must be a writable directory. `name` may contain `/` for nested
/// namespaces; intermediate directories are created. Anything already at
/// `{dir}/{name}` is replaced. Returns the resolved version, e.g. the commit
/// a git tag pointed to.
pub trait Installer: Send + Sync {
    fn install(
        &self,
        ctx: &InstallContext,
        name: &str,
        dir: &Path,
        version: &str,
    ) -> Result<String, InstallError>;
}

/// Choose the installer for a source.
pub fn installer_for(source: &Source) -> Box<dyn Installer> {
    match source {
        Source::Git(git) => Box::new(GitInstaller::new(git.clone())),
        Source::Http(http) => Box::new(HttpInstaller::new(http.clone())),
        Source::GitlabRegistry(gl) => Box::new(GitlabInstaller::new(gl.clone())),
        Source::Local(local) => Box::new(LocalInstaller::new(local.clone())),
    }
}

/// Validate `source`, then install it.
pub fn install(
    ctx: &InstallContext,
    source: &Source,
    name: &str,
    dir: &Path,
    version: &str,
) -> Result<String, InstallError> {
    source.validate().phase(Phase::Source)?;
    let output = ctx.output();
    output.action(&format!("Installing {} ({})", name, source.kind()));
    let resolved = installer_for(source).install(ctx, name, dir, version)?;
    output.success(&format!("{} installed", name));
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InstallOptions;
    use crate::source::GitSource;
    use tempfile::tempdir;

    #[test]
    fn test_install_rejects_invalid_source_before_dispatch() {
        let temp = tempdir().unwrap();
        let ctx = InstallContext::new(InstallOptions::default().quiet(true));
        let source = Source::Git(GitSource {
            remote: String::new(),
            subdir: String::new(),
        });

        let err = install(&ctx, &source, "pkg", temp.path(), "main").unwrap_err();

        assert_eq!(err.phase, Phase::Source);
        assert!(!temp.path().join(".tmp").exists());
    }
}
