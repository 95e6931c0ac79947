//! Installer for the GitLab generic package registry.
//!
//! Packages live at
//! `https://{host}/api/v4/projects/{project}/packages/generic/{package}/{version}/{filename}`
//! where `{project}` is the URL-encoded project path (`group/project` becomes
//! `group%2Fproject`).

use super::Installer;
use super::download::download_and_extract;
use crate::core::context::InstallContext;
use crate::core::error::{InstallError, Phase, PhaseExt};
use crate::internal::scratch::ScratchDir;
use crate::source::GitlabSource;
use std::path::Path;

const DEFAULT_HOST: &str = "gitlab.com";
const DEFAULT_FILENAME: &str = "package.tar.gz";

pub struct GitlabInstaller {
    source: GitlabSource,
}

impl GitlabInstaller {
    pub fn new(source: GitlabSource) -> Self {
        Self { source }
    }
}

/// Registry download URL for `version`.
pub fn build_url(src: &GitlabSource, version: &str) -> String {
    let host = if src.host.is_empty() { DEFAULT_HOST } else { &src.host };
    let filename = if src.filename.is_empty() {
        DEFAULT_FILENAME
    } else {
        &src.filename
    };

    // The project path is a single segment, so its slashes are encoded too
    format!(
        "https://{}/api/v4/projects/{}/packages/generic/{}/{}/{}",
        host,
        urlencoding::encode(&src.project),
        urlencoding::encode(&src.package),
        urlencoding::encode(version),
        urlencoding::encode(filename),
    )
}

impl Installer for GitlabInstaller {
    fn install(
        &self,
        ctx: &InstallContext,
        name: &str,
        dir: &Path,
        version: &str,
    ) -> Result<String, InstallError> {
        let dest = dir.join(name);
        let scratch = ScratchDir::create(dir, name, version).phase(Phase::Scratch)?;

        let url = build_url(&self.source, version);
        download_and_extract(ctx, &scratch, &url, &dest)?;

        Ok(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(project: &str, package: &str, host: &str, filename: &str) -> GitlabSource {
        GitlabSource {
            project: project.to_string(),
            package: package.to_string(),
            host: host.to_string(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn test_build_url_defaults() {
        assert_eq!(
            build_url(&source("a/b", "pkg", "", ""), "1.2.3"),
            "https://gitlab.com/api/v4/projects/a%2Fb/packages/generic/pkg/1.2.3/package.tar.gz"
        );
    }

    #[test]
    fn test_build_url_overrides() {
        assert_eq!(
            build_url(
                &source("group/sub/project", "mixin", "git.example.com", "mixin.tgz"),
                "0.1.0"
            ),
            "https://git.example.com/api/v4/projects/group%2Fsub%2Fproject/packages/generic/mixin/0.1.0/mixin.tgz"
        );
    }

    #[test]
    fn test_build_url_escapes_reserved_characters_once() {
        let url = build_url(&source("my group/p?x", "pkg", "", ""), "1.0.0+build");
        assert!(url.contains("/projects/my%20group%2Fp%3Fx/"));
        assert!(url.contains("/1.0.0%2Bbuild/"));
        assert!(!url.contains("%25"));
    }
}
