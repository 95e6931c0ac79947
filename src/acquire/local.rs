//! Installer for local directory sources.
//!
//! Nothing is copied: `{dir}/{name}` becomes a relative symlink to the
//! source directory, so edits show up immediately.

use super::Installer;
use crate::core::context::InstallContext;
use crate::core::error::{Cause, InstallError, Phase, PhaseExt};
use crate::internal::fs_utils;
use crate::source::LocalSource;
use std::path::{Path, PathBuf};

pub struct LocalInstaller {
    source: LocalSource,
}

impl LocalInstaller {
    pub fn new(source: LocalSource) -> Self {
        Self { source }
    }

    fn resolve(&self, base: &Path) -> PathBuf {
        let dir = Path::new(&self.source.directory);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, Cause> {
    std::path::absolute(path)
        .map(|p| fs_utils::normalize_lexical(&p))
        .map_err(|e| Cause::io(format!("cannot resolve {}", path.display()), e))
}

impl Installer for LocalInstaller {
    fn install(
        &self,
        ctx: &InstallContext,
        name: &str,
        dir: &Path,
        _version: &str,
    ) -> Result<String, InstallError> {
        let source_dir = absolute(&self.resolve(&ctx.options.local_base)).phase(Phase::Source)?;
        if !source_dir.is_dir() {
            return Err(InstallError::new(
                Phase::Source,
                Cause::InvalidSource(format!(
                    "local directory does not exist: {}",
                    source_dir.display()
                )),
            ));
        }

        let dest = absolute(&dir.join(name)).phase(Phase::Move)?;
        let link_parent = dest.parent().unwrap_or(dir);
        let target =
            pathdiff::diff_paths(&source_dir, link_parent).unwrap_or_else(|| source_dir.clone());

        fs_utils::ensure_parent_dir(&dest).phase(Phase::Move)?;
        fs_utils::remove_if_exists(&dest).phase(Phase::Move)?;
        symlink_dir(&target, &dest).phase(Phase::Move)?;

        ctx.output()
            .detail(&format!("linked {} -> {}", dest.display(), target.display()));

        // Local sources are unversioned
        Ok(String::new())
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> Result<(), Cause> {
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| Cause::io(format!("cannot create symlink {}", link.display()), e))
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> Result<(), Cause> {
    std::os::windows::fs::symlink_dir(target, link)
        .map_err(|e| Cause::io(format!("cannot create symlink {}", link.display()), e))
}
