//! Scratch directories for in-flight installs.
//!
//! Each install gets `{root}/.tmp/{prefix}{random}` where the prefix is
//! derived from the package name and version. The directory is removed when
//! the [`ScratchDir`] is dropped, whether the install succeeded, failed, or
//! unwound.

use crate::core::error::Cause;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Directory under the install root holding scratch directories
pub const SCRATCH_DIR_NAME: &str = ".tmp";

/// Name of the staging tree inside a scratch directory
const WORK_DIR_NAME: &str = "src";

/// Downloaded files live here, apart from the staging tree
const DOWNLOAD_DIR_NAME: &str = "downloads";

/// Used when a URL gives no usable file name
const FALLBACK_FILE_NAME: &str = "download";

/// Deterministic prefix for a `(name, version)` pair.
///
/// sha256 of `jsonnetpkg-{name}-{version}` with `/` replaced by `-`, truncated
/// to 16 bytes and hex encoded.
pub fn scratch_prefix(name: &str, version: &str) -> String {
    let key = format!(
        "jsonnetpkg-{}-{}",
        name.replace('/', "-"),
        version.replace('/', "-")
    );
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

/// An exclusively owned, self-deleting scratch directory.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Allocate a fresh scratch directory under `{root}/.tmp`.
    pub fn create(root: &Path, name: &str, version: &str) -> Result<Self, Cause> {
        let parent = root.join(SCRATCH_DIR_NAME);
        std::fs::create_dir_all(&parent).map_err(|e| {
            Cause::io(format!("failed to create {}", parent.display()), e)
        })?;
        let dir = tempfile::Builder::new()
            .prefix(&scratch_prefix(name, version))
            .tempdir_in(&parent)
            .map_err(|e| Cause::io("failed to create tmp dir", e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staging tree that is moved into the destination on success.
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join(WORK_DIR_NAME)
    }

    /// Location for a downloaded file, outside the staging tree.
    ///
    /// Only the last component of `filename` is used; `.`, `..` and empty
    /// names are replaced.
    pub fn download_path(&self, filename: &str) -> PathBuf {
        let name = match Path::new(filename).components().next_back() {
            Some(Component::Normal(name)) => name.to_os_string(),
            _ => FALLBACK_FILE_NAME.into(),
        };
        self.dir.path().join(DOWNLOAD_DIR_NAME).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prefix_is_deterministic_and_32_hex_chars() {
        let a = scratch_prefix("github.com/grafana/jsonnet-libs/grafonnet", "v1.0.0");
        let b = scratch_prefix("github.com/grafana/jsonnet-libs/grafonnet", "v1.0.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_prefix_matches_known_digest() {
        let expected = hex::encode(&Sha256::digest(b"jsonnetpkg-a-b-release-1")[..16]);
        assert_eq!(scratch_prefix("a/b", "release/1"), expected);
    }

    #[test]
    fn test_prefix_differs_by_version() {
        assert_ne!(scratch_prefix("pkg", "1.0.0"), scratch_prefix("pkg", "2.0.0"));
    }

    #[test]
    fn test_concurrent_scratch_dirs_do_not_collide() {
        let root = tempdir().unwrap();
        let a = ScratchDir::create(root.path(), "pkg", "1.0.0").unwrap();
        let b = ScratchDir::create(root.path(), "pkg", "1.0.0").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path().join(".tmp")));
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&scratch_prefix("pkg", "1.0.0")));
    }

    #[test]
    fn test_scratch_removed_on_drop() {
        let root = tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path(), "pkg", "1.0.0").unwrap();
            std::fs::create_dir_all(scratch.work_dir()).unwrap();
            std::fs::write(scratch.work_dir().join("f"), "x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_download_path_never_overlaps_work_dir() {
        let root = tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "pkg", "1.0.0").unwrap();

        for name in ["src", ".", "..", "", "a/../src", "pkg.tar.gz"] {
            let path = scratch.download_path(name);
            assert!(path.starts_with(scratch.path()), "{name:?}");
            assert!(!path.starts_with(scratch.work_dir()), "{name:?}");
            assert_ne!(path, scratch.work_dir(), "{name:?}");
        }
        assert!(scratch.download_path("..").ends_with("download"));
        assert!(scratch.download_path("pkg.tar.gz").ends_with("pkg.tar.gz"));
    }
}
