//! Common filesystem utilities

use crate::core::error::Cause;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path (no filesystem access): drops `.` and folds
/// `..` into the preceding component.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Preserve leading ".." for relative paths.
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

/// Ensure a path's parent directory exists.
///
/// Creates the parent directory (and all ancestors) if it doesn't exist.
pub fn ensure_parent_dir(path: &Path) -> Result<(), Cause> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            Cause::io(
                format!("cannot create directory {}", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Remove whatever lives at `path`: directory tree, file, or symlink.
///
/// Symlinks are unlinked, never followed.
pub fn remove_if_exists(path: &Path) -> Result<(), Cause> {
    let md = match std::fs::symlink_metadata(path) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Cause::io(format!("cannot stat {}", path.display()), e)),
    };
    let result = if md.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| Cause::io(format!("failed to remove {}", path.display()), e))
}

/// Unlink `path` if it is a symlink. Anything else is left alone.
pub fn remove_if_symlink(path: &Path) -> Result<(), Cause> {
    match std::fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => std::fs::remove_file(path)
            .map_err(|e| Cause::io(format!("failed to remove {}", path.display()), e)),
        _ => Ok(()),
    }
}

/// Move `src` to `dest`, replacing anything previously at `dest`.
///
/// Parents of `dest` are created. `src` and `dest` must be on the same
/// filesystem; scratch directories live under the install root for this.
pub fn replace_dir(src: &Path, dest: &Path) -> Result<(), Cause> {
    ensure_parent_dir(dest)?;
    remove_if_exists(dest)?;
    std::fs::rename(src, dest).map_err(|e| {
        Cause::io(
            format!("failed to move {} -> {}", src.display(), dest.display()),
            e,
        )
    })
}

/// Set file permissions (Unix only).
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(()) // No-op on non-Unix
}
