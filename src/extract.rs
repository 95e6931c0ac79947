//! Streaming `.tar.gz` extraction
//!
//! Archives served by code hosts and package registries wrap everything in a
//! single synthetic top-level directory (`repo-<sha>/`, `package/`, ...).
//! [`extract_tar_gz`] drops that first component while unpacking, optionally
//! keeping only one subdirectory. Entries are decoded one at a time, so
//! memory use does not depend on archive size.
//!
//! Symlink targets are written as stored. A link pointing outside the
//! destination is not rejected, but no later entry is ever written through
//! a link: an entry whose parent is a symlink is an error, and a symlink
//! already at an entry's own path is replaced rather than followed.

use crate::core::error::Cause;
use crate::internal::fs_utils;
use flate2::read::GzDecoder;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Component, Path};

/// Drop the first component of an archive path.
///
/// `root/a/b.txt` becomes `a/b.txt`. Returns `None` for the top-level
/// directory entry itself (`root` or `root/`).
pub fn strip_first_component(path: &str) -> Option<&str> {
    let (_, rest) = path.split_once('/')?;
    if rest.is_empty() { None } else { Some(rest) }
}

/// Reject remainders that would land outside the destination.
fn validate_relative(rest: &str) -> Result<&Path, Cause> {
    let path = Path::new(rest);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path)
    } else {
        Err(Cause::Archive(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("archive contains unsafe path: {}", rest),
        )))
    }
}

/// Extract a gzip-compressed tar stream into `dest`.
///
/// When `subdir` is non-empty only entries under `dest/subdir` are written.
/// Returns the number of entries written. On error, entries already written
/// stay in place; callers extract into a scratch directory for this reason.
pub fn extract_tar_gz<R: Read>(reader: R, dest: &Path, subdir: &str) -> Result<usize, Cause> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let filter = (!subdir.is_empty()).then(|| dest.join(subdir));
    let mut written = 0;

    for entry in archive.entries().map_err(Cause::Archive)? {
        let mut entry = entry.map_err(Cause::Archive)?;

        let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some(rest) = strip_first_component(&raw) else {
            continue;
        };
        let relative = validate_relative(rest)?;
        let target = dest.join(relative);

        if let Some(filter) = &filter
            && !target.starts_with(filter)
        {
            continue;
        }

        reject_symlinked_parents(dest, relative, &raw)?;
        fs_utils::remove_if_symlink(&target)?;

        let header = entry.header();
        let mode = header.mode().map_err(Cause::Archive)?;
        let kind = header.entry_type();

        if kind.is_dir() {
            create_dir(&target, mode)?;
        } else if kind.is_file() {
            write_file(&mut entry, &target, mode)?;
        } else if kind.is_symlink() {
            let link = entry
                .link_name()
                .map_err(Cause::Archive)?
                .map(|l| l.into_owned())
                .ok_or_else(|| {
                    Cause::Archive(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("symlink without target: {}", raw),
                    ))
                })?;
            create_symlink(&link, &target)?;
        } else {
            continue;
        }
        written += 1;
    }

    Ok(written)
}

/// Fail if any directory between `dest` and `dest/relative` is a symlink.
fn reject_symlinked_parents(dest: &Path, relative: &Path, raw: &str) -> Result<(), Cause> {
    let mut current = dest.to_path_buf();
    let parents = relative.parent().into_iter().flat_map(|p| p.components());
    for component in parents {
        current.push(component);
        let is_link = std::fs::symlink_metadata(&current)
            .map(|md| md.file_type().is_symlink())
            .unwrap_or(false);
        if is_link {
            return Err(Cause::Archive(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("archive entry {} would be written through a symlink", raw),
            )));
        }
    }
    Ok(())
}

/// Open `archive` and extract it; see [`extract_tar_gz`].
pub fn extract_file(archive: &Path, dest: &Path, subdir: &str) -> Result<usize, Cause> {
    let file = File::open(archive)
        .map_err(|e| Cause::io(format!("failed to open {}", archive.display()), e))?;
    extract_tar_gz(std::io::BufReader::new(file), dest, subdir)
}

fn create_dir(target: &Path, mode: u32) -> Result<(), Cause> {
    std::fs::create_dir_all(target)
        .map_err(|e| Cause::io(format!("cannot create directory {}", target.display()), e))?;
    // owner must be able to populate it
    fs_utils::set_mode(target, (mode | 0o700) & 0o7777)
        .map_err(|e| Cause::io(format!("chmod failed for {}", target.display()), e))
}

fn write_file(reader: &mut impl Read, target: &Path, mode: u32) -> Result<(), Cause> {
    fs_utils::ensure_parent_dir(target)?;

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode & 0o7777);
    }
    let mut file = options
        .open(target)
        .map_err(|e| Cause::io(format!("cannot create {}", target.display()), e))?;
    std::io::copy(reader, &mut file).map_err(Cause::Archive)?;

    // open() only applies the mode to new files, and the umask applies too
    fs_utils::set_mode(target, mode & 0o7777)
        .map_err(|e| Cause::io(format!("chmod failed for {}", target.display()), e))
}

#[cfg(unix)]
fn create_symlink(link: &Path, target: &Path) -> Result<(), Cause> {
    fs_utils::ensure_parent_dir(target)?;
    std::os::unix::fs::symlink(link, target).map_err(|e| {
        Cause::io(
            format!("cannot create symlink {} -> {}", target.display(), link.display()),
            e,
        )
    })
}

#[cfg(not(unix))]
fn create_symlink(link: &Path, target: &Path) -> Result<(), Cause> {
    fs_utils::ensure_parent_dir(target)?;
    let resolved: std::path::PathBuf = target.parent().map(|p| p.join(link)).unwrap_or_default();
    let result = if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    };
    result.map_err(|e| Cause::io(format!("cannot create symlink {}", target.display()), e))
}
