//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

/// Build a `.tar.gz` whose entries all live under `top/`.
///
/// `files` are `(relative path, contents)`; parent directories are added
/// automatically.
pub fn archive(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let mut dirs = vec![format!("{}/", top)];
    for (path, _) in files {
        let mut parent = Path::new(path).parent();
        while let Some(p) = parent.filter(|p| !p.as_os_str().is_empty()) {
            dirs.push(format!("{}/{}/", top, p.display()));
            parent = p.parent();
        }
    }
    dirs.sort();
    dirs.dedup();

    for dir in dirs {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        builder.append_data(&mut header, dir, std::io::empty()).unwrap();
    }
    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(body.len() as u64);
        builder
            .append_data(&mut header, format!("{}/{}", top, path), body.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Every regular file under `root`, keyed by relative path, skipping `.git`.
pub fn tree(root: &Path) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, std::fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

pub fn expected(files: &[(&str, &str)]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(p, b)| (p.to_string(), b.to_string()))
        .collect()
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

/// Create a repository at `dir` containing `files`, committed and tagged.
/// Returns the commit id.
pub fn git_repo(dir: &Path, files: &[(&str, &str)], tag: &str) -> String {
    for (path, body) in files {
        let file = dir.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, body).unwrap();
    }
    git(dir, &["init", "-q"]);
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "release"]);
    git(dir, &["tag", tag]);
    git(dir, &["rev-parse", "HEAD"])
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Entries left in the scratch area of `dir`.
pub fn scratch_leftovers(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir.join(".tmp")) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
