//! Installer for git sources.
//!
//! The install runs as a small state machine:
//!
//! ```text
//! ResolveRef -> ArchiveFastPath --ok--> Done
//!                     |
//!                   failed
//!                     v
//!               InitRepo -> FetchShallow --failed--> FetchFull
//!                               |                       |
//!                               +-----------+-----------+
//!                                           v
//!                        [SparseCheckout] -> Checkout -> RecordCommit -> Finalize -> Done
//! ```
//!
//! Remotes that don't match the configured archive pattern start at
//! `InitRepo`. Failures on the archive fast path and in `FetchShallow` move
//! to the next strategy; any other failure ends the install.

use super::Installer;
use super::download::download;
use crate::core::context::InstallContext;
use crate::core::error::{Cause, InstallError, Phase, PhaseExt};
use crate::core::output::Output;
use crate::extract;
use crate::internal::fs_utils;
use crate::internal::process::Git;
use crate::internal::scratch::ScratchDir;
use crate::source::GitSource;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A leading run of 40+ lowercase hex characters (SHA-1 or SHA-256)
fn commit_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9a-f]{40,})\b").expect("valid regex"))
}

fn commit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-f]{40,}$").expect("valid regex"))
}

/// Whether `version` is already a full commit id.
pub fn looks_like_commit(version: &str) -> bool {
    commit_pattern().is_match(version)
}

/// The commit at the start of `git ls-remote` output, if any.
pub fn parse_ls_remote(output: &str) -> Option<String> {
    commit_prefix_pattern()
        .captures(output.trim_start())
        .map(|c| c[1].to_string())
}

/// `{remote without .git}/archive/{commit}.tar.gz`
pub fn archive_url(remote: &str, commit: &str) -> String {
    format!(
        "{}/archive/{}.tar.gz",
        remote.strip_suffix(".git").unwrap_or(remote),
        commit
    )
}

/// Which optional states an install passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// The remote offers archive downloads
    pub archive_fast_path: bool,
    /// A subdirectory was requested
    pub sparse: bool,
}

/// States of a git install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    ResolveRef,
    ArchiveFastPath,
    InitRepo,
    FetchShallow,
    FetchFull,
    SparseCheckout,
    Checkout,
    RecordCommit,
    Finalize,
    Done,
}

impl GitState {
    pub fn first(plan: Plan) -> Self {
        if plan.archive_fast_path {
            Self::ResolveRef
        } else {
            Self::InitRepo
        }
    }

    /// The state after this one's step finished. `None` means the failure
    /// is fatal and ends the install.
    pub fn next(self, plan: Plan, succeeded: bool) -> Option<Self> {
        let after_fetch = if plan.sparse {
            Self::SparseCheckout
        } else {
            Self::Checkout
        };
        match (self, succeeded) {
            // Resolution is an optimization; the archive step copes without it
            (Self::ResolveRef, _) => Some(Self::ArchiveFastPath),
            (Self::ArchiveFastPath, true) => Some(Self::Done),
            (Self::ArchiveFastPath, false) => Some(Self::InitRepo),
            (Self::InitRepo, true) => Some(Self::FetchShallow),
            (Self::FetchShallow, true) | (Self::FetchFull, true) => Some(after_fetch),
            (Self::FetchShallow, false) => Some(Self::FetchFull),
            (Self::SparseCheckout, true) => Some(Self::Checkout),
            (Self::Checkout, true) => Some(Self::RecordCommit),
            (Self::RecordCommit, true) => Some(Self::Finalize),
            (Self::Finalize, true) => Some(Self::Done),
            (Self::Done, _) => Some(Self::Done),
            (_, false) => None,
        }
    }

    /// Phase reported when this state fails fatally.
    pub fn phase(self) -> Phase {
        match self {
            Self::ResolveRef => Phase::Resolve,
            Self::ArchiveFastPath => Phase::Download,
            Self::InitRepo | Self::FetchShallow | Self::FetchFull => Phase::Clone,
            Self::SparseCheckout | Self::Checkout | Self::RecordCommit => Phase::Checkout,
            Self::Finalize | Self::Done => Phase::Move,
        }
    }
}

pub struct GitInstaller {
    source: GitSource,
}

impl GitInstaller {
    pub fn new(source: GitSource) -> Self {
        Self { source }
    }

    fn plan(&self, ctx: &InstallContext) -> Plan {
        Plan {
            archive_fast_path: ctx
                .options
                .archive_remote_pattern
                .is_match(&self.source.remote),
            sparse: !self.source.subdir.is_empty(),
        }
    }
}

/// Mutable state of one install.
struct Run<'a> {
    ctx: &'a InstallContext,
    source: &'a GitSource,
    version: &'a str,
    dest: PathBuf,
    scratch: ScratchDir,
    output: Output,
    /// Commit the archive was fetched at, or that HEAD ended up on
    commit: Option<String>,
}

impl Run<'_> {
    fn work_dir(&self) -> PathBuf {
        self.scratch.work_dir()
    }

    fn git(&self) -> Git {
        Git::new(self.ctx, &self.work_dir())
    }

    fn step(&mut self, state: GitState) -> Result<(), InstallError> {
        match state {
            GitState::ResolveRef => self.resolve_ref(),
            GitState::ArchiveFastPath => self.archive_fast_path(),
            GitState::InitRepo => self.init_repo().phase(Phase::Clone),
            GitState::FetchShallow => {
                self.output
                    .detail(&format!("git fetch --depth 1 origin {}", self.version));
                self.git()
                    .run(&["fetch", "--tags", "--depth", "1", "origin", self.version])
                    .phase(Phase::Clone)
            }
            GitState::FetchFull => {
                self.output.detail("git fetch origin");
                self.git().run(&["fetch", "origin"]).phase(Phase::Clone)
            }
            GitState::SparseCheckout => self.sparse_checkout().phase(Phase::Checkout),
            GitState::Checkout => {
                self.output.detail(&format!("git checkout {}", self.version));
                self.git()
                    .run(&["-c", "advice.detachedHead=false", "checkout", self.version])
                    .phase(Phase::Checkout)
            }
            GitState::RecordCommit => {
                let head = self.git().output(&["rev-parse", "HEAD"]).phase(Phase::Checkout)?;
                self.commit = Some(head);
                Ok(())
            }
            GitState::Finalize => self.finalize().phase(Phase::Move),
            GitState::Done => Ok(()),
        }
    }

    fn resolve_ref(&mut self) -> Result<(), InstallError> {
        // Let ls-remote decide whether `version` is a ref or a commit, in case
        // a ref happens to look like a hex id.
        let git = Git::new(self.ctx, self.scratch.path());
        let listed = git.output(&[
            "ls-remote",
            "--heads",
            "--tags",
            "--refs",
            "--quiet",
            &self.source.remote,
            self.version,
        ]);

        let resolved = match listed {
            Ok(out) => parse_ls_remote(&out),
            Err(Cause::Cancelled) => return Err(InstallError::new(Phase::Resolve, Cause::Cancelled)),
            Err(e) => {
                self.output.detail(&format!("ls-remote failed: {}", e));
                None
            }
        };

        self.commit = resolved.or_else(|| {
            looks_like_commit(self.version).then(|| self.version.to_string())
        });
        Ok(())
    }

    fn archive_fast_path(&mut self) -> Result<(), InstallError> {
        let commit = self.commit.clone().ok_or_else(|| {
            InstallError::new(
                Phase::Resolve,
                Cause::Unresolved {
                    reference: self.version.to_string(),
                    remote: self.source.remote.clone(),
                },
            )
        })?;

        let url = archive_url(&self.source.remote, &commit);
        let archive = self.scratch.download_path(&format!("{}.tar.gz", commit));
        download(self.ctx, &url, &archive).phase(Phase::Download)?;

        let work = self.work_dir();
        std::fs::create_dir_all(&work)
            .map_err(|e| Cause::io(format!("cannot create directory {}", work.display()), e))
            .phase(Phase::Extract)?;
        let entries = extract::extract_file(&archive, &work, &self.source.subdir)
            .phase(Phase::Extract)?;
        self.output
            .detail(&format!("extracted {} entries from {}", entries, url));

        let package = package_dir(&work, &self.source.subdir).phase(Phase::Extract)?;
        fs_utils::replace_dir(&package, &self.dest).phase(Phase::Move)
    }

    fn init_repo(&mut self) -> Result<(), Cause> {
        // The archive path may have left a partial tree behind
        let work = self.work_dir();
        fs_utils::remove_if_exists(&work)?;
        std::fs::create_dir_all(&work)
            .map_err(|e| Cause::io(format!("cannot create directory {}", work.display()), e))?;

        self.output.detail(&format!("git init ({})", self.source.remote));
        let git = self.git();
        git.run(&["init"])?;
        git.run(&["remote", "add", "origin", &self.source.remote])
    }

    fn sparse_checkout(&mut self) -> Result<(), Cause> {
        self.git().run(&["config", "core.sparsecheckout", "true"])?;
        let info = self.work_dir().join(".git").join("info");
        std::fs::create_dir_all(&info)
            .map_err(|e| Cause::io(format!("cannot create directory {}", info.display()), e))?;
        let patterns = info.join("sparse-checkout");
        std::fs::write(&patterns, format!("{}/*\n", self.source.subdir))
            .map_err(|e| Cause::io(format!("cannot write {}", patterns.display()), e))
    }

    fn finalize(&mut self) -> Result<(), Cause> {
        let work = self.work_dir();
        fs_utils::remove_if_exists(&work.join(".git"))?;
        let package = package_dir(&work, &self.source.subdir)?;
        fs_utils::replace_dir(&package, &self.dest)
    }
}

/// The directory that becomes the package: the tree root or its subdir.
fn package_dir(work: &Path, subdir: &str) -> Result<PathBuf, Cause> {
    let dir = work.join(subdir);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(Cause::MissingSubdir(PathBuf::from(subdir)))
    }
}

impl Installer for GitInstaller {
    fn install(
        &self,
        ctx: &InstallContext,
        name: &str,
        dir: &Path,
        version: &str,
    ) -> Result<String, InstallError> {
        let scratch = ScratchDir::create(dir, name, version).phase(Phase::Scratch)?;
        let plan = self.plan(ctx);
        let mut run = Run {
            ctx,
            source: &self.source,
            version,
            dest: dir.join(name),
            scratch,
            output: ctx.output(),
            commit: None,
        };

        let mut state = GitState::first(plan);
        while state != GitState::Done {
            let failure = run.step(state).err();
            let next = match &failure {
                Some(e) if e.is_cancelled() => None,
                _ => state.next(plan, failure.is_none()),
            };
            match (next, failure) {
                (Some(next), None) => state = next,
                (Some(next), Some(e)) => {
                    if state == GitState::ArchiveFastPath {
                        run.output.warning(&format!("archive install failed: {}", e));
                        run.output.warning("retrying with git...");
                    } else {
                        run.output
                            .detail(&format!("{}, falling back to a full fetch", e));
                    }
                    state = next;
                }
                (None, Some(e)) => return Err(e),
                (None, None) => break,
            }
        }

        // Scratch is dropped (and removed) on return
        run.commit.ok_or_else(|| {
            InstallError::new(
                Phase::Checkout,
                Cause::InvalidSource("install finished without a commit".to_string()),
            )
        })
    }
}
