//! Install error types.
//!
//! Every failure is tagged with the [`Phase`] it happened in, so callers can
//! tell a failed download apart from a failed checkout without parsing text.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The step of an install that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Validating the source descriptor
    Source,
    /// Allocating the scratch directory
    Scratch,
    /// Resolving a ref to a commit
    Resolve,
    /// Fetching an archive over HTTP
    Download,
    /// Unpacking an archive
    Extract,
    /// Initializing and fetching a git working tree
    Clone,
    /// Checking out the requested revision
    Checkout,
    /// Moving the package into its final location
    Move,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Scratch => "scratch",
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Clone => "clone",
            Self::Checkout => "checkout",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The underlying reason an install step failed.
#[derive(Error, Debug)]
pub enum Cause {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected status code {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("command failed: {command} (exit code: {code:?}){}", stderr_suffix(.stderr))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed archive: {0}")]
    Archive(#[source] std::io::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not resolve '{reference}' to a commit on {remote}")]
    Unresolved { reference: String, remote: String },

    #[error("subdirectory not found in package: {}", .0.display())]
    MissingSubdir(PathBuf),

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("install cancelled")]
    Cancelled,
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\nstderr: {}", stderr)
    }
}

impl Cause {
    /// Wrap an io error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// A failed install: which phase broke and why.
#[derive(Error, Debug)]
#[error("{phase} failed: {cause}")]
pub struct InstallError {
    pub phase: Phase,
    #[source]
    pub cause: Cause,
}

impl InstallError {
    pub fn new(phase: Phase, cause: Cause) -> Self {
        Self { phase, cause }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, Cause::Cancelled)
    }
}

/// Attach a [`Phase`] to a bare [`Cause`] result.
pub trait PhaseExt<T> {
    fn phase(self, phase: Phase) -> Result<T, InstallError>;
}

impl<T> PhaseExt<T> for Result<T, Cause> {
    fn phase(self, phase: Phase) -> Result<T, InstallError> {
        self.map_err(|cause| InstallError::new(phase, cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_names_phase_and_cause() {
        let err = InstallError::new(
            Phase::Download,
            Cause::Status {
                url: "https://example.com/a.tar.gz".to_string(),
                status: 404,
            },
        );
        assert_eq!(
            err.to_string(),
            "download failed: unexpected status code 404 for https://example.com/a.tar.gz"
        );
    }

    #[test]
    fn test_source_chain_exposes_cause() {
        let err = InstallError::new(
            Phase::Move,
            Cause::io(
                "failed to move package",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ),
        );
        let cause = err.source().unwrap();
        assert!(cause.to_string().contains("failed to move package"));
        assert!(cause.source().is_some());
    }

    #[test]
    fn test_command_error_includes_stderr_only_when_present() {
        let with = Cause::Command {
            command: "git fetch origin".to_string(),
            code: Some(128),
            stderr: "fatal: couldn't find remote ref\n".to_string(),
        };
        assert!(with.to_string().ends_with("stderr: fatal: couldn't find remote ref"));

        let without = Cause::Command {
            command: "git init".to_string(),
            code: Some(1),
            stderr: "  ".to_string(),
        };
        assert_eq!(without.to_string(), "command failed: git init (exit code: Some(1))");
    }

    #[test]
    fn test_unresolved_names_ref_and_remote() {
        let err = InstallError::new(
            Phase::Resolve,
            Cause::Unresolved {
                reference: "main".to_string(),
                remote: "https://github.com/org/repo.git".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "resolve failed: could not resolve 'main' to a commit on https://github.com/org/repo.git"
        );
    }

    #[test]
    fn test_phase_ext() {
        let result: Result<(), Cause> = Err(Cause::Cancelled);
        let err = result.phase(Phase::Clone).unwrap_err();
        assert_eq!(err.phase, Phase::Clone);
        assert!(err.is_cancelled());
    }
}
