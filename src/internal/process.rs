//! Cancellable subprocess execution for git.

use crate::core::context::{CancelToken, InstallContext};
use crate::core::error::Cause;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

/// How often a running child is checked for exit or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs git commands inside one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    dir: PathBuf,
    quiet: bool,
    cancel: CancelToken,
}

impl Git {
    pub fn new(ctx: &InstallContext, dir: &Path) -> Self {
        Self {
            program: ctx.options.git_program.clone(),
            dir: dir.to_path_buf(),
            quiet: ctx.options.quiet,
            cancel: ctx.cancel.clone(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.dir).stdin(Stdio::null());
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program.display(), args.join(" "))
    }

    /// Run for side effects.
    ///
    /// Output goes to the terminal unless quiet; when quiet, stderr is
    /// captured so it can be attached to the error.
    pub fn run(&self, args: &[&str]) -> Result<(), Cause> {
        let mut cmd = self.command(args);
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        let (status, _, stderr) = self.wait(cmd, args)?;
        self.check_status(args, status, stderr)
    }

    /// Run and return trimmed stdout.
    pub fn output(&self, args: &[&str]) -> Result<String, Cause> {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let (status, stdout, stderr) = self.wait(cmd, args)?;
        self.check_status(args, status, stderr)?;
        Ok(stdout.trim().to_string())
    }

    fn check_status(&self, args: &[&str], status: ExitStatus, stderr: String) -> Result<(), Cause> {
        if status.success() {
            Ok(())
        } else {
            Err(Cause::Command {
                command: self.describe(args),
                code: status.code(),
                stderr,
            })
        }
    }

    fn wait(&self, mut cmd: Command, args: &[&str]) -> Result<(ExitStatus, String, String), Cause> {
        self.cancel.check()?;
        let mut child = cmd.spawn().map_err(|e| Cause::Spawn {
            program: self.program.display().to_string(),
            source: e,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if self.cancel.is_cancelled() {
                kill(&mut child);
                return Err(Cause::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill(&mut child);
                    return Err(Cause::io(format!("failed to wait for {}", self.describe(args)), e));
                }
            }
        };

        Ok((status, join(stdout), join(stderr)))
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

// Pipes are read on their own threads so a chatty child never blocks on a
// full pipe while we poll it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut r| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InstallOptions;
    use tempfile::tempdir;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_output_captures_stdout() {
        if !git_available() {
            return;
        }
        let temp = tempdir().unwrap();
        let ctx = InstallContext::new(InstallOptions::default().quiet(true));
        let git = Git::new(&ctx, temp.path());
        let version = git.output(&["--version"]).unwrap();
        assert!(version.starts_with("git version"));
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        if !git_available() {
            return;
        }
        let temp = tempdir().unwrap();
        let ctx = InstallContext::new(InstallOptions::default().quiet(true));
        let git = Git::new(&ctx, temp.path());
        let err = git.run(&["rev-parse", "HEAD"]).unwrap_err();
        match err {
            Cause::Command { command, code, stderr } => {
                assert!(command.ends_with("rev-parse HEAD"));
                assert_ne!(code, Some(0));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let temp = tempdir().unwrap();
        let ctx = InstallContext::new(
            InstallOptions::default()
                .quiet(true)
                .git_program("/nonexistent/bin/git-does-not-exist"),
        );
        let err = Git::new(&ctx, temp.path()).run(&["init"]).unwrap_err();
        assert!(matches!(err, Cause::Spawn { .. }));
    }

    #[test]
    fn test_cancelled_before_spawn() {
        let temp = tempdir().unwrap();
        let ctx = InstallContext::new(InstallOptions::default().quiet(true));
        ctx.cancel.cancel();
        let err = Git::new(&ctx, temp.path()).run(&["init"]).unwrap_err();
        assert!(matches!(err, Cause::Cancelled));
    }
}
