//! Colored output for install progress
//!
//! Uses owo-colors for terminal colors. Quietness is a property of the
//! [`Output`] value handed to each install, never a global switch.

use owo_colors::OwoColorize;

/// Terminal reporter for a single install.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print an action header (blue, bold)
    /// Example: "==> Installing github.com/grafana/jsonnet-libs/grafonnet"
    pub fn action(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "==>".blue().bold(), message.bold());
        }
    }

    /// Print a detail line (dimmed)
    /// Example: "     git checkout v1.0.0"
    pub fn detail(&self, message: &str) {
        if !self.quiet {
            println!("     {}", message.dimmed());
        }
    }

    /// Print a completed HTTP request (cyan)
    /// Example: "GET https://github.com/org/repo/archive/abc.tar.gz 200"
    pub fn fetched(&self, url: &str, status: u16) {
        if !self.quiet {
            println!("{}", format!("GET {} {}", url, status).cyan());
        }
    }

    /// Print a success message (green)
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "==>".green().bold(), message.green());
        }
    }

    /// Print a warning message (yellow)
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
        }
    }

    /// Print an error message (red). Shown even when quiet.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message.red());
    }
}
