//! Install context: options plus a cancellation signal.

use super::config::InstallOptions;
use super::error::Cause;
use super::output::Output;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag.
///
/// Clones observe the same flag. Downloads check it between chunks and
/// subprocesses are killed once it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cause::Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), Cause> {
        if self.is_cancelled() {
            Err(Cause::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything an installer needs besides the request itself.
#[derive(Debug, Clone, Default)]
pub struct InstallContext {
    pub options: InstallOptions,
    pub cancel: CancelToken,
}

impl InstallContext {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn output(&self) -> Output {
        Output::new(self.options.quiet)
    }
}
