//! Fetches jsonnet packages into a vendor directory
//!
//! A package is described by a [`Source`] and installed by the matching
//! [`Installer`] into `{dir}/{name}`:
//!
//! - **git**: archive download for hosts that serve
//!   `{remote}/archive/{commit}.tar.gz`, otherwise a shallow fetch (full
//!   fetch if the server refuses) with optional sparse checkout of a subdir
//! - **http**: a `.tar.gz` at a URL, with `$VERSION` substituted
//! - **gitlab**: the GitLab generic package registry
//! - **local**: a relative symlink to a directory on disk
//!
//! Every install stages its work in a scratch directory under
//! `{dir}/.tmp/` and only then moves the result into place, so a failed
//! install leaves no partial package behind.
//!
//! # Example
//!
//! ```no_run
//! use jsonnet_fetch::{InstallContext, InstallOptions, Source, install};
//! use std::path::Path;
//!
//! let source = Source::from_json(
//!     r#"{ "git": { "remote": "https://github.com/grafana/jsonnet-libs.git", "subdir": "grafonnet" } }"#,
//! )?;
//! let ctx = InstallContext::new(InstallOptions::default());
//! let commit = install(
//!     &ctx,
//!     &source,
//!     &source.legacy_name(),
//!     Path::new("vendor"),
//!     "master",
//! )?;
//! println!("installed at {commit}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Errors
//!
//! Installs fail with [`InstallError`], which records the [`Phase`] that
//! failed and the underlying [`Cause`].

pub mod acquire;
pub mod core;
pub mod extract;
mod internal;
pub mod source;

pub use acquire::{
    GitInstaller, GitlabInstaller, HttpInstaller, Installer, LocalInstaller, install,
    installer_for,
};
pub use crate::core::config::{Config, InstallOptions};
pub use crate::core::context::{CancelToken, InstallContext};
pub use crate::core::error::{Cause, InstallError, Phase};
pub use crate::core::output::Output;
pub use source::{GitSource, GitlabSource, HttpSource, LocalSource, Source};
