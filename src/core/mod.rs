//! Core infrastructure shared by all installers
//!
//! Options, cancellation, errors, and terminal output.

pub mod config;
pub mod context;
pub mod error;
pub mod output;
