//! Internal utility modules
//!
//! Shared plumbing used by the installers. Not part of the public API.

pub mod fs_utils;
pub mod process;
pub mod progress;
pub mod scratch;
