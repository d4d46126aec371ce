//! Host filesystem helpers for command-line tools.
//!
//! This crate hides two platform differences behind a single
//! interface:
//!
//! - `mount`: list mounted filesystems, whether the platform exposes
//!   them as a mount table file or as a kernel snapshot, and select
//!   them by type.
//! - `notify`: wait for modifications of any of a set of files, using
//!   inotify or kqueue.
//!
//! Configuration, errors and logging setup are shared by both.

pub mod config;
pub mod errors;
pub mod mount;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))]
pub mod notify;
pub mod utils;
