//! Wait for modifications of any of a set of files.
//!
//! [NotifyMultiplexer] keeps track of the files to watch and of the
//! identifiers the caller associated with them. Change events come
//! from a [NotifyBackend], chosen at compile time, see
//! [DefaultNotifyBackend]: inotify on Linux, kqueue on macOS and
//! FreeBSD.

use crate::errors::NotifyError;
use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::path::Path;

#[cfg(target_os = "linux")]
pub mod inotify;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
pub mod kqueue;

#[cfg(target_os = "linux")]
pub type DefaultNotifyBackend = inotify::InotifyBackend;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
pub type DefaultNotifyBackend = kqueue::KqueueBackend;

/// Source of file modification events.
pub trait NotifyBackend: Sized {
    /// Identifies a watch in the events reported by the backend.
    type Token: PartialEq + fmt::Debug;

    fn open() -> io::Result<Self>;

    /// Start watching `path`, open as `fd`, for modifications.
    ///
    /// Some backends watch the path, others the file descriptor.
    fn watch(&mut self, fd: RawFd, path: &Path) -> io::Result<Self::Token>;

    /// Wait for the next event and return the token of its watch.
    ///
    /// Blocks for as long as necessary.
    fn next_event(&mut self) -> io::Result<Self::Token>;
}

struct Registration<'a, T> {
    token: T,
    caller_id: RawFd,
    path: &'a Path,
}

/// Waits for modifications of a fixed maximum number of files.
///
/// Paths are borrowed for as long as the multiplexer lives, as
/// they're returned as-is by [NotifyMultiplexer::wait].
///
/// Dropping the multiplexer releases the backend and all its watches.
pub struct NotifyMultiplexer<'a, B: NotifyBackend = DefaultNotifyBackend> {
    backend: B,
    capacity: usize,
    registrations: Vec<Registration<'a, B::Token>>,
}

impl<'a> NotifyMultiplexer<'a> {
    /// Create a multiplexer for the platform backend that can watch up
    /// to `capacity` files.
    pub fn new(capacity: usize) -> Result<Self, NotifyError> {
        let backend = DefaultNotifyBackend::open().map_err(NotifyError::BackendUnavailable)?;

        Ok(Self::with_backend(backend, capacity))
    }
}

impl<'a, B: NotifyBackend> NotifyMultiplexer<'a, B> {
    pub fn with_backend(backend: B, capacity: usize) -> Self {
        Self {
            backend,
            capacity,
            registrations: Vec::with_capacity(capacity),
        }
    }

    /// Watch `path` for modifications.
    ///
    /// `caller_id` is returned by [NotifyMultiplexer::wait] when the
    /// file is modified. It should be a file descriptor open on
    /// `path`, as some backends watch the descriptor instead of the
    /// path.
    ///
    /// Going over capacity fails with [NotifyError::Capacity], which is
    /// fatal. If the backend can't watch `path`, this fails with
    /// [NotifyError::Registration]; other watches are unaffected and
    /// the multiplexer can still be used.
    ///
    /// A file already watched, possibly under another name, is also
    /// rejected with [NotifyError::Registration], as backends report a
    /// single watch for it.
    pub fn add(&mut self, caller_id: RawFd, path: &'a Path) -> Result<(), NotifyError> {
        if self.registrations.len() >= self.capacity {
            return Err(NotifyError::Capacity {
                capacity: self.capacity,
            });
        }
        let token = self
            .backend
            .watch(caller_id, path)
            .map_err(|source| NotifyError::Registration {
                path: path.to_path_buf(),
                source,
            })?;
        if self.registrations.iter().any(|r| r.token == token) {
            return Err(NotifyError::Registration {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "file already watched"),
            });
        }
        log::debug!("watching {path:?} as {token:?}");
        self.registrations.push(Registration {
            token,
            caller_id,
            path,
        });

        Ok(())
    }

    /// Wait until one of the watched files is modified.
    ///
    /// Returns the caller id and path given to [NotifyMultiplexer::add]
    /// for that file. Blocks for as long as necessary; events that
    /// don't correspond to any watch and backend errors are logged and
    /// skipped.
    pub fn wait(&mut self) -> (RawFd, &'a Path) {
        loop {
            let token = match self.backend.next_event() {
                Ok(token) => token,
                Err(err) => {
                    log::warn!("failed to wait for file modifications: {err}");
                    continue;
                }
            };
            match self.registrations.iter().find(|r| r.token == token) {
                Some(r) => return (r.caller_id, r.path),
                None => log::debug!("ignored event for unknown watch {token:?}"),
            }
        }
    }

    /// Number of files being watched.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
