use super::NotifyBackend;
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::path::Path;

/// Watches paths with inotify(7).
///
/// Only modification events are reported. A single read may return
/// several events; they are queued and reported one at a time.
pub struct InotifyBackend {
    inotify: Inotify,
    buffer: Vec<u8>,
    pending: VecDeque<WatchDescriptor>,
}

impl NotifyBackend for InotifyBackend {
    type Token = WatchDescriptor;

    fn open() -> io::Result<Self> {
        Ok(Self {
            inotify: Inotify::init()?,
            buffer: vec![0; 4096],
            pending: VecDeque::new(),
        })
    }

    fn watch(&mut self, _fd: RawFd, path: &Path) -> io::Result<WatchDescriptor> {
        self.inotify.watches().add(path, WatchMask::MODIFY)
    }

    fn next_event(&mut self) -> io::Result<WatchDescriptor> {
        loop {
            if let Some(wd) = self.pending.pop_front() {
                return Ok(wd);
            }

            let events = self.inotify.read_events_blocking(&mut self.buffer)?;
            for ev in events {
                if ev.mask.contains(EventMask::MODIFY) {
                    self.pending.push_back(ev.wd);
                } else {
                    // Queue overflows and removed watches.
                    log::debug!("inotify ev: {ev:?}");
                }
            }
        }
    }
}
