use super::NotifyBackend;
use nix::sys::event::{EventFilter, EventFlag, FilterFlag, KEvent, Kqueue};
use std::io;
use std::os::fd::RawFd;
use std::path::Path;

/// Watches file descriptors with kqueue(2).
///
/// kqueue watches open files rather than paths; the file descriptor
/// passed to [NotifyBackend::watch] is the token.
pub struct KqueueBackend {
    kq: Kqueue,
}

fn vnode_event(fd: RawFd, flags: EventFlag) -> KEvent {
    KEvent::new(
        fd as usize,
        EventFilter::EVFILT_VNODE,
        flags,
        FilterFlag::NOTE_WRITE,
        0,
        0,
    )
}

impl NotifyBackend for KqueueBackend {
    type Token = usize;

    fn open() -> io::Result<Self> {
        Ok(Self { kq: Kqueue::new()? })
    }

    fn watch(&mut self, fd: RawFd, _path: &Path) -> io::Result<usize> {
        let change = vnode_event(fd, EventFlag::EV_ADD | EventFlag::EV_CLEAR);
        self.kq.kevent(&[change], &mut [], None)?;

        Ok(fd as usize)
    }

    fn next_event(&mut self) -> io::Result<usize> {
        let mut events = [vnode_event(-1, EventFlag::empty())];
        loop {
            if self.kq.kevent(&[], &mut events, None)? == 0 {
                continue;
            }
            let ev = &events[0];
            if ev.flags().contains(EventFlag::EV_ERROR) {
                return Err(io::Error::from_raw_os_error(ev.data() as i32));
            }

            return Ok(ev.ident());
        }
    }
}
