use super::{MountRecordBackend, RawMountRecord};
use crate::config::MountsConfig;
use crate::errors::MountError;
use nix::errno::Errno;
use nix::libc;
use std::ffi::{CStr, OsStr, OsString};
use std::os::raw::c_char;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;

/// Lists mounted filesystems with getmntinfo(3).
///
/// All records are obtained at once, from the kernel. Records are not
/// escaped and there's no alternate table to read from.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBackend;

impl SnapshotBackend {
    pub fn new(_config: &MountsConfig) -> Self {
        Self
    }
}

impl MountRecordBackend for SnapshotBackend {
    type Records = std::vec::IntoIter<Result<RawMountRecord, MountError>>;

    fn open(&self, source: Option<&Path>) -> Result<Self::Records, MountError> {
        if let Some(source) = source {
            return Err(MountError::AlternateSource(source.to_path_buf()));
        }

        let mut entries: *mut libc::statfs = std::ptr::null_mut();
        // SAFETY: getmntinfo points entries to a buffer of count statfs
        // structs, owned by libc, which stays valid until the next call
        // from this thread.
        let count = unsafe { libc::getmntinfo(&mut entries, libc::MNT_NOWAIT) };
        if count <= 0 || entries.is_null() {
            return Err(Errno::last().into());
        }
        let entries = unsafe { std::slice::from_raw_parts(entries, count as usize) };

        Ok(entries
            .iter()
            .map(|sfs| Ok(record(sfs)))
            .collect::<Vec<_>>()
            .into_iter())
    }

    fn escaped(&self) -> bool {
        false
    }
}

fn record(sfs: &libc::statfs) -> RawMountRecord {
    RawMountRecord {
        source: c_path(&sfs.f_mntfromname),
        mount_point: c_path(&sfs.f_mntonname),
        fstype: c_path(&sfs.f_fstypename).to_string_lossy().into_owned(),
        options: options(sfs.f_flags as u64),
    }
}

fn c_path(chars: &[c_char]) -> OsString {
    // SAFETY: the kernel NUL-terminates these fixed-size arrays.
    let bytes = unsafe { CStr::from_ptr(chars.as_ptr()) }.to_bytes();

    OsStr::from_bytes(bytes).to_os_string()
}

/// Rebuild a mount option string from statfs flags.
fn options(flags: u64) -> String {
    let mut options = vec![if flags & libc::MNT_RDONLY as u64 != 0 {
        "ro"
    } else {
        "rw"
    }];
    for (flag, name) in [
        (libc::MNT_NOSUID as u64, "nosuid"),
        (libc::MNT_NOEXEC as u64, "noexec"),
        (libc::MNT_SYNCHRONOUS as u64, "sync"),
    ] {
        if flags & flag != 0 {
            options.push(name);
        }
    }

    options.join(",")
}
