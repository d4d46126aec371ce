//! Snapshot of the mounted filesystems.
//!
//! [MountTableBuilder] reads raw records from a [MountRecordBackend]
//! and turns them into a [MountList]. The backend is chosen at compile
//! time, see [DefaultMountBackend]:
//!
//! - [table::MountTableBackend] reads a mount table file, such as
//!   `/proc/mounts`, one line at a time. It can read alternate tables.
//! - [snapshot::SnapshotBackend] asks the kernel for all mounts at once
//!   (macOS, FreeBSD). It has no notion of alternate table.

use crate::config::MountsConfig;
use crate::errors::{MountError, TypeListError};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt as _, OsStringExt as _};
use std::path::{Path, PathBuf};

pub(crate) mod escape;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
pub mod snapshot;
pub mod table;
pub mod types;

#[cfg(not(any(target_os = "macos", target_os = "freebsd")))]
pub type DefaultMountBackend = table::MountTableBackend;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
pub type DefaultMountBackend = snapshot::SnapshotBackend;

/// One mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Filesystem type, such as `ext4`.
    pub fstype: String,

    /// Directory the filesystem is mounted on.
    pub mount_point: PathBuf,

    /// Device or other source of the filesystem.
    pub source: OsString,

    /// Comma-separated mount options, possibly empty.
    pub options: String,

    /// Metadata of the mount point.
    ///
    /// Only collected from the live mount table, and only if available.
    pub stat_info: Option<StatInfo>,

    /// Capacity of the filesystem.
    ///
    /// Only collected from the live mount table, and only if available.
    pub space_info: Option<SpaceInfo>,
}

/// Metadata of a mount point, from stat(2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// Capacity of a filesystem, from statvfs(3).
///
/// Block counts are in units of `fragment_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceInfo {
    pub block_size: u64,
    pub fragment_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
    pub read_only: bool,
}

impl SpaceInfo {
    /// Total size, in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.blocks.saturating_mul(self.fragment_size)
    }

    /// Space available to unprivileged users, in bytes.
    pub fn available_bytes(&self) -> u64 {
        self.blocks_available.saturating_mul(self.fragment_size)
    }

    /// Space in use, in bytes.
    pub fn used_bytes(&self) -> u64 {
        self.blocks
            .saturating_sub(self.blocks_free)
            .saturating_mul(self.fragment_size)
    }
}

/// Mounted filesystems, last mounted first.
///
/// Filesystems appear in the reverse order of the mount table, so a
/// filesystem mounted over another shows up before the one it hides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountList {
    entries: VecDeque<MountEntry>,
}

impl MountList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MountEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.iter()
    }

    /// Entries whose type is selected by the given type list.
    ///
    /// See [types::matches].
    pub fn filter_types(&self, types: Option<&str>) -> Result<Vec<&MountEntry>, TypeListError> {
        let mut selected = vec![];
        for entry in &self.entries {
            if types::matches(entry, types)? {
                selected.push(entry);
            }
        }

        Ok(selected)
    }

    /// Find the filesystem that contains `path`.
    ///
    /// This compares the device of `path` with the device of the mount
    /// points, so it only works on lists built from the live mount
    /// table. As the list is in reverse order, this returns the
    /// topmost of overmounted filesystems.
    pub fn containing(&self, path: &Path) -> Option<&MountEntry> {
        let dev = match nix::sys::stat::stat(path) {
            Ok(st) => st.st_dev as u64,
            Err(err) => {
                log::debug!("stat {path:?}: {err}");
                return None;
            }
        };

        self.entries
            .iter()
            .find(|e| e.stat_info.is_some_and(|st| st.dev == dev))
    }

    fn push_front(&mut self, entry: MountEntry) {
        self.entries.push_front(entry);
    }
}

impl IntoIterator for MountList {
    type Item = MountEntry;
    type IntoIter = std::collections::vec_deque::IntoIter<MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a MountList {
    type Item = &'a MountEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A mount record, as reported by a backend.
///
/// Source and mount point are the bytes found in the table, possibly
/// escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMountRecord {
    pub source: OsString,
    pub mount_point: OsString,
    pub fstype: String,
    pub options: String,
}

/// Source of mount records.
pub trait MountRecordBackend {
    type Records: Iterator<Item = Result<RawMountRecord, MountError>>;

    /// Start enumerating the mounted filesystems.
    ///
    /// Reads `source` instead of the live table if specified.
    fn open(&self, source: Option<&Path>) -> Result<Self::Records, MountError>;

    /// Whether the mount point and source of records are
    /// backslash-octal escaped.
    fn escaped(&self) -> bool;
}

/// Builds a [MountList] from the records of a backend.
pub struct MountTableBuilder<B> {
    backend: B,
}

impl MountTableBuilder<DefaultMountBackend> {
    /// Create a builder for the platform backend.
    pub fn new(config: &MountsConfig) -> Self {
        Self::with_backend(DefaultMountBackend::new(config))
    }
}

impl<B: MountRecordBackend> MountTableBuilder<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// List mounted filesystems.
    ///
    /// Reads the live mount table, unless `source` is specified. When
    /// reading the live table, metadata and capacity of each filesystem
    /// are collected, if available.
    ///
    /// Fails if the table can't be read, in which case there's no
    /// partial result.
    pub fn build(&self, source: Option<&Path>) -> Result<MountList, MountError> {
        let inspect = source.is_none();
        let escaped = self.backend.escaped();
        let mut list = MountList::default();
        for record in self.backend.open(source)? {
            let record = record?;
            let (mount_point, device) = if escaped {
                (
                    OsString::from_vec(escape::decode(record.mount_point.as_bytes())),
                    OsString::from_vec(escape::decode(record.source.as_bytes())),
                )
            } else {
                (record.mount_point, record.source)
            };
            let mount_point = PathBuf::from(mount_point);
            let (stat_info, space_info) = if inspect {
                (stat_info(&mount_point), space_info(&mount_point))
            } else {
                (None, None)
            };

            list.push_front(MountEntry {
                fstype: record.fstype,
                mount_point,
                source: device,
                options: record.options,
                stat_info,
                space_info,
            });
        }
        log::debug!("{} mounted filesystems", list.len());

        Ok(list)
    }
}

fn stat_info(mount_point: &Path) -> Option<StatInfo> {
    match nix::sys::stat::stat(mount_point) {
        Ok(st) => Some(StatInfo {
            dev: st.st_dev as u64,
            ino: st.st_ino as u64,
            mode: st.st_mode as u32,
            uid: st.st_uid,
            gid: st.st_gid,
        }),
        Err(err) => {
            log::debug!("stat {mount_point:?}: {err}");
            None
        }
    }
}

fn space_info(mount_point: &Path) -> Option<SpaceInfo> {
    use nix::sys::statvfs::{FsFlags, statvfs};

    match statvfs(mount_point) {
        Ok(vfs) => Some(SpaceInfo {
            block_size: vfs.block_size() as u64,
            fragment_size: vfs.fragment_size() as u64,
            blocks: vfs.blocks() as u64,
            blocks_free: vfs.blocks_free() as u64,
            blocks_available: vfs.blocks_available() as u64,
            files: vfs.files() as u64,
            files_free: vfs.files_free() as u64,
            read_only: vfs.flags().contains(FsFlags::ST_RDONLY),
        }),
        Err(err) => {
            log::debug!("statvfs {mount_point:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    /// Backend that returns a fixed set of records.
    struct FakeBackend {
        records: Vec<RawMountRecord>,
        escaped: bool,
    }

    impl FakeBackend {
        fn new(records: &[(&str, &str, &str)]) -> Self {
            Self {
                records: records
                    .iter()
                    .map(|(source, mount_point, fstype)| RawMountRecord {
                        source: OsString::from(*source),
                        mount_point: OsString::from(*mount_point),
                        fstype: fstype.to_string(),
                        options: "rw".to_string(),
                    })
                    .collect(),
                escaped: false,
            }
        }
    }

    impl MountRecordBackend for FakeBackend {
        type Records = std::vec::IntoIter<Result<RawMountRecord, MountError>>;

        fn open(&self, _source: Option<&Path>) -> Result<Self::Records, MountError> {
            Ok(self
                .records
                .iter()
                .cloned()
                .map(Ok)
                .collect::<Vec<_>>()
                .into_iter())
        }

        fn escaped(&self) -> bool {
            self.escaped
        }
    }

    /// Backend whose table can't be opened.
    struct BrokenBackend;

    impl MountRecordBackend for BrokenBackend {
        type Records = std::vec::IntoIter<Result<RawMountRecord, MountError>>;

        fn open(&self, source: Option<&Path>) -> Result<Self::Records, MountError> {
            Err(MountError::Open {
                path: source.map(Path::to_path_buf).unwrap_or_default(),
                source: std::io::ErrorKind::PermissionDenied.into(),
            })
        }

        fn escaped(&self) -> bool {
            false
        }
    }

    fn mount_points(list: &MountList) -> Vec<&str> {
        list.iter().map(|e| e.mount_point.to_str().unwrap()).collect()
    }

    #[test]
    fn reverse_order() -> anyhow::Result<()> {
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[
            ("/dev/sda1", "/", "ext4"),
            ("proc", "/proc", "proc"),
            ("tmpfs", "/tmp", "tmpfs"),
        ]));
        let list = builder.build(Some(Path::new("/fake")))?;

        assert_eq!(3, list.len());
        assert_eq!(vec!["/tmp", "/proc", "/"], mount_points(&list));
        assert_eq!("tmpfs", list.get(0).unwrap().source);
        assert_eq!("rw", list.get(2).unwrap().options);

        Ok(())
    }

    #[test]
    fn empty_table() -> anyhow::Result<()> {
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[]));
        let list = builder.build(None)?;

        assert!(list.is_empty());

        Ok(())
    }

    #[test]
    fn open_failure() {
        let builder = MountTableBuilder::with_backend(BrokenBackend);

        assert!(matches!(
            builder.build(Some(Path::new("/fake"))),
            Err(MountError::Open { .. })
        ));
    }

    #[test]
    fn decode_escaped_records() -> anyhow::Result<()> {
        let mut backend = FakeBackend::new(&[("my\\040disk", "/mnt/a\\040b", "ext4")]);
        backend.escaped = true;
        let list = MountTableBuilder::with_backend(backend).build(Some(Path::new("/fake")))?;

        let entry = list.get(0).unwrap();
        assert_eq!(Path::new("/mnt/a b"), entry.mount_point);
        assert_eq!("my disk", entry.source);

        Ok(())
    }

    #[test]
    fn keep_unescaped_records() -> anyhow::Result<()> {
        let backend = FakeBackend::new(&[("my\\040disk", "/mnt/a\\040b", "ext4")]);
        let list = MountTableBuilder::with_backend(backend).build(Some(Path::new("/fake")))?;

        let entry = list.get(0).unwrap();
        assert_eq!(Path::new("/mnt/a\\040b"), entry.mount_point);
        assert_eq!("my\\040disk", entry.source);

        Ok(())
    }

    #[test]
    fn inspect_live_table() -> anyhow::Result<()> {
        let tempdir = TempDir::new()?;
        let dir = tempdir.path().to_str().unwrap();
        let missing = tempdir.path().join("missing");
        let missing = missing.to_str().unwrap();
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[
            ("/dev/sda1", dir, "ext4"),
            ("/dev/sdb1", missing, "ext4"),
            ("/dev/sdc1", dir, "ext4"),
        ]));
        let list = builder.build(None)?;

        assert_eq!(3, list.len());
        assert_eq!(vec![dir, missing, dir], mount_points(&list));

        let first = list.get(0).unwrap();
        assert!(first.stat_info.is_some());
        assert!(first.space_info.is_some());

        let broken = list.get(1).unwrap();
        assert_eq!(None, broken.stat_info);
        assert_eq!(None, broken.space_info);

        assert!(list.get(2).unwrap().stat_info.is_some());

        Ok(())
    }

    #[test]
    fn no_inspection_on_alternate_table() -> anyhow::Result<()> {
        let tempdir = TempDir::new()?;
        let dir = tempdir.path().to_str().unwrap();
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[("/dev/sda1", dir, "ext4")]));
        let list = builder.build(Some(Path::new("/fake")))?;

        let entry = list.get(0).unwrap();
        assert_eq!(None, entry.stat_info);
        assert_eq!(None, entry.space_info);

        Ok(())
    }

    #[test]
    fn filter_types() -> anyhow::Result<()> {
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[
            ("/dev/sda1", "/", "ext4"),
            ("proc", "/proc", "proc"),
            ("/dev/sdb1", "/boot", "vfat"),
        ]));
        let list = builder.build(Some(Path::new("/fake")))?;

        let selected = list.filter_types(Some("noproc"))?;
        assert_eq!(
            vec!["/boot", "/"],
            selected
                .iter()
                .map(|e| e.mount_point.to_str().unwrap())
                .collect::<Vec<_>>()
        );
        assert_eq!(3, list.filter_types(None)?.len());
        assert!(list.filter_types(Some("noproc,ext4")).is_err());

        Ok(())
    }

    #[test]
    fn containing_finds_topmost() -> anyhow::Result<()> {
        let tempdir = TempDir::new()?;
        let dir = tempdir.path().to_str().unwrap();
        let file = tempdir.path().join("file");
        std::fs::write(&file, "test")?;
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[
            ("/dev/under", dir, "ext4"),
            ("/dev/over", dir, "tmpfs"),
        ]));
        let list = builder.build(None)?;

        assert_eq!("/dev/over", list.containing(&file).unwrap().source);
        assert_eq!(None, list.containing(&PathBuf::from(dir).join("missing")));

        Ok(())
    }

    #[test]
    fn containing_needs_stat_info() -> anyhow::Result<()> {
        let tempdir = TempDir::new()?;
        let dir = tempdir.path().to_str().unwrap();
        let builder = MountTableBuilder::with_backend(FakeBackend::new(&[("/dev/sda1", dir, "ext4")]));
        let list = builder.build(Some(Path::new("/fake")))?;

        assert_eq!(None, list.containing(tempdir.path()));

        Ok(())
    }

    #[test]
    fn space_info_sizes() {
        let info = SpaceInfo {
            block_size: 4096,
            fragment_size: 1024,
            blocks: 100,
            blocks_free: 40,
            blocks_available: 30,
            files: 10,
            files_free: 5,
            read_only: false,
        };

        assert_eq!(102400, info.total_bytes());
        assert_eq!(61440, info.used_bytes());
        assert_eq!(30720, info.available_bytes());
    }
}
