use super::{MountRecordBackend, RawMountRecord};
use crate::config::MountsConfig;
use crate::errors::MountError;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::ffi::OsStringExt as _;
use std::path::{Path, PathBuf};

/// Reads mount records from a mount table file, such as `/proc/mounts`
/// or `/etc/fstab`.
///
/// Each line of the table describes a filesystem with space- or
/// tab-separated fields: source, mount point, type, options, then
/// fields that are ignored here. Whitespace and backslashes within
/// fields are octal-escaped.
#[derive(Debug, Clone)]
pub struct MountTableBackend {
    live_table: PathBuf,
}

impl MountTableBackend {
    pub fn new(config: &MountsConfig) -> Self {
        Self::with_live_table(&config.table)
    }

    pub fn with_live_table(live_table: &Path) -> Self {
        Self {
            live_table: live_table.to_path_buf(),
        }
    }
}

impl MountRecordBackend for MountTableBackend {
    type Records = MountTableReader;

    fn open(&self, source: Option<&Path>) -> Result<MountTableReader, MountError> {
        MountTableReader::open(source.unwrap_or(&self.live_table))
    }

    fn escaped(&self) -> bool {
        true
    }
}

/// Iterator over the records of a mount table, read one line at a time.
pub struct MountTableReader {
    path: PathBuf,
    reader: BufReader<File>,
    line: Vec<u8>,
    lineno: usize,
    failed: bool,
}

impl MountTableReader {
    fn open(path: &Path) -> Result<Self, MountError> {
        let file = File::open(path).map_err(|source| MountError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("reading mount table {path:?}");

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line: Vec::new(),
            lineno: 0,
            failed: false,
        })
    }
}

impl Iterator for MountTableReader {
    type Item = Result<RawMountRecord, MountError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    self.failed = true;
                    return Some(Err(MountError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
            self.lineno += 1;

            let line = self.line.trim_ascii();
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }
            match parse_record(line) {
                Some(record) => return Some(Ok(record)),
                None => {
                    log::warn!(
                        "{}:{}: ignoring incomplete mount record",
                        self.path.display(),
                        self.lineno
                    );
                }
            }
        }
    }
}

/// Parse a line of a mount table.
///
/// Returns `None` unless there's at least a source, a mount point and a
/// type. Options may be missing.
///
/// Source and mount point are kept as raw bytes; type and options are
/// expected to be ASCII.
fn parse_record(line: &[u8]) -> Option<RawMountRecord> {
    let mut fields = line
        .split(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .filter(|f| !f.is_empty());

    let source = fields.next()?;
    let mount_point = fields.next()?;
    let fstype = fields.next()?;
    let options = fields.next().unwrap_or_default();

    Some(RawMountRecord {
        source: OsString::from_vec(source.to_vec()),
        mount_point: OsString::from_vec(mount_point.to_vec()),
        fstype: String::from_utf8_lossy(fstype).into_owned(),
        options: String::from_utf8_lossy(options).into_owned(),
    })
}
