use std::io;
use std::path::PathBuf;

/// Failure to enumerate mounted filesystems.
///
/// There is no partial result: when this is returned, no
/// [crate::mount::MountList] was built.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("cannot open mount table {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read mount table {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: alternate mount tables are not supported on this platform", .0.display())]
    AlternateSource(PathBuf),

    #[error("cannot list mounted filesystems: {0}")]
    Snapshot(#[source] io::Error),
}

/// A type list mixes inclusion and exclusion tokens.
///
/// Either every token of a list starts with `no`, or none does.
/// `token` is the first one that doesn't follow the first token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad type list: cannot mix \"no\" and plain types: {token:?}")]
pub struct TypeListError {
    pub token: String,
}

/// Errors returned by [crate::notify::NotifyMultiplexer].
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification backend unavailable: {0}")]
    BackendUnavailable(#[source] io::Error),

    #[error("cannot watch more than {capacity} files")]
    Capacity { capacity: usize },

    #[error("cannot watch {}: {source}", path.display())]
    Registration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl NotifyError {
    /// Fatal errors are caller or environment bugs; the others only
    /// concern a single registration and leave the multiplexer usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, NotifyError::Registration { .. })
    }
}

impl From<nix::errno::Errno> for MountError {
    fn from(errno: nix::errno::Errno) -> Self {
        MountError::Snapshot(errno.into())
    }
}
