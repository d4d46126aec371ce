use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Path of the live mount table, used unless another one is configured.
pub const DEFAULT_MOUNT_TABLE: &str = "/proc/mounts";

/// Top-level configuration, usually read from a TOML file.
#[derive(Clone, serde::Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub mounts: MountsConfig,
    pub notify: NotifyConfig,
}

#[derive(Clone, serde::Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct MountsConfig {
    /// Live mount table.
    ///
    /// Only meaningful for backends that read a table file. Tables
    /// passed explicitly to [crate::mount::MountTableBuilder::build]
    /// are treated as alternate sources, even if they happen to be
    /// the same file.
    pub table: PathBuf,

    /// Type list applied when none is given on the command line.
    ///
    /// See [crate::mount::types::matches] for the syntax.
    pub types: Option<String>,
}

impl Default for MountsConfig {
    fn default() -> Self {
        Self {
            table: PathBuf::from(DEFAULT_MOUNT_TABLE),
            types: None,
        }
    }
}

#[derive(Clone, serde::Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct NotifyConfig {
    /// Maximum number of registrations of a multiplexer.
    ///
    /// If unset, sized to the files to watch, see
    /// [NotifyConfig::capacity_for].
    pub capacity: Option<usize>,
}

impl NotifyConfig {
    /// Capacity of a multiplexer that is to watch `count` files.
    ///
    /// This is the configured capacity, if any, `count` otherwise.
    pub fn capacity_for(&self, count: usize) -> usize {
        self.capacity.unwrap_or(count)
    }
}

/// Error loading a [Config].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Read configuration from a TOML file.
    ///
    /// Missing sections and fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
