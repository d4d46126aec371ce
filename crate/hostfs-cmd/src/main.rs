use anyhow::Context as _;
use clap::{Parser, Subcommand};
use console::style;
use hostfs_lib::config::Config;
use hostfs_lib::utils::logging;
use std::path::PathBuf;
use std::process;

mod mounts_cmd;
mod watch_cmd;

/// Inspect mounted filesystems and follow file modifications.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// Sets the mount table to read, the default type list and the
    /// maximum number of files to watch. Built-in defaults apply
    /// when unset.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more. Repeat for more details.
    ///
    /// Logging can be further configured by setting the env var
    /// RUST_LOG. For a systemd-friendly output format, set the env
    /// var RUST_LOG_FORMAT=SYSTEMD
    #[arg(short, long, action = clap::ArgAction::Count, global = true, verbatim_doc_comment)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List mounted filesystems, last mounted first.
    Mounts {
        /// Read this mount table instead of the live one.
        ///
        /// Mount points are not inspected when reading an alternate
        /// table.
        #[arg(long)]
        table: Option<PathBuf>,

        /// Only list filesystems of these types.
        ///
        /// Comma-separated list, such as "ext4,vfat". Prefix all types
        /// with "no" to list all but these types, such as
        /// "noproc,nosysfs".
        #[arg(short = 't', long)]
        types: Option<String>,
    },

    /// Report filesystem disk space usage.
    Df {
        /// Only report filesystems of these types.
        ///
        /// Same syntax as for the mounts command.
        #[arg(short = 't', long)]
        types: Option<String>,

        /// Include filesystems of size 0.
        #[arg(short, long)]
        all: bool,

        /// Print sizes in human readable format, instead of 1K blocks.
        #[arg(short = 'H', long)]
        human: bool,

        /// Report the filesystems containing these paths.
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// Output data appended to files, as it is written.
    Watch {
        /// Files to follow.
        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let status = match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            print_error(&format!("{err:#}"));

            1
        }
    };
    process::exit(status);
}

fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load(path).context("failed to read TOML config file")?,
        None => Config::default(),
    };
    log::debug!("config: {config:?}");

    match &cli.command {
        Command::Mounts { table, types } => mounts_cmd::list(
            &config,
            table.as_deref(),
            types.as_deref().or(config.mounts.types.as_deref()),
        ),
        Command::Df {
            types,
            all,
            human,
            paths,
        } => mounts_cmd::df(
            &config,
            types.as_deref().or(config.mounts.types.as_deref()),
            *all,
            *human,
            paths,
        ),
        Command::Watch { files } => watch_cmd::follow(&config, files),
    }
}

fn print_warning(msg: &str) {
    eprintln!("{}: {}", style("WARNING").for_stderr().red(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{}: {}", style("ERROR").for_stderr().red().bold(), msg);
}
