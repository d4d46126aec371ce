use crate::print_warning;
use anyhow::Context as _;
use hostfs_lib::config::Config;
use hostfs_lib::notify::NotifyMultiplexer;
use std::fs::File;
use std::io::{self, Read as _, Seek as _, SeekFrom, Write as _};
use std::os::fd::{AsRawFd as _, RawFd};
use std::path::{Path, PathBuf};

/// Print data appended to the given files, like `tail -f`.
///
/// Files that can't be opened or watched are reported and skipped.
/// Never returns, unless there's nothing to watch or output fails.
pub(crate) fn follow(config: &Config, paths: &[PathBuf]) -> anyhow::Result<i32> {
    let mut files = vec![];
    for path in paths {
        match open_at_end(path) {
            Ok(file) => files.push((file, path.as_path())),
            Err(err) => print_warning(&format!("{}: {err}", path.display())),
        }
    }

    let mut mux = NotifyMultiplexer::new(config.notify.capacity_for(files.len()))?;
    for (file, path) in &files {
        if let Err(err) = mux.add(file.as_raw_fd(), *path) {
            if err.is_fatal() {
                return Err(err.into());
            }
            print_warning(&err.to_string());
        }
    }
    if mux.is_empty() {
        anyhow::bail!("no file to watch");
    }
    log::info!("watching {} files", mux.len());

    let show_headers = paths.len() > 1;
    let mut last: Option<RawFd> = None;
    let mut stdout = io::stdout().lock();
    loop {
        let (fd, path) = mux.wait();
        let file = match files.iter_mut().find(|(f, _)| f.as_raw_fd() == fd) {
            Some((file, _)) => file,
            None => continue,
        };
        let data = match read_appended(file, path) {
            Ok(data) => data,
            Err(err) => {
                print_warning(&format!("{}: {err}", path.display()));
                continue;
            }
        };
        if data.is_empty() {
            continue;
        }

        if show_headers && last != Some(fd) {
            if last.is_some() {
                writeln!(stdout)?;
            }
            writeln!(stdout, "==> {} <==", path.display())?;
        }
        last = Some(fd);
        stdout.write_all(&data).context("stdout")?;
        stdout.flush().context("stdout")?;
    }
}

fn open_at_end(path: &Path) -> io::Result<File> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(0))?;

    Ok(file)
}

/// Read what was written to `file` since the last call.
///
/// If the file was truncated, start again from the beginning.
fn read_appended(file: &mut File, path: &Path) -> io::Result<Vec<u8>> {
    let pos = file.stream_position()?;
    if file.metadata()?.len() < pos {
        print_warning(&format!("{}: file truncated", path.display()));
        file.seek(SeekFrom::Start(0))?;
    }
    let mut data = vec![];
    file.read_to_end(&mut data)?;

    Ok(data)
}
