use crate::print_warning;
use hostfs_lib::config::Config;
use hostfs_lib::mount::{MountEntry, MountTableBuilder, SpaceInfo};
use indicatif::HumanBytes;
use std::path::{Path, PathBuf};

/// Print mounted filesystems, in the format of mount(8).
pub(crate) fn list(
    config: &Config,
    table: Option<&Path>,
    types: Option<&str>,
) -> anyhow::Result<i32> {
    let list = MountTableBuilder::new(&config.mounts).build(table)?;
    for entry in list.filter_types(types)? {
        println!(
            "{} on {} type {} ({})",
            entry.source.to_string_lossy(),
            entry.mount_point.display(),
            entry.fstype,
            entry.options
        );
    }

    Ok(0)
}

/// Print space usage of mounted filesystems, in the format of df(1).
///
/// With paths, only report the filesystems that contain them, in the
/// order of the paths. Fails with status 1 if the filesystem of a path
/// cannot be found.
pub(crate) fn df(
    config: &Config,
    types: Option<&str>,
    all: bool,
    human: bool,
    paths: &[PathBuf],
) -> anyhow::Result<i32> {
    let list = MountTableBuilder::new(&config.mounts).build(None)?;
    let selected = list.filter_types(types)?;

    println!("{}", header(human));
    if paths.is_empty() {
        for entry in selected {
            if let Some(space) = &entry.space_info {
                if all || space.blocks > 0 {
                    println!("{}", usage_line(entry, space, human));
                }
            }
        }

        return Ok(0);
    }

    let mut status = 0;
    for path in paths {
        let entry = list
            .containing(path)
            .filter(|e| selected.iter().any(|s| std::ptr::eq(*s, *e)));
        match entry.and_then(|e| e.space_info.as_ref().map(|s| (e, s))) {
            Some((entry, space)) => println!("{}", usage_line(entry, space, human)),
            None => {
                print_warning(&format!("{}: no filesystem found", path.display()));
                status = 1;
            }
        }
    }

    Ok(status)
}

fn header(human: bool) -> String {
    format!(
        "{:<20} {:>10} {:>10} {:>10} {:>4} Mounted on",
        "Filesystem",
        if human { "Size" } else { "1K-blocks" },
        "Used",
        "Available",
        "Use%"
    )
}

fn usage_line(entry: &MountEntry, space: &SpaceInfo, human: bool) -> String {
    let size = |bytes: u64| {
        if human {
            HumanBytes(bytes).to_string()
        } else {
            (bytes / 1024).to_string()
        }
    };

    format!(
        "{:<20} {:>10} {:>10} {:>10} {:>4} {}",
        entry.source.to_string_lossy(),
        size(space.total_bytes()),
        size(space.used_bytes()),
        size(space.available_bytes()),
        use_percent(space),
        entry.mount_point.display()
    )
}

/// Share of the space usable by unprivileged users that is in use,
/// rounded up.
fn use_percent(space: &SpaceInfo) -> String {
    let used = u128::from(space.blocks.saturating_sub(space.blocks_free));
    let usable = used + u128::from(space.blocks_available);
    if usable == 0 {
        return "-".to_string();
    }

    format!("{}%", (used * 100).div_ceil(usable))
}
