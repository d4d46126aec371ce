use super::MountEntry;
use crate::errors::TypeListError;

/// Check whether the filesystem type of `entry` is selected by a type
/// list.
///
/// A type list is a comma-separated list of filesystem types, such as
/// `ext4,vfat`, which selects only the listed types, or, if it starts
/// with `no`, a list of types to exclude, such as `noproc,nosysfs`,
/// which selects everything else. Inclusion and exclusion can't be
/// mixed: when the first type starts with `no`, all others must, and
/// when it doesn't, none of the others may. Mixed lists are rejected
/// with [TypeListError].
///
/// Types are compared in full; `ext` doesn't select `ext4`.
///
/// Without type list, everything is selected.
pub fn matches(entry: &MountEntry, types: Option<&str>) -> Result<bool, TypeListError> {
    let types = match types {
        Some(types) => types,
        None => return Ok(true),
    };

    let mut tokens = types.split(',').filter(|t| !t.is_empty()).peekable();
    let exclude = tokens.peek().is_some_and(|t| t.starts_with("no"));

    // The whole list is checked, even after a match, so that a bad
    // list is reported whatever the entry.
    let mut found = false;
    for token in tokens {
        let fstype = match (exclude, token.strip_prefix("no")) {
            (true, Some(fstype)) => fstype,
            (false, None) => token,
            _ => {
                return Err(TypeListError {
                    token: token.to_string(),
                });
            }
        };
        if fstype == entry.fstype {
            found = true;
        }
    }

    Ok(found != exclude)
}
