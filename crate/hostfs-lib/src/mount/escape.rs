/// Decode backslash-octal escapes, as found in mount tables.
///
/// Mount tables write whitespace and backslashes in paths as `\040`,
/// `\011`, `\012` or `\134`. A backslash followed by exactly three
/// octal digits is replaced by the byte they encode; any other
/// backslash is kept as-is.
///
/// Works on bytes, as paths need not be valid UTF-8.
pub(crate) fn decode(bytes: &[u8]) -> Vec<u8> {
    if !bytes.contains(&b'\\') {
        return bytes.to_vec();
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some(b) = octal_byte(&bytes[i + 1..]) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

/// Value of the three octal digits at the start of `digits`, if any.
///
/// Values over 0o377 keep their low 8 bits.
fn octal_byte(digits: &[u8]) -> Option<u8> {
    let digits = digits.get(..3)?;
    let mut value: u32 = 0;
    for d in digits {
        if !(b'0'..=b'7').contains(d) {
            return None;
        }
        value = (value << 3) | u32::from(d - b'0');
    }

    Some(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(s: &str) -> String {
        String::from_utf8(decode(s.as_bytes())).unwrap()
    }

    #[test]
    fn decode_space_and_backslash() {
        assert_eq!(" ", decode_str("\\040"));
        assert_eq!("\\", decode_str("\\134"));
        assert_eq!("/mnt/my disk", decode_str("/mnt/my\\040disk"));
        assert_eq!("a\tb\nc", decode_str("a\\011b\\012c"));
    }

    #[test]
    fn keep_incomplete_escapes() {
        assert_eq!("\\4x", decode_str("\\4x"));
        assert_eq!("\\04", decode_str("\\04"));
        assert_eq!("end\\", decode_str("end\\"));
        assert_eq!("\\089", decode_str("\\089"));
        assert_eq!("\\\\", decode_str("\\\\"));
    }

    #[test]
    fn resume_after_escape() {
        assert_eq!(" 1", decode_str("\\0401"));
        assert_eq!("\\ ", decode_str("\\134\\040"));
        assert_eq!("\\040", decode_str("\\134040"));
    }

    #[test]
    fn no_escape() {
        assert_eq!("/home", decode_str("/home"));
        assert_eq!("", decode_str(""));
    }

    #[test]
    fn keep_non_utf8_bytes() {
        assert_eq!(decode(b"\\377"), [0xffu8]);
        assert_eq!(decode(b"/mnt/caf\\351"), b"/mnt/caf\xe9");
        assert_eq!(decode(b"/mnt/caf\xe9\\040x"), b"/mnt/caf\xe9 x");
        assert_eq!("é", decode_str("\\303\\251"));
    }

    #[test]
    fn large_values_wrap() {
        assert_eq!("A", decode_str("\\501"));
    }
}
