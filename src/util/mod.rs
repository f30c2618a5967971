//! Small helpers shared across the crate.

/// Interpret a byte slice as padded ASCII text: trailing spaces and NULs
/// are trimmed, and non-printable bytes become `.` so that metadata from
/// damaged volumes stays displayable.
pub fn ascii_trimmed(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| *b != b' ' && *b != 0)
        .map_or(0, |i| i + 1);
    bytes[..end]
        .iter()
        .map(|b| {
            if b.is_ascii_graphic() || *b == b' ' {
                *b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// Format a buffer as a conventional hex dump: 16 bytes per line with an
/// ASCII gutter.
pub fn hexdump(buffer: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in buffer.chunks(16).enumerate() {
        out.push_str(&format!("{:06x}  ", i * 16));
        for j in 0..16 {
            match chunk.get(j) {
                Some(b) => out.push_str(&format!("{:02x} ", b)),
                None => out.push_str("   "),
            }
            if j == 7 {
                out.push(' ');
            }
        }
        out.push(' ');
        for b in chunk {
            out.push(if b.is_ascii_graphic() || *b == b' ' {
                *b as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_trimmed() {
        assert_eq!(ascii_trimmed(b"RSX11M      "), "RSX11M");
        assert_eq!(ascii_trimmed(b"A B\0\0"), "A B");
        assert_eq!(ascii_trimmed(b"\0\0\0\0"), "");
        assert_eq!(ascii_trimmed(b"AB\x01CD"), "AB.CD");
    }

    #[test]
    fn test_hexdump_shape() {
        let dump = hexdump(b"0123456789abcdef0");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("000000  30 31"));
        assert!(lines[0].ends_with("0123456789abcdef"));
        assert!(lines[1].starts_with("000010  30"));
    }
}
