//! Mapping between store keys and value file names.
//!
//! Keys are arbitrary strings; file names must not contain path separators
//! or other bytes a file system may reject. Keys are written with URL
//! path-segment escaping: unreserved bytes pass through, everything else
//! becomes `%XX`.

use crate::error::TypeError;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn is_kept(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b'$' | b'&' | b'+' | b',' | b':' | b';' | b'=' | b'@'
        )
}

/// Escape a key into a file-name-safe string.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key.as_bytes() {
        if is_kept(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
        }
    }
    out
}

/// Reverse [`escape_key`].
///
/// Fails on truncated or non-hex `%` sequences and on escapes that do not
/// decode to UTF-8.
pub fn unescape_key(escaped: &str) -> Result<String, TypeError> {
    let malformed = || TypeError::MalformedEscape(escaped.to_string());
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let pair = bytes.get(i + 1..i + 3).ok_or_else(malformed)?;
            let pair = std::str::from_utf8(pair).map_err(|_| malformed())?;
            let byte = u8::from_str_radix(pair, 16).map_err(|_| malformed())?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| malformed())
}
