//! Value → display string formatting.
//!
//! Two modes, both on raw bytes (kvengine keys/values carry no type tag):
//! - **Human** (default): `"value"`, `(integer) 3`, `(nil)`, lossy UTF-8 with
//!   non-printable bytes escaped as `\xNN`.
//! - **Raw** (`--raw`): bare bytes written straight to stdout, no quoting.

use std::fmt::Write as _;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Raw,
}

/// Escape non-printable / non-ASCII bytes as `\xNN`, everything else as-is.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02x}");
        }
    }
    out
}

pub fn format_value(value: &Option<Vec<u8>>, mode: OutputMode) -> String {
    match (value, mode) {
        (Some(v), OutputMode::Human) => format!("\"{}\"", escape_bytes(v)),
        (Some(v), OutputMode::Raw) => escape_bytes(v),
        (None, OutputMode::Human) => "(nil)".to_string(),
        (None, OutputMode::Raw) => String::new(),
    }
}

pub fn format_bool(b: bool, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("(integer) {}", b as u8),
        OutputMode::Raw => (b as u8).to_string(),
    }
}

pub fn format_count(n: usize, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("(integer) {n}"),
        OutputMode::Raw => n.to_string(),
    }
}

pub fn format_entry(key: &[u8], value: &[u8], mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("\"{}\" -> \"{}\"", escape_bytes(key), escape_bytes(value)),
        OutputMode::Raw => format!("{}\t{}", escape_bytes(key), escape_bytes(value)),
    }
}

pub fn format_error(err: &kvengine::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("(error) {err}"),
        OutputMode::Raw => format!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_non_printable_bytes() {
        assert_eq!(escape_bytes(b"ab\x01c"), "ab\\x01c");
        assert_eq!(escape_bytes(b"hello world"), "hello world");
    }

    #[test]
    fn human_value_is_quoted_raw_is_bare() {
        let v = Some(b"x".to_vec());
        assert_eq!(format_value(&v, OutputMode::Human), "\"x\"");
        assert_eq!(format_value(&v, OutputMode::Raw), "x");
        assert_eq!(format_value(&None, OutputMode::Human), "(nil)");
        assert_eq!(format_value(&None, OutputMode::Raw), "");
    }

    #[test]
    fn bool_and_count_formatting() {
        assert_eq!(format_bool(true, OutputMode::Human), "(integer) 1");
        assert_eq!(format_count(3, OutputMode::Raw), "3");
    }
}
