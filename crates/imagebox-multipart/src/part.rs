//! Per-part framing: header/body split, header parsing and
//! `Content-Disposition` parameters.

use memchr::memmem;

/// Headers of a single part, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: Vec<(String, String)>,
}

impl PartHeaders {
    /// Parse a header block. Invalid UTF-8 is replaced, never rejected;
    /// lines without a `:` are ignored and folded lines are joined to the
    /// previous header.
    pub fn parse(block: &[u8]) -> Self {
        let text = String::from_utf8_lossy(block);
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with(|c: char| c == ' ' || c == '\t') {
                if let Some((_, value)) = entries.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                entries.push((name.trim().to_owned(), value.trim().to_owned()));
            }
        }

        Self { entries }
    }

    /// First value of the named header, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split a part into its header block and body at the first blank line.
///
/// Both `\r\n\r\n` and `\n\n` are accepted; whichever comes first wins.
/// Returns `None` when the part has no blank line.
pub(crate) fn split_headers(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = memmem::find(part, b"\r\n\r\n").map(|at| (at, 4));
    let lf = memmem::find(part, b"\n\n").map(|at| (at, 2));

    let (at, sep_len) = match (crlf, lf) {
        (Some(c), Some(l)) => {
            if l.0 < c.0 {
                l
            } else {
                c
            }
        }
        (Some(c), None) => c,
        (None, Some(l)) => l,
        (None, None) => return None,
    };

    Some((&part[..at], &part[at + sep_len..]))
}

/// Look up a `Content-Disposition` parameter such as `name` or `filename`.
///
/// Parameters are walked in order, separated by `;` or whitespace. A
/// double-quoted value is returned without its quotes and may itself contain
/// `;`, spaces or `name=` text; otherwise the value runs to the next `;` or
/// whitespace. Names compare case-insensitively and must match whole, so
/// looking up `name` never matches `filename`.
pub fn disposition_param<'a>(disposition: &'a str, param: &str) -> Option<&'a str> {
    let bytes = disposition.as_bytes();
    let is_separator = |b: u8| matches!(b, b';' | b' ' | b'\t');
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && is_separator(bytes[i]) {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !is_separator(bytes[i]) {
            i += 1;
        }
        let name = &disposition[name_start..i];
        if bytes.get(i) != Some(&b'=') {
            // A bare token such as `form-data`.
            continue;
        }
        i += 1;

        let value = if bytes.get(i) == Some(&b'"') {
            let start = i + 1;
            let end = disposition[start..]
                .find('"')
                .map_or(bytes.len(), |at| start + at);
            i = end + 1;
            &disposition[start..end]
        } else {
            let start = i;
            while i < bytes.len() && !is_separator(bytes[i]) {
                i += 1;
            }
            &disposition[start..i]
        };

        if name.eq_ignore_ascii_case(param) {
            return Some(value);
        }
    }
    None
}
