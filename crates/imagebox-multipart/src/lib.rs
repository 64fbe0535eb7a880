//! Binary-safe extraction of a single file field from a
//! `multipart/form-data` body.
//!
//! The body is never decoded as text: it is split on the raw delimiter
//! bytes, only the per-part header blocks are read as (lossy) UTF-8, and the
//! file payload is returned as the exact byte range it occupied on the wire.
//!
//! ```
//! let body = b"--xyz\r\n\
//! Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
//! \r\n\
//! \x89PNG\r\n\
//! --xyz--\r\n";
//!
//! let part = imagebox_multipart::extract(body, "multipart/form-data; boundary=xyz").unwrap();
//! assert_eq!(part.filename, "a.png");
//! assert_eq!(part.content_type, "image/png");
//! assert_eq!(part.payload, b"\x89PNG");
//! ```

mod body;
mod boundary;
mod mime;
mod part;

pub use body::{DecodeError, RawBody};
pub use boundary::{boundary, is_form_data};
pub use mime::{guess_content_type, OCTET_STREAM};
pub use part::{disposition_param, PartHeaders};

use memchr::memmem;
use thiserror::Error;

/// The first file field found in a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name, when the part declares one.
    pub name: Option<String>,
    pub filename: String,
    /// Declared `Content-Type`, or a guess from the filename extension.
    pub content_type: String,
    /// Exact file bytes with all multipart framing removed.
    pub payload: Vec<u8>,
}

/// Why no file could be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The `Content-Type` header carries no `boundary=` parameter.
    #[error("Content-Type header has no boundary parameter")]
    NoBoundary,

    /// No part in the body declares a filename.
    #[error("no file part found in multipart body")]
    NotFound,
}

/// Extract the first file part from a multipart body.
///
/// Parts without a blank line after their headers, or without a non-empty
/// `filename` in `Content-Disposition`, are skipped. Never panics on
/// malformed input.
pub fn extract(body: &[u8], content_type: &str) -> Result<FilePart, ExtractError> {
    let token = boundary(content_type).ok_or(ExtractError::NoBoundary)?;
    let delimiter = boundary::delimiter(token);

    segments(body, &delimiter)
        .into_iter()
        .find_map(file_part)
        .ok_or(ExtractError::NotFound)
}

/// One part's bytes between two delimiters.
struct Segment<'a> {
    bytes: &'a [u8],
    /// Followed by another delimiter, so the last line terminator is framing.
    terminated: bool,
    /// The opening delimiter line ended in CRLF rather than a bare LF.
    crlf: bool,
}

/// Split `body` into the parts between delimiters.
///
/// A delimiter only counts at the start of the body or right after a line
/// feed, and must be followed by `--`, a line terminator, linear whitespace
/// or the end of the body. The preamble before the first delimiter and
/// everything after the closing `--delimiter--` are dropped.
fn segments<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<Segment<'a>> {
    let marks: Vec<usize> = memmem::find_iter(body, delimiter)
        .filter(|&at| is_delimiter_line(body, at, delimiter.len()))
        .collect();

    let mut out = Vec::with_capacity(marks.len());
    for (i, &at) in marks.iter().enumerate() {
        let start = at + delimiter.len();
        if body[start..].starts_with(b"--") {
            break;
        }
        let crlf = is_crlf_line(&body[start..]);
        match marks.get(i + 1) {
            Some(&next) => out.push(Segment {
                bytes: &body[start..next],
                terminated: true,
                crlf,
            }),
            None => out.push(Segment {
                bytes: strip_closing_remnant(&body[start..], delimiter, crlf),
                terminated: false,
                crlf,
            }),
        }
    }
    out
}

fn is_delimiter_line(body: &[u8], at: usize, len: usize) -> bool {
    if at > 0 && body[at - 1] != b'\n' {
        return false;
    }
    match &body[at + len..] {
        [] => true,
        [b'-', b'-', ..] => true,
        [b'\r' | b'\n' | b' ' | b'\t', ..] => true,
        _ => false,
    }
}

/// Whether the rest of a delimiter line (after optional padding) ends in CRLF.
fn is_crlf_line(after_delimiter: &[u8]) -> bool {
    after_delimiter
        .iter()
        .skip_while(|&&b| b == b' ' || b == b'\t')
        .take(2)
        .eq(b"\r\n")
}

/// For a body whose closing delimiter was not recognised as a line of its
/// own, drop a trailing `--delimiter--` (and the line terminator before it).
fn strip_closing_remnant<'a>(tail: &'a [u8], delimiter: &[u8], crlf: bool) -> &'a [u8] {
    let trimmed = trim_line_end(tail, crlf);
    let Some(rest) = trimmed.strip_suffix(b"--".as_slice()) else {
        return tail;
    };
    match rest.strip_suffix(delimiter) {
        Some(before) => trim_line_end(before, crlf),
        None => tail,
    }
}

/// Remove exactly one trailing line terminator in the part's framing style.
///
/// Under LF framing a `\r` before the final `\n` is content and is kept.
fn trim_line_end(bytes: &[u8], crlf: bool) -> &[u8] {
    let crlf_end = if crlf {
        bytes.strip_suffix(b"\r\n".as_slice())
    } else {
        None
    };
    crlf_end
        .or_else(|| bytes.strip_suffix(b"\n".as_slice()))
        .unwrap_or(bytes)
}

/// Remove the rest of the delimiter line: optional padding, then CRLF or LF.
fn trim_line_start(bytes: &[u8]) -> &[u8] {
    let padding = bytes
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    let bytes = &bytes[padding..];
    bytes
        .strip_prefix(b"\r\n".as_slice())
        .or_else(|| bytes.strip_prefix(b"\n".as_slice()))
        .unwrap_or(bytes)
}

fn file_part(segment: Segment<'_>) -> Option<FilePart> {
    let (head, body) = part::split_headers(trim_line_start(segment.bytes))?;

    let headers = PartHeaders::parse(head);
    let disposition = headers.get("content-disposition")?;
    let filename = disposition_param(disposition, "filename").filter(|f| !f.is_empty())?;

    let content_type = headers
        .get("content-type")
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| guess_content_type(filename));

    let payload = if segment.terminated {
        trim_line_end(body, segment.crlf)
    } else {
        body
    };

    Some(FilePart {
        name: disposition_param(disposition, "name").map(String::from),
        filename: filename.to_owned(),
        content_type: content_type.to_owned(),
        payload: payload.to_vec(),
    })
}
