//! `boundary=` parameter handling for `multipart/form-data` content types.

/// Extract the boundary token from a `Content-Type` header value.
///
/// The parameter name is matched case-insensitively. The token runs to the
/// next `;` or the end of the header; surrounding whitespace and double
/// quotes are removed. Returns `None` when the parameter is absent or empty.
pub fn boundary(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .map(|v| v.strip_suffix('"').unwrap_or(v))
            .unwrap_or(value)
            .trim_end();
        (!value.is_empty()).then_some(value)
    })
}

/// Whether the header names `multipart/form-data` as its media type.
pub fn is_form_data(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("multipart/form-data"))
}

/// Build the wire delimiter (`--` followed by the token) as raw bytes.
///
/// The token's bytes are copied as-is; no text encoding pass touches the
/// body that is later split on this delimiter.
pub(crate) fn delimiter(token: &str) -> Vec<u8> {
    let mut v = Vec::with_capacity(token.len() + 2);
    v.extend_from_slice(b"--");
    v.extend_from_slice(token.as_bytes());
    v
}
