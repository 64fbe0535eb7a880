//! Fallback content types for parts that do not declare one.

/// Content type used when the extension is unknown or missing.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a content type from a filename's extension.
///
/// Only the last `.`-separated component is considered and compared
/// case-insensitively.
pub fn guess_content_type(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return OCTET_STREAM;
    };
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => OCTET_STREAM,
    }
}
