//! MIME type derivation for attachment records.
//!
//! The filename is the contract: an attachment's type is derived from its
//! extension at creation time. Magic-byte sniffing (`infer`) only fills in
//! when the extension is unknown, and `application/octet-stream` is the
//! final fallback.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::defaults::FALLBACK_MIME;

/// Extension → MIME table. Text formats are listed bare; the charset suffix
/// is appended uniformly for every `text/*` result.
static EXTENSION_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Plain text
        ("txt", "text/plain"),
        ("log", "text/plain"),
        ("csv", "text/csv"),
        ("md", "text/markdown"),
        ("markdown", "text/markdown"),
        ("rst", "text/x-rst"),
        ("ics", "text/calendar"),
        // Markup / structured
        ("html", "text/html"),
        ("htm", "text/html"),
        ("xml", "application/xml"),
        ("json", "application/json"),
        ("yaml", "application/yaml"),
        ("yml", "application/yaml"),
        ("toml", "application/toml"),
        // Documents
        ("pdf", "application/pdf"),
        ("rtf", "application/rtf"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("xls", "application/vnd.ms-excel"),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        ("ppt", "application/vnd.ms-powerpoint"),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        ("odt", "application/vnd.oasis.opendocument.text"),
        // Images
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("bmp", "image/bmp"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("ico", "image/x-icon"),
        ("svg", "image/svg+xml"),
        // Archives
        ("zip", "application/zip"),
        ("gz", "application/gzip"),
        ("tar", "application/x-tar"),
        ("7z", "application/x-7z-compressed"),
        ("rar", "application/x-rar-compressed"),
        ("bz2", "application/x-bzip2"),
        // Audio / video
        ("mp3", "audio/mpeg"),
        ("wav", "audio/wav"),
        ("ogg", "audio/ogg"),
        ("flac", "audio/flac"),
        ("mp4", "video/mp4"),
        ("mpeg", "video/mpeg"),
        ("mpg", "video/mpeg"),
        ("mov", "video/quicktime"),
        ("avi", "video/x-msvideo"),
        ("webm", "video/webm"),
        ("mkv", "video/x-matroska"),
        // Mail
        ("eml", "message/rfc822"),
        // Raw
        ("bin", "application/octet-stream"),
    ])
});

/// Derive a MIME type for an attachment from its filename, falling back to
/// magic-byte detection of the payload for unknown extensions.
///
/// `text/*` results always carry `; charset=utf-8`.
pub fn detect_mime(filename: &str, payload: &[u8]) -> String {
    if let Some(ext) = filename.rsplit('.').next() {
        if let Some(mime) = EXTENSION_TABLE.get(ext.to_lowercase().as_str()) {
            return with_charset(mime);
        }
    }

    if let Some(kind) = infer::get(payload) {
        return with_charset(kind.mime_type());
    }

    FALLBACK_MIME.to_string()
}

fn with_charset(mime: &str) -> String {
    if mime.starts_with("text/") {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}
