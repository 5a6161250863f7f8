//! Static header data shared by every response the relay emits.
//!
//! The CORS set and the MIME to extension table are read-only and built once;
//! nothing here is mutated after startup.

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use once_cell::sync::Lazy;

pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, HEAD, OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
    ("access-control-max-age", "86400"),
];

/// Upstream headers that leak origin infrastructure or contradict the relayed response.
pub const STRIPPED_HEADERS: &[&str] = &[
    "set-cookie",
    "cf-ray",
    "alt-svc",
    "vary",
    "etag",
    "content-encoding",
    "accept-ranges",
];

/// Connection-scoped headers; they describe the upstream hop, not the file.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Extensions for the MIME types MediaFire commonly serves.
pub static MIME_EXTENSIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("application/zip", "zip"),
        ("application/x-zip-compressed", "zip"),
        ("application/x-rar-compressed", "rar"),
        ("application/vnd.rar", "rar"),
        ("application/x-7z-compressed", "7z"),
        ("application/pdf", "pdf"),
        ("application/msword", "doc"),
        (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        ),
        ("application/vnd.ms-excel", "xls"),
        (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xlsx",
        ),
        ("application/vnd.ms-powerpoint", "ppt"),
        (
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "pptx",
        ),
        ("application/vnd.android.package-archive", "apk"),
        ("application/x-msdownload", "exe"),
        ("application/x-iso9660-image", "iso"),
        ("application/x-apple-diskimage", "dmg"),
        ("application/vnd.debian.binary-package", "deb"),
        ("application/x-rpm", "rpm"),
        ("application/gzip", "gz"),
        ("application/x-gzip", "gz"),
        ("application/x-bzip2", "bz2"),
        ("application/x-xz", "xz"),
        ("application/x-tar", "tar"),
        ("video/mp4", "mp4"),
        ("video/x-matroska", "mkv"),
        ("video/webm", "webm"),
        ("video/quicktime", "mov"),
        ("video/x-msvideo", "avi"),
        ("audio/mpeg", "mp3"),
        ("audio/mp4", "m4a"),
        ("audio/wav", "wav"),
        ("audio/ogg", "ogg"),
        ("audio/flac", "flac"),
        ("image/jpeg", "jpg"),
        ("image/png", "png"),
        ("image/gif", "gif"),
        ("image/webp", "webp"),
        ("text/plain", "txt"),
    ])
});

/// Insert the full CORS set, replacing whatever was there.
pub fn apply_cors(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(*name),
            HeaderValue::from_static(*value),
        );
    }
}

/// 204 answer for any `OPTIONS` request.
pub fn preflight_response() -> Response {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::NO_CONTENT;
    apply_cors(resp.headers_mut());
    resp
}

pub fn strip_upstream_headers(headers: &mut HeaderMap) {
    for name in STRIPPED_HEADERS.iter().chain(HOP_BY_HOP_HEADERS) {
        headers.remove(*name);
    }
}
