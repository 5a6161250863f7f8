//! Picks the name the relayed file is offered under.
//!
//! Order: the upstream `Content-Disposition`, then the share link's path,
//! then [`DEFAULT_FILENAME`]. An extension derived from the upstream
//! `Content-Type` is appended when the chosen name has none.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::headers::MIME_EXTENSIONS;
use crate::link::SourceLink;

pub const DEFAULT_FILENAME: &str = "downloaded_file";

/// Path segments that precede the file hash in a share link.
const FILE_MARKERS: &[&str] = &["file", "file_premium"];

static EXTENDED_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\*\s*=\s*"?([^";]+)"?"#)
        .expect("extended filename pattern is valid")
});

static QUOTED_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*"((?:[^"\\]|\\.)*)""#)
        .expect("quoted filename pattern is valid")
});

static BARE_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*([^";\s]+)"#).expect("bare filename pattern is valid")
});

// <charset>'<language>' prefix of an RFC 5987 value
static CHARSET_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]*'[A-Za-z0-9\-]*'").expect("charset prefix pattern is valid")
});

/// Work out the download name for a relayed file.
#[tracing::instrument(level = "trace", ret)]
pub fn infer_filename(
    content_disposition: Option<&str>,
    source: &SourceLink,
    content_type: &str,
) -> String {
    let name = content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| name_from_share_link(source.as_str()))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let name = match extension_for_mime(content_type) {
        Some(ext) if !has_extension(&name) => with_extension(name, ext),
        _ => name,
    };

    let name = sanitize(&name);
    if name.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        name
    }
}

/// Parse filename from Content-Disposition header.
///
/// `filename*` takes precedence over `filename`; either is percent-decoded.
pub fn parse_content_disposition(content_disposition: &str) -> Option<String> {
    tracing::trace!(content_disposition = %content_disposition, "Parsing Content-Disposition");

    if let Some(caps) = EXTENDED_FILENAME_RE.captures(content_disposition) {
        let raw = caps[1].trim();
        let encoded = CHARSET_PREFIX_RE.replace(raw, "");
        let filename = percent_decode(&encoded);
        if !filename.is_empty() {
            tracing::trace!(filename = %filename, "Found encoded filename");
            return Some(filename);
        }
    }

    if let Some(caps) = QUOTED_FILENAME_RE.captures(content_disposition) {
        let unescaped = caps[1].replace("\\\"", "\"").replace("\\\\", "\\");
        let filename = percent_decode(&unescaped);
        if !filename.is_empty() {
            tracing::trace!(filename = %filename, "Found quoted filename");
            return Some(filename);
        }
    }

    if let Some(caps) = BARE_FILENAME_RE.captures(content_disposition) {
        let filename = percent_decode(&caps[1]);
        if !filename.is_empty() {
            tracing::trace!(filename = %filename, "Found unquoted filename");
            return Some(filename);
        }
    }

    tracing::trace!("No filename found");
    None
}

/// Name from a share link shaped like `/file/<hash>/<name>/file`.
///
/// Falls back to `mediafire_file_<hash>` when the name segment is absent.
/// Returns `None` if the link doesn't parse or carries no hash.
pub fn name_from_share_link(link: &str) -> Option<String> {
    let url = match url::Url::parse(link) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(%link, error = %e, "share link did not parse, skipping path name");
            return None;
        }
    };

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let marker = segments.iter().position(|s| FILE_MARKERS.contains(s))?;
    let hash = segments.get(marker + 1)?;

    match segments.get(marker + 2) {
        Some(name) if *name != "file" => {
            let decoded = percent_decode(&name.replace('+', " "));
            if decoded.trim().is_empty() {
                Some(format!("mediafire_file_{hash}"))
            } else {
                Some(decoded)
            }
        }
        _ => Some(format!("mediafire_file_{hash}")),
    }
}

/// Extension for a `Content-Type`, ignoring parameters.
///
/// Unknown and generic binary types yield `None` rather than a guess built
/// from the subtype.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || essence == "application/octet-stream" {
        return None;
    }

    MIME_EXTENSIONS.get(essence.as_str()).copied().or_else(|| {
        mime_guess::get_mime_extensions_str(&essence).and_then(|exts| exts.first().copied())
    })
}

/// True if `name` ends in a short alphanumeric suffix after a dot.
fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(0) | None => false,
        Some(pos) => {
            let ext = &name[pos + 1..];
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

fn with_extension(name: String, ext: &str) -> String {
    let suffix = format!(".{ext}");
    if name.to_ascii_lowercase().contains(&suffix) {
        name
    } else {
        name + &suffix
    }
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Make the name safe to place inside a quoted header parameter.
fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' => '\'',
            '\\' | '/' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
