//! Streams the resolved file back to the caller with rewritten headers.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use futures_util::TryStreamExt;
use reqwest::Client;

use crate::error::{RelayError, Result};
use crate::filename::infer_filename;
use crate::headers::{apply_cors, strip_upstream_headers};
use crate::link::SourceLink;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_DISPOSITION: &str = "attachment; filename=\"downloaded_file\"";

/// GET the direct URL and turn the upstream answer into the relayed response.
///
/// Redirects are followed by the client. The body is forwarded chunk by chunk
/// as it arrives; nothing is buffered beyond what the stream holds.
#[tracing::instrument(level = "debug", skip(client, source, user_agent), fields(source = %source))]
pub async fn relay_file(
    client: &Client,
    direct_url: &str,
    source: &SourceLink,
    user_agent: &str,
) -> Result<Response> {
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| color_eyre::eyre::eyre!("Invalid download User-Agent: {}", e))?;

    let upstream = client
        .get(direct_url)
        .header(header::USER_AGENT, user_agent)
        .send()
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(RelayError::DownloadFetch {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let headers = relay_headers(upstream.headers(), source);
    tracing::debug!(
        %status,
        content_type = ?headers.get(header::CONTENT_TYPE),
        content_length = ?headers.get(header::CONTENT_LENGTH),
        "relaying upstream file"
    );

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| tracing::warn!(error = %e, "upstream body failed mid-relay"));

    let mut resp = Response::new(Body::from_stream(stream));
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    Ok(resp)
}

/// Build the header set for a relayed file from the upstream one.
///
/// Upstream headers are copied as-is, then the scrubbed and hop-by-hop ones are
/// dropped. `Content-Type` falls back to `application/octet-stream`,
/// `Content-Disposition` is always an attachment and CORS is stamped last.
pub fn relay_headers(upstream: &HeaderMap, source: &SourceLink) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_upstream_headers(&mut headers);

    let content_type = upstream
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let content_type_str = content_type.to_str().unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
    headers.insert(header::CONTENT_TYPE, content_type);

    let disposition = upstream
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok());
    let filename = infer_filename(disposition, source, &content_type_str);
    tracing::info!(%filename, "serving relayed file");
    headers.insert(header::CONTENT_DISPOSITION, attachment(&filename));

    apply_cors(&mut headers);
    headers
}

fn attachment(filename: &str) -> HeaderValue {
    HeaderValue::from_bytes(format!("attachment; filename=\"{filename}\"").as_bytes())
        .unwrap_or_else(|e| {
            tracing::warn!(%filename, error = %e, "filename not usable in header, using default");
            HeaderValue::from_static(DEFAULT_DISPOSITION)
        })
}
