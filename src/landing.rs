//! Fetches the MediaFire share page the direct link is scraped from.

use http::{
    HeaderMap, HeaderValue,
    header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
};
use reqwest::{Client, StatusCode};

use crate::error::{RelayError, Result};
use crate::link::SourceLink;

const LANDING_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Raw body of the share page. Dropped once extraction is done with it.
#[derive(Debug)]
pub struct LandingPage {
    pub status: StatusCode,
    pub body: String,
}

/// GET the share page with a desktop browser identity.
///
/// No timeout is applied here; the runtime bounds the request.
#[tracing::instrument(level = "debug", skip_all, fields(link = %link))]
pub async fn fetch_landing_page(
    client: &Client,
    link: &SourceLink,
    user_agent: &str,
) -> Result<LandingPage> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| color_eyre::eyre::eyre!("Invalid landing User-Agent: {}", e))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(LANDING_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let response = client.get(link.as_str()).headers(headers).send().await?;
    let status = response.status();
    tracing::debug!(%status, "landing page responded");

    if !status.is_success() {
        return Err(RelayError::UpstreamFetch {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let body = response.text().await?;
    tracing::trace!(bytes = body.len(), "landing page read");

    Ok(LandingPage { status, body })
}
