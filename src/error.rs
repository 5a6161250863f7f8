//! Failure kinds for the relay pipeline and the JSON envelope they render to.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::headers::apply_cors;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing 'require' query parameter")]
    MissingParameter,

    #[error(
        "Invalid MediaFire URL: must start with http://www.mediafire.com/ or https://www.mediafire.com/"
    )]
    InvalidSourceUrl,

    #[error("Failed to fetch MediaFire page: {} {reason}", .status.as_u16())]
    UpstreamFetch { status: StatusCode, reason: String },

    #[error("Failed to download file: {} {reason}", .status.as_u16())]
    DownloadFetch { status: StatusCode, reason: String },

    #[error("Could not find a direct download link on the MediaFire page")]
    ExtractionFailed,

    #[error("{0}")]
    Unexpected(#[from] color_eyre::Report),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Unexpected(color_eyre::eyre::eyre!(err))
    }
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingParameter | RelayError::InvalidSourceUrl => StatusCode::BAD_REQUEST,
            RelayError::UpstreamFetch { status, .. } | RelayError::DownloadFetch { status, .. } => {
                *status
            }
            RelayError::ExtractionFailed | RelayError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render the failure with the link the caller asked for.
    pub fn into_envelope(self, link: Option<&str>) -> ErrorEnvelope {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "relay failed");
        } else {
            tracing::warn!(%status, error = %self, "relay rejected");
        }
        ErrorEnvelope::new(self.to_string(), status, link)
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    link_provided: String,
}

/// Uniform error response: `{"error": ..., "link_provided": ...}` plus CORS.
#[derive(Debug)]
pub struct ErrorEnvelope {
    status: StatusCode,
    body: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, status: StatusCode, link: Option<&str>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                link_provided: link
                    .filter(|l| !l.is_empty())
                    .unwrap_or("N/A")
                    .to_string(),
            },
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        // Json sets Content-Type: application/json
        let mut resp = (self.status, Json(self.body)).into_response();
        apply_cors(resp.headers_mut());
        resp
    }
}
