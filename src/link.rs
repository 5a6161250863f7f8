//! Source link validation.

use std::fmt;

use crate::error::{RelayError, Result};

const ALLOWED_PREFIXES: &[&str] = &["http://www.mediafire.com/", "https://www.mediafire.com/"];

/// A share link that passed validation. Only [`SourceLink::parse`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink(String);

impl SourceLink {
    /// Checks presence and prefix of the raw `require` value.
    ///
    /// The prefix match is exact: no case folding and no scheme normalization.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = match raw {
            Some(r) if !r.is_empty() => r,
            _ => return Err(RelayError::MissingParameter),
        };

        if !ALLOWED_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
            return Err(RelayError::InvalidSourceUrl);
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
