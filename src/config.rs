//! Config module for mfrelay

use clap::Parser;

/// Identity presented to MediaFire when fetching the share page.
pub const DEFAULT_LANDING_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Identity used for the file fetch when the caller didn't send one.
pub const DEFAULT_FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (compatible; MediaFireProxy/1.0)";

#[derive(Parser, Debug, Clone)]
pub struct UpstreamConfig {
    /// User-Agent sent when fetching the MediaFire landing page
    #[clap(
        long,
        env = "MFR_LANDING_USER_AGENT",
        default_value = DEFAULT_LANDING_USER_AGENT
    )]
    pub landing_user_agent: String,

    /// User-Agent sent for the file download when the caller provides none
    #[clap(
        long,
        env = "MFR_FALLBACK_USER_AGENT",
        default_value = DEFAULT_FALLBACK_USER_AGENT
    )]
    pub fallback_user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            landing_user_agent: DEFAULT_LANDING_USER_AGENT.to_string(),
            fallback_user_agent: DEFAULT_FALLBACK_USER_AGENT.to_string(),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "mfrelay", about = "Resolve MediaFire share links and relay the file")]
pub struct Config {
    #[clap(long, env = "MFR_HOST", default_value = "0.0.0.0:3000")]
    pub host: String,

    #[clap(flatten)]
    pub upstream: UpstreamConfig,
}

impl Config {
    pub fn load() -> Self {
        Config::parse()
    }
}
