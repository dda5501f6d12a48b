use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:1421";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Site-wide settings the Memberful hooks read at call time.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Base URL of the Memberful site, e.g. `https://example.memberful.com/`.
    pub memberful_url: Url,
    pub account_url: Url,
    /// Public URL of this site; absolute post-login redirects must point at its host.
    pub site_url: Option<Url>,
    pub client_id: String,
    pub client_secret: String,
    /// `None` yields a host-only cookie.
    pub cookie_domain: Option<String>,
    pub site_is_https: bool,
    pub oauth_enabled: bool,
    pub http_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub default_redirect: String,
}

impl SiteConfig {
    /// Loads the configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).with_context(|| format!("{} environment variable not set", key));

        let memberful_url = parse_base_url(&require("MEMBERFUL_URL")?)?;

        let account_url = match get("MEMBERFUL_ACCOUNT_URL") {
            Some(raw) => Url::parse(&raw)
                .with_context(|| format!("Invalid MEMBERFUL_ACCOUNT_URL: {}", raw))?,
            None => memberful_url
                .join("account")
                .context("Failed to derive account URL from MEMBERFUL_URL")?,
        };

        let site_url = get("MEMBERFUL_SITE_URL")
            .map(|raw| {
                Url::parse(&raw).with_context(|| format!("Invalid MEMBERFUL_SITE_URL: {}", raw))
            })
            .transpose()?;

        let http_timeout_secs = match get("MEMBERFUL_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid MEMBERFUL_HTTP_TIMEOUT_SECS: {}", raw))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let bind_addr = get("MEMBERFUL_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid MEMBERFUL_BIND_ADDR: {}", bind_addr))?;

        Ok(Self {
            memberful_url,
            account_url,
            site_url,
            client_id: require("MEMBERFUL_CLIENT_ID")?,
            client_secret: require("MEMBERFUL_CLIENT_SECRET")?,
            cookie_domain: get("MEMBERFUL_COOKIE_DOMAIN"),
            site_is_https: parse_flag(get("MEMBERFUL_SITE_HTTPS"), false)?,
            oauth_enabled: parse_flag(get("MEMBERFUL_OAUTH_ENABLED"), true)?,
            http_timeout: Duration::from_secs(http_timeout_secs),
            bind_addr,
            default_redirect: get("MEMBERFUL_DEFAULT_REDIRECT").unwrap_or_else(|| "/".to_string()),
        })
    }
}

/// Parses the provider base URL, forcing a trailing slash so `join` keeps the full path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).with_context(|| format!("Invalid MEMBERFUL_URL: {}", raw))
}

fn parse_flag(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("Invalid boolean value: {}", other),
        },
    }
}
