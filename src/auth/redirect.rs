use axum::http::HeaderValue;
use url::Url;

use super::types::{AuthAttempt, User};
use crate::hooks::LoginRedirectHook;

/// Picks where a member lands after signing in.
///
/// With OAuth disabled the host's `default` is returned untouched. Otherwise the
/// explicit `redirect_to` override wins, then the location stored in the
/// `memberful_redirect` cookie before the round trip, then `default`.
pub fn login_redirect(
    oauth_enabled: bool,
    default: String,
    requested: Option<&str>,
    stored: Option<&str>,
) -> String {
    if !oauth_enabled {
        return default;
    }

    requested
        .filter(|r| !r.is_empty())
        .or(stored.filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or(default)
}

/// Returns `target` when it is safe to send in a `Location` header: a local path, or an
/// absolute http(s) URL on `site_host`. Protocol-relative paths are rejected.
pub fn safe_redirect(target: &str, site_host: Option<&str>) -> Option<String> {
    HeaderValue::try_from(target).ok()?;

    if target.starts_with('/') {
        if target.starts_with("//") || target.starts_with("/\\") {
            return None;
        }
        return Some(target.to_string());
    }

    let url = Url::parse(target).ok()?;
    let same_site = matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
        && url.host_str() == site_host;
    same_site.then(|| target.to_string())
}

pub struct RedirectOverride {
    pub oauth_enabled: bool,
}

impl LoginRedirectHook for RedirectOverride {
    fn login_redirect(&self, redirect: String, attempt: &AuthAttempt, _user: &User) -> String {
        login_redirect(
            self.oauth_enabled,
            redirect,
            attempt.redirect_to.as_deref(),
            attempt.stored_redirect.as_deref(),
        )
    }
}
