use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_cookies::cookie::time;
use tower_cookies::Cookie;

pub const REDIRECT_COOKIE_NAME: &str = "memberful_redirect";
pub const REDIRECT_COOKIE_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// Member profile exactly as Memberful returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberAccount(pub Value);

/// Local user record produced by the member sync collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// State of one in-flight login request.
#[derive(Debug, Clone, Default)]
pub struct AuthAttempt {
    /// User resolved by an earlier `authenticate` handler.
    pub user: Option<User>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub redirect_to: Option<String>,
    pub referer: Option<String>,
    /// `memberful_redirect` value sent back by the browser.
    pub stored_redirect: Option<String>,
}

impl AuthAttempt {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            code: params.get("code").cloned(),
            error: params.get("error").cloned(),
            redirect_to: params.get("redirect_to").cloned(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCookie {
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl RedirectCookie {
    pub fn new(value: String, now: DateTime<Utc>, domain: Option<String>, secure: bool) -> Self {
        Self {
            value,
            expires: now + Duration::minutes(REDIRECT_COOKIE_TTL_MINUTES),
            path: "/".to_string(),
            domain,
            secure,
            http_only: true,
        }
    }

    pub fn max_age_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires - now).num_seconds().max(0)
    }

    pub fn to_cookie(&self, now: DateTime<Utc>) -> Cookie<'static> {
        let mut builder = Cookie::build((REDIRECT_COOKIE_NAME, self.value.clone()))
            .path(self.path.clone())
            .max_age(time::Duration::seconds(self.max_age_secs(now)))
            .secure(self.secure)
            .http_only(self.http_only);
        if let Ok(expires) = time::OffsetDateTime::from_unix_timestamp(self.expires.timestamp()) {
            builder = builder.expires(expires);
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

/// Browser redirect to the Memberful authorization page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub location: String,
    pub cookie: RedirectCookie,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(User),
    /// No user could be resolved; later handlers may still resolve one.
    Anonymous,
    Redirect(LoginRedirect),
}
