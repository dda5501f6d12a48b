use thiserror::Error;

pub const SIGN_IN_PROBLEM_MESSAGE: &str =
    "We had a problem signing you in, please try again later or contact the site admin.";

/// Terminal failure of a Memberful sign-in attempt.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Memberful returned an OAuth error: {0}")]
    OAuthError(String),

    #[error("Failed to reach the Memberful token endpoint: {0}")]
    CouldNotGetTokens(#[source] reqwest::Error),

    #[error("Could not get access token from Memberful")]
    OAuthAccessFail,

    #[error("Failed to reach the Memberful account endpoint: {0}")]
    FetchAccountConnectFailure(#[source] reqwest::Error),

    #[error("Could not fetch your data from Memberful. {status}")]
    FetchAccountResponseFailure { status: u16 },

    #[error("Failed to sync member: {0:#}")]
    SyncMemberFailure(#[source] anyhow::Error),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::OAuthError(_) => "memberful_oauth_error",
            AuthError::CouldNotGetTokens(_) => "could_not_get_tokens",
            AuthError::OAuthAccessFail => "oauth_access_fail",
            AuthError::FetchAccountConnectFailure(_) => "fetch_account_connect_failure",
            AuthError::FetchAccountResponseFailure { .. } => "fetch_account_response_failure",
            AuthError::SyncMemberFailure(_) => "sync_member_failure",
        }
    }

    /// Diagnostic lines shown under the fixed message.
    pub fn details(&self) -> Vec<String> {
        match self {
            AuthError::OAuthError(provider_error) => vec![provider_error.clone()],
            AuthError::CouldNotGetTokens(e) | AuthError::FetchAccountConnectFailure(e) => {
                vec![e.to_string()]
            }
            AuthError::SyncMemberFailure(e) => vec![format!("{:#}", e)],
            AuthError::OAuthAccessFail | AuthError::FetchAccountResponseFailure { .. } => {
                vec![self.to_string()]
            }
        }
    }

    /// Renders the fatal error page body. Every dynamic part is HTML-escaped.
    pub fn render_page(&self) -> String {
        let mut lines = vec![SIGN_IN_PROBLEM_MESSAGE.to_string()];
        lines.extend(
            self.details()
                .iter()
                .filter(|d| !d.is_empty())
                .map(|d| escape_html(d)),
        );
        lines.push(escape_html(self.code()));
        lines.join("<br/>")
    }
}

/// HTML-escapes `input`, quotes included.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}
