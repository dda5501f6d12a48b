use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::error::AuthError;
use super::oauth::MemberfulClient;
use super::types::{AuthAttempt, AuthOutcome, LoginRedirect, RedirectCookie, User};
use crate::config::SiteConfig;
use crate::hooks::AuthenticateHook;
use crate::members::{ExtraFields, MemberSync};

/// Signs members in through Memberful's OAuth flow.
pub struct Authenticator {
    client: MemberfulClient,
    sync: Arc<dyn MemberSync>,
    cookie_domain: Option<String>,
    site_is_https: bool,
}

impl Authenticator {
    pub fn new(config: &SiteConfig, sync: Arc<dyn MemberSync>) -> Result<Self> {
        Ok(Self {
            client: MemberfulClient::new(config)?,
            sync,
            cookie_domain: config.cookie_domain.clone(),
            site_is_https: config.site_is_https,
        })
    }

    pub async fn authenticate(&self, attempt: &AuthAttempt) -> Result<AuthOutcome, AuthError> {
        // Another authentication system already handled this request.
        if let Some(user) = &attempt.user {
            return Ok(AuthOutcome::Authenticated(user.clone()));
        }

        if let Some(code) = &attempt.code {
            let user = self.sign_in_with_code(code).await?;
            return Ok(AuthOutcome::Authenticated(user));
        }

        if let Some(error) = &attempt.error {
            tracing::warn!(error = %error, "Memberful returned an OAuth error");
            return Err(AuthError::OAuthError(error.clone()));
        }

        Ok(AuthOutcome::Redirect(self.redirect_to_memberful(attempt)))
    }

    async fn sign_in_with_code(&self, code: &str) -> Result<User, AuthError> {
        tracing::debug!("Exchanging Memberful authorization code");
        let tokens = self.client.get_oauth_tokens(code).await?;

        tracing::debug!("Fetching Memberful member data");
        let account = self.client.get_member_data(&tokens.access_token).await?;

        let mut extra_fields = ExtraFields::new();
        extra_fields.insert("refresh_token".to_string(), tokens.refresh_token);

        let user = self
            .sync
            .sync_member_from_account(&account, &extra_fields)
            .await
            .map_err(AuthError::SyncMemberFailure)?;

        tracing::info!(user_id = user.id, "Member signed in through Memberful");
        Ok(user)
    }

    fn redirect_to_memberful(&self, attempt: &AuthAttempt) -> LoginRedirect {
        let came_from = attempt
            .redirect_to
            .clone()
            .or_else(|| attempt.referer.clone())
            .unwrap_or_default();

        let cookie = RedirectCookie::new(
            came_from,
            Utc::now(),
            self.cookie_domain.clone(),
            self.site_is_https,
        );
        let location = self.client.oauth_auth_url();

        tracing::info!(location = %location, "Sending user to Memberful sign-in");
        LoginRedirect { location, cookie }
    }
}

#[async_trait]
impl AuthenticateHook for Authenticator {
    async fn authenticate(&self, attempt: &AuthAttempt) -> Result<AuthOutcome, AuthError> {
        Authenticator::authenticate(self, attempt).await
    }
}
