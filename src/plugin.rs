use std::sync::Arc;

use anyhow::Result;

use crate::auth::{Authenticator, PasswordResetGuard, RedirectOverride};
use crate::config::SiteConfig;
use crate::hooks::HookRegistry;
use crate::members::MemberSync;

pub const AUTHENTICATE_PRIORITY: i32 = 10;
pub const PASSWORD_RESET_PRIORITY: i32 = 50;
pub const LOGIN_REDIRECT_PRIORITY: i32 = 10;

/// Memberful sign-in handlers, installed into a host [`HookRegistry`] by [`MemberfulPlugin::register`].
pub struct MemberfulPlugin {
    authenticator: Arc<Authenticator>,
    oauth_enabled: bool,
}

impl MemberfulPlugin {
    pub fn new(config: &SiteConfig, sync: Arc<dyn MemberSync>) -> Result<Self> {
        Ok(Self {
            authenticator: Arc::new(Authenticator::new(config, sync)?),
            oauth_enabled: config.oauth_enabled,
        })
    }

    pub fn register(&self, registry: &mut HookRegistry) {
        if self.oauth_enabled {
            registry.add_authenticate(AUTHENTICATE_PRIORITY, self.authenticator.clone());
        } else {
            tracing::info!("Memberful OAuth sign-in disabled, skipping authenticate hook");
        }

        // Subscribers never get a local password, even with OAuth turned off.
        registry.add_password_reset(PASSWORD_RESET_PRIORITY, Arc::new(PasswordResetGuard));
        registry.add_login_redirect(
            LOGIN_REDIRECT_PRIORITY,
            Arc::new(RedirectOverride {
                oauth_enabled: self.oauth_enabled,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{AuthAttempt, AuthOutcome};
    use crate::testdata::{config_for, user_with_roles, RecordingSync};

    #[tokio::test]
    async fn test_register_installs_all_hooks() {
        let plugin = MemberfulPlugin::new(
            &config_for("https://example.memberful.com"),
            Arc::new(RecordingSync::default()),
        )
        .unwrap();
        let mut registry = HookRegistry::new();
        plugin.register(&mut registry);

        let outcome = registry
            .run_authenticate(AuthAttempt::default())
            .await
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Redirect(_)));

        let subscriber = user_with_roles(&["subscriber"]);
        assert!(!registry.run_password_reset(true, &subscriber));

        let attempt = AuthAttempt {
            stored_redirect: Some("/blog".to_string()),
            ..AuthAttempt::default()
        };
        assert_eq!(
            registry.run_login_redirect("/".to_string(), &attempt, &subscriber),
            "/blog"
        );
    }

    #[tokio::test]
    async fn test_disabled_oauth_skips_authenticator() {
        let mut config = config_for("https://example.memberful.com");
        config.oauth_enabled = false;
        let plugin = MemberfulPlugin::new(&config, Arc::new(RecordingSync::default())).unwrap();
        let mut registry = HookRegistry::new();
        plugin.register(&mut registry);

        let outcome = registry
            .run_authenticate(AuthAttempt::default())
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Anonymous);

        let admin = user_with_roles(&["administrator"]);
        let attempt = AuthAttempt {
            stored_redirect: Some("/blog".to_string()),
            ..AuthAttempt::default()
        };
        assert_eq!(
            registry.run_login_redirect("/wp-admin".to_string(), &attempt, &admin),
            "/wp-admin"
        );
    }
}
