//! Extension points the host invokes during sign-in.
//!
//! Handlers run in ascending priority order; handlers sharing a priority run in
//! the order they were added.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::error::AuthError;
use crate::auth::types::{AuthAttempt, AuthOutcome, User};

#[async_trait]
pub trait AuthenticateHook: Send + Sync {
    /// `attempt.user` holds whatever earlier handlers resolved.
    async fn authenticate(&self, attempt: &AuthAttempt) -> Result<AuthOutcome, AuthError>;
}

pub trait PasswordResetHook: Send + Sync {
    fn allow_password_reset(&self, allowed: bool, user: &User) -> bool;
}

pub trait LoginRedirectHook: Send + Sync {
    fn login_redirect(&self, redirect: String, attempt: &AuthAttempt, user: &User) -> String;
}

struct Registered<T: ?Sized> {
    priority: i32,
    handler: Arc<T>,
}

fn insert_by_priority<T: ?Sized>(hooks: &mut Vec<Registered<T>>, priority: i32, handler: Arc<T>) {
    let index = hooks.partition_point(|h| h.priority <= priority);
    hooks.insert(index, Registered { priority, handler });
}

#[derive(Default)]
pub struct HookRegistry {
    authenticate: Vec<Registered<dyn AuthenticateHook>>,
    password_reset: Vec<Registered<dyn PasswordResetHook>>,
    login_redirect: Vec<Registered<dyn LoginRedirectHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_authenticate(&mut self, priority: i32, handler: Arc<dyn AuthenticateHook>) {
        insert_by_priority(&mut self.authenticate, priority, handler);
    }

    pub fn add_password_reset(&mut self, priority: i32, handler: Arc<dyn PasswordResetHook>) {
        insert_by_priority(&mut self.password_reset, priority, handler);
    }

    pub fn add_login_redirect(&mut self, priority: i32, handler: Arc<dyn LoginRedirectHook>) {
        insert_by_priority(&mut self.login_redirect, priority, handler);
    }

    /// Runs the `authenticate` chain. A redirect or an error stops the chain.
    pub async fn run_authenticate(
        &self,
        mut attempt: AuthAttempt,
    ) -> Result<AuthOutcome, AuthError> {
        for hook in &self.authenticate {
            match hook.handler.authenticate(&attempt).await? {
                AuthOutcome::Authenticated(user) => attempt.user = Some(user),
                AuthOutcome::Anonymous => {}
                redirect @ AuthOutcome::Redirect(_) => return Ok(redirect),
            }
        }

        Ok(attempt
            .user
            .map_or(AuthOutcome::Anonymous, AuthOutcome::Authenticated))
    }

    pub fn run_password_reset(&self, allowed: bool, user: &User) -> bool {
        self.password_reset.iter().fold(allowed, |allowed, hook| {
            hook.handler.allow_password_reset(allowed, user)
        })
    }

    pub fn run_login_redirect(&self, default: String, attempt: &AuthAttempt, user: &User) -> String {
        self.login_redirect.iter().fold(default, |redirect, hook| {
            hook.handler.login_redirect(redirect, attempt, user)
        })
    }
}
