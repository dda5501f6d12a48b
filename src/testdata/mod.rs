use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::auth::types::{MemberAccount, User};
use crate::config::SiteConfig;
use crate::members::{ExtraFields, MemberSync};

pub const ACCOUNT_JSON: &str = include_str!("account.json");

/// Config pointing every Memberful endpoint at `base`.
pub fn config_for(base: &str) -> SiteConfig {
    let base = base.to_string();
    SiteConfig::from_lookup(move |key| match key {
        "MEMBERFUL_URL" => Some(base.clone()),
        "MEMBERFUL_CLIENT_ID" => Some("client-123".to_string()),
        "MEMBERFUL_CLIENT_SECRET" => Some("s3cret".to_string()),
        "MEMBERFUL_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
        "MEMBERFUL_SITE_URL" => Some("https://site.example".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn user_with_roles(roles: &[&str]) -> User {
    User {
        id: 42,
        login: "jane".to_string(),
        email: Some("jane@example.com".to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// Sync collaborator that records every call.
pub struct RecordingSync {
    pub user: User,
    fail: bool,
    calls: Mutex<Vec<(MemberAccount, ExtraFields)>>,
}

impl Default for RecordingSync {
    fn default() -> Self {
        Self {
            user: user_with_roles(&["subscriber"]),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingSync {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(MemberAccount, ExtraFields)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MemberSync for RecordingSync {
    async fn sync_member_from_account(
        &self,
        account: &MemberAccount,
        extra_fields: &ExtraFields,
    ) -> Result<User> {
        self.calls
            .lock()
            .unwrap()
            .push((account.clone(), extra_fields.clone()));
        if self.fail {
            anyhow::bail!("user store unavailable");
        }
        Ok(self.user.clone())
    }
}
