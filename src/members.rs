use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::auth::types::{MemberAccount, User};

pub const SUBSCRIBER_ROLE: &str = "subscriber";

/// Extra fields stored alongside a synced member, e.g. `refresh_token`.
pub type ExtraFields = HashMap<String, String>;

/// Maps a Memberful account onto a local user, creating or updating it.
#[async_trait]
pub trait MemberSync: Send + Sync {
    async fn sync_member_from_account(
        &self,
        account: &MemberAccount,
        extra_fields: &ExtraFields,
    ) -> Result<User>;
}

/// Lookup of local users by id.
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, user_id: i64) -> Option<User>;
}

#[derive(Debug, Default)]
struct MemberStoreInner {
    next_id: i64,
    users: HashMap<i64, User>,
    /// Memberful member id -> local user id.
    member_links: HashMap<i64, i64>,
    extra_fields: HashMap<i64, ExtraFields>,
}

/// Process-local member store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryMembers {
    inner: Mutex<MemberStoreInner>,
}

impl InMemoryMembers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locally managed user such as a site administrator.
    pub fn insert_user(&self, login: &str, email: Option<&str>, roles: &[&str]) -> Result<User> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock member store: {}", e))?;
        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            login: login.to_string(),
            email: email.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn extra_fields(&self, user_id: i64) -> Option<ExtraFields> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.extra_fields.get(&user_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MemberSync for InMemoryMembers {
    async fn sync_member_from_account(
        &self,
        account: &MemberAccount,
        extra_fields: &ExtraFields,
    ) -> Result<User> {
        let member = account
            .0
            .get("member")
            .context("Missing 'member' field in Memberful account")?;
        let member_id = member["id"]
            .as_i64()
            .context("Missing 'member.id' field in Memberful account")?;
        let email = member["email"].as_str().map(str::to_string);
        let login = member["username"]
            .as_str()
            .or(email.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("member-{}", member_id));

        let mut inner = self
            .inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock member store: {}", e))?;

        let linked = inner.member_links.get(&member_id).copied();
        let user_id = match linked {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.member_links.insert(member_id, id);
                id
            }
        };

        let roles = inner
            .users
            .get(&user_id)
            .map(|existing| existing.roles.clone())
            .unwrap_or_else(|| vec![SUBSCRIBER_ROLE.to_string()]);

        let user = User {
            id: user_id,
            login,
            email,
            roles,
        };
        inner.users.insert(user_id, user.clone());
        inner
            .extra_fields
            .entry(user_id)
            .or_default()
            .extend(extra_fields.clone());

        tracing::info!(user_id, member_id, "Synced Memberful member");
        Ok(user)
    }
}

impl UserDirectory for InMemoryMembers {
    fn find_user(&self, user_id: i64) -> Option<User> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.users.get(&user_id).cloned())
    }
}
