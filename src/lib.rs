use std::sync::Arc;

use anyhow::{Context, Result};

pub mod auth;
pub mod config;
pub mod hooks;
pub mod members;
pub mod plugin;

#[cfg(test)]
mod testdata;

use auth::login_server::{LoginServer, LoginState};
use config::SiteConfig;
use hooks::HookRegistry;
use members::InMemoryMembers;
use plugin::MemberfulPlugin;

/// Wires the Memberful plugin into a fresh hook registry and serves the login endpoints.
pub async fn run(config: SiteConfig) -> Result<()> {
    let members = Arc::new(InMemoryMembers::new());

    let plugin = MemberfulPlugin::new(&config, members.clone())
        .context("Failed to set up Memberful plugin")?;
    let mut registry = HookRegistry::new();
    plugin.register(&mut registry);

    tracing::info!(
        memberful_url = %config.memberful_url,
        oauth_enabled = config.oauth_enabled,
        "Memberful sign-in configured"
    );

    let state = LoginState {
        registry: Arc::new(registry),
        users: members,
        default_redirect: config.default_redirect.clone(),
        site_host: config
            .site_url
            .as_ref()
            .and_then(|u| u.host_str())
            .map(str::to_string),
    };

    LoginServer::start(config.bind_addr, state)
        .await
        .map_err(|e| anyhow::anyhow!("Login server error: {}", e))
}
