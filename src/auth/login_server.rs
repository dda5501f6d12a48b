use axum::{
    extract::{Path, Query, State},
    http::{
        header::{LOCATION, REFERER},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::trace::TraceLayer;

use super::redirect::safe_redirect;
use super::types::{AuthAttempt, AuthOutcome, REDIRECT_COOKIE_NAME};
use crate::hooks::HookRegistry;
use crate::members::UserDirectory;

#[derive(Clone)]
pub struct LoginState {
    pub registry: Arc<HookRegistry>,
    pub users: Arc<dyn UserDirectory>,
    pub default_redirect: String,
    /// Host that absolute post-login redirects may point at.
    pub site_host: Option<String>,
}

pub struct LoginServer;

impl LoginServer {
    pub fn router(state: LoginState) -> Router {
        Router::new()
            .route("/login", get(login).post(login))
            .route("/password-reset/:user_id", get(password_reset))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CookieManagerLayer::new()),
            )
            .with_state(state)
    }

    pub async fn start(
        addr: SocketAddr,
        state: LoginState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = Self::router(state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Login server listening");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn login(
    State(state): State<LoginState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    cookies: Cookies,
    form: Option<Form<HashMap<String, String>>>,
) -> Response {
    let mut attempt = AuthAttempt::from_params(&params);
    // The login form posts `redirect_to` as a hidden field, which wins over the query.
    if let Some(redirect_to) = form.and_then(|Form(mut fields)| fields.remove("redirect_to")) {
        attempt.redirect_to = Some(redirect_to);
    }
    attempt.referer = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    attempt.stored_redirect = cookies
        .get(REDIRECT_COOKIE_NAME)
        .map(|c| c.value().to_string());

    match state.registry.run_authenticate(attempt.clone()).await {
        Ok(AuthOutcome::Redirect(redirect)) => {
            cookies.add(redirect.cookie.to_cookie(Utc::now()));
            (StatusCode::FOUND, [(LOCATION, redirect.location)]).into_response()
        }
        Ok(AuthOutcome::Authenticated(user)) => {
            let requested =
                state
                    .registry
                    .run_login_redirect(state.default_redirect.clone(), &attempt, &user);
            let site_host = state.site_host.as_deref();
            let target = safe_redirect(&requested, site_host)
                .or_else(|| safe_redirect(&state.default_redirect, site_host))
                .unwrap_or_else(|| "/".to_string());
            if target != requested {
                tracing::warn!(user_id = user.id, "Ignoring unsafe post-login redirect");
            }
            Redirect::to(&target).into_response()
        }
        Ok(AuthOutcome::Anonymous) => (
            StatusCode::UNAUTHORIZED,
            Html(page("Sign In Unavailable", "Memberful sign-in is not enabled.")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Memberful sign-in failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page("Sign In Error", &e.render_page())),
            )
                .into_response()
        }
    }
}

async fn password_reset(
    State(state): State<LoginState>,
    Path(user_id): Path<i64>,
) -> Response {
    match state.users.find_user(user_id) {
        Some(user) => {
            let allowed = state.registry.run_password_reset(true, &user);
            Json(json!({ "allowed": allowed })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown user" })),
        )
            .into_response(),
    }
}

/// `body` is inserted as-is and must already be escaped.
fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #f0f0f0;
        }}
        .container {{
            text-align: center;
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }}
        h1 {{ color: #f44336; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p>{body}</p>
    </div>
</body>
</html>
"#
    )
}
