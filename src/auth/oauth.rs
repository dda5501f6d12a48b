use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use super::error::AuthError;
use super::types::{MemberAccount, TokenResponse};
use crate::config::SiteConfig;

/// HTTP client for the Memberful OAuth and account endpoints.
#[derive(Debug, Clone)]
pub struct MemberfulClient {
    http: reqwest::Client,
    memberful_url: Url,
    account_url: Url,
    client_id: String,
    client_secret: String,
}

impl MemberfulClient {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build Memberful HTTP client")?;

        Ok(Self {
            http,
            memberful_url: config.memberful_url.clone(),
            account_url: config.account_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// URL of `action` under the member OAuth endpoint.
    pub fn oauth_member_url(&self, action: &str) -> String {
        format!("{}oauth/{}", self.memberful_url, action)
    }

    /// Where members are sent to sign in.
    pub fn oauth_auth_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}",
            self.oauth_member_url(""),
            urlencoding::encode(&self.client_id)
        )
    }

    pub async fn get_oauth_tokens(&self, auth_code: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", auth_code),
        ];

        let response = self
            .http
            .post(self.oauth_member_url("token"))
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(AuthError::CouldNotGetTokens)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(AuthError::CouldNotGetTokens)?;

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Memberful token endpoint refused code");
            return Err(AuthError::OAuthAccessFail);
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(tokens) if !tokens.access_token.is_empty() => Ok(tokens),
            _ => {
                tracing::warn!("Memberful token response had no access token");
                Err(AuthError::OAuthAccessFail)
            }
        }
    }

    pub async fn get_member_data(&self, access_token: &str) -> Result<MemberAccount, AuthError> {
        let mut url = self.account_url.clone();
        url.query_pairs_mut()
            .append_pair("access_token", access_token)
            .append_pair("format", "json");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(AuthError::FetchAccountConnectFailure)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(AuthError::FetchAccountConnectFailure)?;

        let account = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);
        if status != StatusCode::OK || account.is_null() {
            tracing::warn!(status = status.as_u16(), "Memberful account fetch failed");
            return Err(AuthError::FetchAccountResponseFailure {
                status: status.as_u16(),
            });
        }

        Ok(MemberAccount(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{config_for, ACCOUNT_JSON};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_auth_url_format() {
        let config = config_for("https://example.memberful.com");
        let client = MemberfulClient::new(&config).unwrap();

        assert_eq!(
            client.oauth_auth_url(),
            "https://example.memberful.com/oauth/?response_type=code&client_id=client-123"
        );
        assert_eq!(
            client.oauth_member_url("token"),
            "https://example.memberful.com/oauth/token"
        );
    }

    #[tokio::test]
    async fn test_get_oauth_tokens_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains("code=the-code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"access_token":"T","refresh_token":"R"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let tokens = client.get_oauth_tokens("the-code").await.unwrap();

        assert_eq!(tokens.access_token, "T");
        assert_eq!(tokens.refresh_token, "R");
    }

    #[tokio::test]
    async fn test_get_oauth_tokens_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let err = client.get_oauth_tokens("x").await.unwrap_err();
        assert_eq!(err.code(), "oauth_access_fail");
    }

    #[tokio::test]
    async fn test_get_oauth_tokens_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"refresh_token":"R"}"#))
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let err = client.get_oauth_tokens("x").await.unwrap_err();
        assert_eq!(err.code(), "oauth_access_fail");
    }

    #[tokio::test]
    async fn test_get_oauth_tokens_connect_failure() {
        // Nothing listens on port 9 locally.
        let client = MemberfulClient::new(&config_for("http://127.0.0.1:9")).unwrap();
        let err = client.get_oauth_tokens("x").await.unwrap_err();
        assert_eq!(err.code(), "could_not_get_tokens");
    }

    #[tokio::test]
    async fn test_get_oauth_tokens_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let err = client.get_oauth_tokens("x").await.unwrap_err();
        assert_eq!(err.code(), "oauth_access_fail");
    }

    #[tokio::test]
    async fn test_get_member_data_connect_failure() {
        let client = MemberfulClient::new(&config_for("http://127.0.0.1:9")).unwrap();
        let err = client.get_member_data("T").await.unwrap_err();
        assert_eq!(err.code(), "fetch_account_connect_failure");
        assert!(err.render_page().ends_with("<br/>fetch_account_connect_failure"));
    }

    #[tokio::test]
    async fn test_get_member_data_sends_token_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .and(query_param("access_token", "T"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ACCOUNT_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let account = client.get_member_data("T").await.unwrap();
        assert_eq!(account.0["member"]["email"], "jane@example.com");
    }

    #[tokio::test]
    async fn test_get_member_data_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let err = client.get_member_data("T").await.unwrap_err();
        assert_eq!(err.code(), "fetch_account_response_failure");
        assert!(err.to_string().ends_with("404"));
    }

    #[tokio::test]
    async fn test_get_member_data_null_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = MemberfulClient::new(&config_for(&server.uri())).unwrap();
        let err = client.get_member_data("T").await.unwrap_err();
        assert_eq!(err.code(), "fetch_account_response_failure");
    }
}
