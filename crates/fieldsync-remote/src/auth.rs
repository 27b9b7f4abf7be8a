//! Silent OAuth2 token acquisition
//!
//! Implements the identity-provider port with a refresh-token exchange
//! against the configured token endpoint. No user interaction is ever
//! required: the adapter holds a long-lived refresh token (from the config
//! file or the `FIELDSYNC_REFRESH_TOKEN` environment variable) and redeems
//! it for short-lived access tokens on demand.
//!
//! Acquisition failures are reported as plain errors; the sync engine falls
//! back to the cached token in the local store.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use oauth2::{
    basic::BasicClient, ClientId, EndpointNotSet, EndpointSet, RefreshToken, TokenResponse,
    TokenUrl,
};
use tracing::{debug, info};

use fieldsync_core::config::AuthConfig;
use fieldsync_core::domain::{CachedToken, Scope};
use fieldsync_core::ports::{IClock, IIdentityProvider};

/// Environment variable consulted when the config carries no refresh token
const REFRESH_TOKEN_ENV: &str = "FIELDSYNC_REFRESH_TOKEN";

/// Token lifetime assumed when the provider omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// OAuth2 refresh-token identity provider
///
/// Only the token endpoint is configured; the authorization-code endpoints
/// are never used because acquisition is always silent.
pub struct OAuthIdentityProvider {
    client: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    refresh_token: RefreshToken,
    clock: Arc<dyn IClock>,
}

impl OAuthIdentityProvider {
    /// Creates a provider from explicit endpoint and credential values
    pub fn new(
        token_url: &str,
        client_id: &str,
        refresh_token: &str,
        clock: Arc<dyn IClock>,
    ) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_token_uri(TokenUrl::new(token_url.to_string()).context("Invalid token URL")?);

        Ok(Self {
            client,
            refresh_token: RefreshToken::new(refresh_token.to_string()),
            clock,
        })
    }

    /// Creates a provider from the `auth` section of the config file
    ///
    /// The refresh token may come from the config or, failing that, from the
    /// `FIELDSYNC_REFRESH_TOKEN` environment variable.
    pub fn from_config(auth: &AuthConfig, clock: Arc<dyn IClock>) -> Result<Self> {
        let token_url = auth
            .token_url
            .as_deref()
            .context("auth.token_url is not configured")?;
        let client_id = auth
            .client_id
            .as_deref()
            .context("auth.client_id is not configured")?;
        let refresh_token = match auth.refresh_token.clone() {
            Some(token) => token,
            None => std::env::var(REFRESH_TOKEN_ENV).with_context(|| {
                format!("No refresh token in config and {} is unset", REFRESH_TOKEN_ENV)
            })?,
        };

        Self::new(token_url, client_id, &refresh_token, clock)
    }
}

#[async_trait::async_trait]
impl IIdentityProvider for OAuthIdentityProvider {
    async fn acquire_token_silent(&self, scope: &Scope) -> Result<CachedToken> {
        debug!(scope = %scope, "Acquiring access token silently");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&self.refresh_token)
            .add_scope(oauth2::Scope::new(scope.to_string()))
            .request_async(&http_client)
            .await
            .context("Refresh-token exchange failed")?;

        let now = self.clock.now();
        let expires_at = token_result
            .expires_in()
            .map(|d| now + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

        info!(scope = %scope, expires_at = %expires_at, "Acquired access token");
        Ok(CachedToken {
            scope: scope.clone(),
            access_token: token_result.access_token().secret().to_string(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl IClock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock {
            now: Mutex::new(Utc::now()),
        })
    }

    fn scope() -> Scope {
        Scope::new("https://records.example.com/.default").unwrap()
    }

    #[tokio::test]
    async fn test_acquire_token_silent_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=long-lived"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "token_type": "Bearer",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;

        let clock = fixed_clock();
        let provider = OAuthIdentityProvider::new(
            &format!("{}/token", server.uri()),
            "client-1",
            "long-lived",
            clock.clone(),
        )
        .unwrap();

        let token = provider.acquire_token_silent(&scope()).await.unwrap();
        assert_eq!(token.access_token, "fresh-token");
        assert_eq!(token.scope, scope());
        assert_eq!(token.expires_at, clock.now() + Duration::seconds(1800));
    }

    #[tokio::test]
    async fn test_acquire_token_silent_defaults_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let clock = fixed_clock();
        let provider = OAuthIdentityProvider::new(
            &format!("{}/token", server.uri()),
            "client-1",
            "long-lived",
            clock.clone(),
        )
        .unwrap();

        let token = provider.acquire_token_silent(&scope()).await.unwrap();
        assert_eq!(
            token.expires_at,
            clock.now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        );
    }

    #[tokio::test]
    async fn test_acquire_token_silent_provider_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let provider = OAuthIdentityProvider::new(
            &format!("{}/token", server.uri()),
            "client-1",
            "revoked",
            fixed_clock(),
        )
        .unwrap();

        assert!(provider.acquire_token_silent(&scope()).await.is_err());
    }

    #[test]
    fn test_from_config_requires_endpoint_and_credentials() {
        let auth = AuthConfig::default();
        assert!(OAuthIdentityProvider::from_config(&auth, fixed_clock()).is_err());

        let auth = AuthConfig {
            token_url: Some("https://login.example.com/token".to_string()),
            client_id: Some("client-1".to_string()),
            scope: None,
            refresh_token: Some("long-lived".to_string()),
        };
        assert!(OAuthIdentityProvider::from_config(&auth, fixed_clock()).is_ok());
    }
}
