//! Admin bearer-token lifecycle.
//!
//! # Design
//! `CliAuth` exchanges the admin username/password from the endpoint for an
//! access token via the `admin-cli` client and caches the result. A cached
//! token is reused while the validity predicate accepts it. Renewal replaces
//! the whole `TokenState`; it is never patched in place.
//!
//! The state lock is never held across an `.await`. Two tasks racing on an
//! expired token may both run an exchange; the last one to finish wins.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use url::form_urlencoded;

use crate::config::ClientOptions;
use crate::endpoint::{CredentialResolver, Endpoint};
use crate::error::{ApiError, ConfigError};
use crate::http::{HttpMethod, HttpRequest};
use crate::request::segment;
use crate::response::Dispatcher;
use crate::types::TokenResponse;

const ADMIN_CLIENT_ID: &str = "admin-cli";

/// Decides whether a raw access token is still usable.
pub type TokenValidation = Arc<dyn Fn(&str) -> Result<bool, ConfigError> + Send + Sync>;

/// Default predicate: the JWT `exp` claim must lie in the future.
///
/// The signature is not verified; the server does that.
pub fn default_token_validation(token: &str) -> Result<bool, ConfigError> {
    #[derive(Deserialize)]
    struct Claims {
        exp: Option<f64>,
    }

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ConfigError::MalformedToken("missing payload segment".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ConfigError::MalformedToken(e.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| ConfigError::MalformedToken(e.to_string()))?;
    let exp = claims.exp.ok_or(ConfigError::MissingExpiry)?;

    let now = Utc::now().timestamp_millis() as f64 / 1000.0;
    Ok(exp > now)
}

/// Cached result of the last successful token exchange.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub response: TokenResponse,
}

impl TokenState {
    fn from_response(response: TokenResponse) -> Self {
        let lifetime = i64::try_from(response.expires_in)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        let expires_at = Utc::now()
            .checked_add_signed(Duration::seconds(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            access_token: response.access_token.clone(),
            expires_at,
            response,
        }
    }
}

/// Anything that can hand out a currently valid admin access token.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// Token manager for the Keycloak `admin-cli` password grant.
pub struct CliAuth {
    resolver: Arc<CredentialResolver>,
    dispatcher: Dispatcher,
    token_validation: TokenValidation,
    state: RwLock<Option<TokenState>>,
}

impl CliAuth {
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Self {
        Self::with_resolver(Arc::new(CredentialResolver::new(endpoint)), options)
    }

    /// Build on an existing resolver so the endpoint is resolved once for
    /// everything sharing it.
    pub fn with_resolver(resolver: Arc<CredentialResolver>, options: ClientOptions) -> Self {
        Self {
            resolver,
            dispatcher: Dispatcher::new(options),
            token_validation: Arc::new(default_token_validation),
            state: RwLock::new(None),
        }
    }

    pub fn resolver(&self) -> Arc<CredentialResolver> {
        self.resolver.clone()
    }

    /// Replace the validity predicate (e.g. "always valid" for replayed tokens).
    pub fn with_token_validation(mut self, validation: TokenValidation) -> Self {
        self.token_validation = validation;
        self
    }

    /// Return a valid access token, exchanging credentials if needed.
    pub async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.current(false).await?.access_token)
    }

    /// Make sure a valid token is cached. `force_new_login` always runs a
    /// fresh exchange, which makes it a connection check.
    pub async fn login(&self, force_new_login: bool) -> Result<(), ApiError> {
        self.current(force_new_login).await.map(|_| ())
    }

    /// Snapshot of the cached state; never triggers an exchange.
    pub fn token_state(&self) -> Option<TokenState> {
        self.state.read().clone()
    }

    async fn current(&self, force: bool) -> Result<TokenState, ApiError> {
        if !force {
            let cached = self.state.read().clone();
            if let Some(state) = cached {
                if (self.token_validation)(&state.access_token)? {
                    return Ok(state);
                }
                self.dispatcher.log(|| "access token expired, renewing".to_string());
            }
        }
        let fresh = self.exchange().await?;
        *self.state.write() = Some(fresh.clone());
        Ok(fresh)
    }

    async fn exchange(&self) -> Result<TokenState, ApiError> {
        let creds = self.resolver.resolve().await?;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", &creds.username)
            .append_pair("password", &creds.password)
            .append_pair("client_id", ADMIN_CLIENT_ID)
            .finish();
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: format!(
                "{}/realms/{}/protocol/openid-connect/token",
                creds.base,
                segment(&creds.realm)
            ),
            headers: vec![
                (
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
                ("content-length".to_string(), body.len().to_string()),
            ],
            body: Some(body),
        };
        let response: TokenResponse = self
            .dispatcher
            .fetch_json(request, "get access token", &creds.realm)
            .await?;
        Ok(TokenState::from_response(response))
    }
}

impl fmt::Debug for CliAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliAuth")
            .field("resolver", &self.resolver)
            .field("authenticated", &self.state.read().is_some())
            .finish()
    }
}

#[async_trait]
impl AccessTokenSource for CliAuth {
    async fn access_token(&self) -> Result<String, ApiError> {
        // Inherent method, not this trait method.
        CliAuth::access_token(self).await
    }
}
