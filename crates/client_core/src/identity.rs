use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use shared::{
    error::ServiceError,
    protocol::{PasswordForm, TokenGrant, UserProfile},
};
use tracing::{info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{AuthError, ClientError, TransportError},
};

const INVALID_CREDENTIALS_FALLBACK: &str = "Incorrect username or password";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token issuer consulted by the session guard.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, AuthError>;
    async fn profile(&self, token: &str) -> Result<UserProfile, AuthError>;
}

pub struct HttpIdentityProvider {
    http: Client,
    token_url: Url,
    profile_url: Url,
}

impl HttpIdentityProvider {
    pub fn new(http: Client, token_url: Url, profile_url: Url) -> Self {
        Self {
            http,
            token_url,
            profile_url,
        }
    }

    pub fn from_settings(http: Client, settings: &ClientSettings) -> Result<Self, ClientError> {
        Ok(Self::new(http, settings.token_url()?, settings.profile_url()?))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, AuthError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&PasswordForm {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.bytes().await.unwrap_or_default();
            let err = ServiceError::from_body(status.as_u16(), &body, INVALID_CREDENTIALS_FALLBACK);
            warn!(username = %credentials.username, status = err.status, "identity: login rejected");
            return Err(AuthError::InvalidCredentials(err.message));
        }
        if !status.is_success() {
            return Err(TransportError::from_status(status).into());
        }

        let grant: TokenGrant = response.json().await.map_err(TransportError::from)?;
        if grant.access_token.trim().is_empty() {
            return Err(TransportError::MalformedBody("empty access_token".into()).into());
        }
        if !grant.token_type.eq_ignore_ascii_case("bearer") {
            warn!(token_type = %grant.token_type, "identity: unexpected token type");
        }
        info!(username = %credentials.username, "identity: token issued");
        Ok(grant)
    }

    async fn profile(&self, token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(self.profile_url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(TransportError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::CredentialRejected);
        }
        let response = response.error_for_status().map_err(TransportError::from)?;
        Ok(response.json().await.map_err(TransportError::from)?)
    }
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
