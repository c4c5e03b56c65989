use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use shared::domain::Username;
use tracing::{info, warn};

use crate::{
    credential_store::CredentialStore,
    error::{AuthError, ClientError, StoreError},
    identity::{Credentials, IdentityProvider},
    routing::{self, AuthState, Navigation, Route},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: Username,
    pub role: Option<String>,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    identity: Option<Identity>,
    credential: Option<String>,
    authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    fn authenticated(token: String, identity: Option<Identity>, at: DateTime<Utc>) -> Self {
        Self {
            authenticated: true,
            identity,
            credential: Some(token),
            authenticated_at: Some(at),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.authenticated)
            .field("identity", &self.identity)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("authenticated_at", &self.authenticated_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
}

/// Reads the claims of a JWT-shaped credential without checking its
/// signature. Only the issuer can verify it; the client uses the claims for
/// display and for dropping already-expired tokens.
fn peek_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

fn identity_from_claims(claims: &TokenClaims) -> Option<Identity> {
    let username = claims.sub.as_ref().filter(|sub| !sub.trim().is_empty())?;
    Some(Identity {
        username: Username(username.clone()),
        role: claims.role.clone(),
    })
}

/// Owner of the client session and its durable credential.
///
/// Components that need the credential receive the guard explicitly; the
/// guard is the only writer of the credential store.
pub struct SessionGuard {
    session: Session,
    store: Arc<dyn CredentialStore>,
}

impl SessionGuard {
    /// Starts unauthenticated and adopts a stored credential if one exists.
    ///
    /// A stored token is trusted optimistically until a protected request
    /// rejects it, unless its own `exp` claim already lies in the past.
    pub fn hydrate(store: Arc<dyn CredentialStore>) -> Self {
        let mut guard = Self {
            session: Session::default(),
            store,
        };

        let Some(stored) = guard.store.load() else {
            return guard;
        };

        let claims = peek_claims(&stored.token);
        if let Some(exp) = claims.as_ref().and_then(|c| c.exp) {
            if exp <= Utc::now().timestamp() {
                warn!("session: stored credential expired; discarding");
                if let Err(err) = guard.store.clear() {
                    warn!("session: failed to clear expired credential: {err}");
                }
                return guard;
            }
        }

        let identity = claims.as_ref().and_then(identity_from_claims);
        info!(
            username = identity.as_ref().map(|i| i.username.as_str()).unwrap_or("<unknown>"),
            "session: hydrated from stored credential"
        );
        guard.session = Session::authenticated(stored.token, identity, stored.saved_at);
        guard
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.authenticated
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState::from_flag(self.session.authenticated)
    }

    /// Credential to attach to protected requests, if any.
    pub fn bearer(&self) -> Option<&str> {
        if self.session.authenticated {
            self.session.credential.as_deref()
        } else {
            None
        }
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        routing::navigate(self.auth_state(), routing::classify(path))
    }

    pub fn resolve(&self, path: &str) -> Route {
        routing::resolve(self.auth_state(), path)
    }

    pub async fn login(
        &mut self,
        provider: &dyn IdentityProvider,
        credentials: &Credentials,
    ) -> Result<&Session, ClientError> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }

        let grant = provider.exchange(credentials).await?;
        self.store.save(&grant.access_token)?;

        let identity = peek_claims(&grant.access_token)
            .as_ref()
            .and_then(identity_from_claims)
            .unwrap_or_else(|| Identity {
                username: Username(credentials.username.trim().to_string()),
                role: None,
            });
        self.session = Session::authenticated(grant.access_token, Some(identity), Utc::now());
        info!(username = %credentials.username.trim(), "session: logged in");
        Ok(&self.session)
    }

    /// Clears the in-memory session before touching the store, so a failing
    /// store never leaves a usable credential behind.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.session = Session::default();
        info!("session: logged out");
        self.store.clear()
    }

    /// Drops a credential the service refused.
    pub fn invalidate(&mut self) {
        if !self.session.authenticated {
            return;
        }
        warn!("session: credential rejected by service; clearing session");
        if let Err(err) = self.logout() {
            warn!("session: failed to clear rejected credential: {err}");
        }
    }

    /// Confirms the current credential against the identity service and
    /// refreshes the identity from the profile it returns.
    pub async fn verify(&mut self, provider: &dyn IdentityProvider) -> Result<Identity, ClientError> {
        let token = self
            .bearer()
            .map(str::to_string)
            .ok_or(AuthError::NotAuthenticated)?;

        match provider.profile(&token).await {
            Ok(profile) => {
                let identity = Identity {
                    username: Username(profile.username),
                    role: profile.role,
                };
                self.session.identity = Some(identity.clone());
                Ok(identity)
            }
            Err(AuthError::CredentialRejected) => {
                self.invalidate();
                Err(AuthError::CredentialRejected.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
