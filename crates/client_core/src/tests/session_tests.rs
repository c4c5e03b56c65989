use super::*;

use std::sync::Mutex;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use shared::protocol::{TokenGrant, UserProfile};

use crate::{
    credential_store::{FileCredentialStore, MemoryCredentialStore},
    error::TransportError,
};

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    role: &'a str,
    exp: i64,
}

fn jwt(sub: &str, exp_offset_secs: i64) -> String {
    let claims = TestClaims {
        sub,
        role: "admin",
        exp: Utc::now().timestamp() + exp_offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"issuer-secret"),
    )
    .expect("encode jwt")
}

enum ProfileReply {
    Ok(UserProfile),
    Rejected,
    Unreachable,
}

struct TestIdentityProvider {
    grant: Option<String>,
    profile: ProfileReply,
    exchange_calls: Mutex<u32>,
}

impl TestIdentityProvider {
    fn granting(token: impl Into<String>) -> Self {
        Self {
            grant: Some(token.into()),
            profile: ProfileReply::Unreachable,
            exchange_calls: Mutex::new(0),
        }
    }

    fn refusing() -> Self {
        Self {
            grant: None,
            profile: ProfileReply::Rejected,
            exchange_calls: Mutex::new(0),
        }
    }

    fn with_profile(mut self, profile: ProfileReply) -> Self {
        self.profile = profile;
        self
    }

    fn exchange_calls(&self) -> u32 {
        *self.exchange_calls.lock().expect("lock")
    }
}

#[async_trait]
impl IdentityProvider for TestIdentityProvider {
    async fn exchange(&self, _credentials: &Credentials) -> Result<TokenGrant, AuthError> {
        *self.exchange_calls.lock().expect("lock") += 1;
        match &self.grant {
            Some(token) => Ok(TokenGrant {
                access_token: token.clone(),
                token_type: "bearer".into(),
            }),
            None => Err(AuthError::InvalidCredentials(
                "Incorrect username or password".into(),
            )),
        }
    }

    async fn profile(&self, _token: &str) -> Result<UserProfile, AuthError> {
        match &self.profile {
            ProfileReply::Ok(profile) => Ok(profile.clone()),
            ProfileReply::Rejected => Err(AuthError::CredentialRejected),
            ProfileReply::Unreachable => Err(TransportError::Timeout.into()),
        }
    }
}

#[test]
fn starts_unauthenticated_without_stored_credential() {
    let guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::new()));
    assert!(!guard.is_authenticated());
    assert!(guard.bearer().is_none());
    assert_eq!(guard.navigate("/"), Navigation::Redirect(Route::Login));
    assert_eq!(guard.resolve("/anything"), Route::Login);
}

#[test]
fn opaque_stored_token_is_trusted_optimistically() {
    let guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::with_token("opaque")));
    assert!(guard.is_authenticated());
    assert_eq!(guard.bearer(), Some("opaque"));
    assert!(guard.session().identity().is_none());
    assert_eq!(guard.navigate("/login"), Navigation::Redirect(Route::Workflow));
}

#[test]
fn hydrated_session_keeps_original_login_time() {
    let store = Arc::new(MemoryCredentialStore::with_token("opaque"));
    let saved_at = store.load().expect("stored").saved_at;
    let guard = SessionGuard::hydrate(store);
    assert_eq!(guard.session().authenticated_at(), Some(saved_at));
}

#[test]
fn session_debug_output_redacts_credential() {
    let guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::with_token(
        "super-secret-token",
    )));
    let rendered = format!("{:?}", guard.session());
    assert!(!rendered.contains("super-secret-token"), "{rendered}");
    assert!(rendered.contains("<redacted>"));

    let anonymous = format!("{:?}", Session::default());
    assert!(anonymous.contains("credential: None"), "{anonymous}");
}

#[test]
fn hydrated_jwt_exposes_identity() {
    let token = jwt("admin", 600);
    let guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::with_token(token)));
    let identity = guard.session().identity().expect("identity");
    assert_eq!(identity.username.as_str(), "admin");
    assert_eq!(identity.role.as_deref(), Some("admin"));
}

#[test]
fn expired_stored_token_is_discarded() {
    let store = Arc::new(MemoryCredentialStore::with_token(jwt("admin", -60)));
    let guard = SessionGuard::hydrate(store.clone());
    assert!(!guard.is_authenticated());
    assert!(store.load().is_none());
}

#[tokio::test]
async fn login_persists_credential_and_admits_workflow() {
    let store = Arc::new(MemoryCredentialStore::new());
    let mut guard = SessionGuard::hydrate(store.clone());
    let provider = TestIdentityProvider::granting("opaque-token");

    let session = guard
        .login(&provider, &Credentials::new("alice", "pw"))
        .await
        .expect("login");
    assert!(session.is_authenticated());
    assert_eq!(
        session.identity().map(|i| i.username.as_str()),
        Some("alice")
    );
    assert_eq!(store.load().expect("stored").token, "opaque-token");
    assert_eq!(guard.navigate("/"), Navigation::Admit(Route::Workflow));
}

#[tokio::test]
async fn failed_login_surfaces_reason_and_persists_nothing() {
    let store = Arc::new(MemoryCredentialStore::new());
    let mut guard = SessionGuard::hydrate(store.clone());

    let err = guard
        .login(&TestIdentityProvider::refusing(), &Credentials::new("alice", "bad"))
        .await
        .expect_err("must fail");

    assert_eq!(err.to_string(), "Incorrect username or password");
    assert!(err.requires_reauth());
    assert!(!guard.is_authenticated());
    assert!(store.load().is_none());
}

#[tokio::test]
async fn blank_credentials_never_reach_identity_service() {
    let mut guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::new()));
    let provider = TestIdentityProvider::granting("token");

    let err = guard
        .login(&provider, &Credentials::new("  ", "pw"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::Auth(AuthError::MissingCredentials)));
    assert_eq!(provider.exchange_calls(), 0);
}

#[test]
fn logout_clears_session_and_store() {
    let store = Arc::new(MemoryCredentialStore::with_token("opaque"));
    let mut guard = SessionGuard::hydrate(store.clone());

    guard.logout().expect("logout");
    assert!(!guard.is_authenticated());
    assert!(guard.bearer().is_none());
    assert!(store.load().is_none());
}

#[tokio::test]
async fn credential_survives_reload_through_file_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("credential.json");

    let mut first = SessionGuard::hydrate(Arc::new(FileCredentialStore::new(&path)));
    first
        .login(
            &TestIdentityProvider::granting(jwt("bob", 600)),
            &Credentials::new("bob", "pw"),
        )
        .await
        .expect("login");
    drop(first);

    let reloaded = SessionGuard::hydrate(Arc::new(FileCredentialStore::new(&path)));
    assert!(reloaded.is_authenticated());
    assert_eq!(
        reloaded.session().identity().map(|i| i.username.as_str()),
        Some("bob")
    );
}

#[tokio::test]
async fn rejected_verification_invalidates_session() {
    let store = Arc::new(MemoryCredentialStore::with_token("stale"));
    let mut guard = SessionGuard::hydrate(store.clone());
    let provider = TestIdentityProvider::granting("unused").with_profile(ProfileReply::Rejected);

    let err = guard.verify(&provider).await.expect_err("must fail");
    assert!(err.requires_reauth());
    assert!(!guard.is_authenticated());
    assert!(store.load().is_none());
}

#[tokio::test]
async fn unreachable_profile_keeps_session() {
    let mut guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::with_token("opaque")));
    let provider = TestIdentityProvider::granting("unused");

    let err = guard.verify(&provider).await.expect_err("must fail");
    assert!(!err.requires_reauth());
    assert!(guard.is_authenticated());
}

#[tokio::test]
async fn verification_refreshes_identity() {
    let mut guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::with_token("opaque")));
    let provider = TestIdentityProvider::granting("unused").with_profile(ProfileReply::Ok(
        UserProfile {
            username: "carol".into(),
            role: Some("analyst".into()),
        },
    ));

    let identity = guard.verify(&provider).await.expect("verify");
    assert_eq!(identity.username.as_str(), "carol");
    assert_eq!(guard.session().identity(), Some(&identity));
}

#[tokio::test]
async fn verify_requires_session() {
    let mut guard = SessionGuard::hydrate(Arc::new(MemoryCredentialStore::new()));
    let err = guard
        .verify(&TestIdentityProvider::refusing())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::Auth(AuthError::NotAuthenticated)));
}
