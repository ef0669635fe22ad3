//! Session state and lifecycle
//!
//! Exactly one [`Session`] exists per client. It is created unresolved,
//! transitions to Authenticated or Unauthenticated when the session check
//! resolves, and is torn down on logout or on any 401 observed anywhere in
//! the request pipeline. Only the [`SessionManager`] (and the gateway's
//! global auth policy) mutate it; everything else reads snapshots.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::RedirectTarget;
use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Startup state, before the first session check resolves.
    #[default]
    Unresolved,
    Authenticated,
    Unauthenticated,
}

/// The process-wide record of whether, and as whom, the user is
/// authenticated.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub status: SessionStatus,
    pub principal: Option<User>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Shared, mutation-guarded access to the one session record.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.read().await.status
    }

    pub(crate) async fn set_authenticated(&self, principal: User) {
        let mut session = self.inner.write().await;
        session.status = SessionStatus::Authenticated;
        session.principal = Some(principal);
    }

    /// Tear the session down. Returns `true` only on an actual transition,
    /// so a burst of concurrent 401s logs and reacts once.
    pub(crate) async fn mark_unauthenticated(&self) -> bool {
        let mut session = self.inner.write().await;
        let transitioned = session.status != SessionStatus::Unauthenticated;
        session.status = SessionStatus::Unauthenticated;
        session.principal = None;
        transitioned
    }
}

/// Single source of truth for the bearer credential under the token
/// scheme. Set at login, read by the gateway at request time, cleared at
/// logout or on any 401/treated-as-401 response. No other copies exist.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<SecretString>>>,
}

impl TokenStore {
    pub(crate) async fn set(&self, token: SecretString) {
        *self.inner.write().await = Some(token);
    }

    /// Clear the stored token, reporting whether one was present.
    pub(crate) async fn clear(&self) -> bool {
        self.inner.write().await.take().is_some()
    }

    pub(crate) async fn get(&self) -> Option<SecretString> {
        self.inner.read().await.clone()
    }

    pub async fn is_set(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

// ─── Wire shapes ─────────────────────────────────────────────────────────

/// Session-check answer. The SSO gateway answers `{valid, user}`, the
/// token backend plain `{user}`; both decode here.
#[derive(Debug, Deserialize)]
struct SessionCheckResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    user: User,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

// ─── Manager ─────────────────────────────────────────────────────────────

/// Resolves and owns authentication state; gates all other activity.
pub struct SessionManager {
    gateway: Arc<ApiGateway>,
    session: SessionHandle,
}

impl SessionManager {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let session = gateway.session();
        Self { gateway, session }
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Re-validate the session against the backend. Entry action at
    /// startup, also callable at any point later.
    ///
    /// A valid principal transitions to Authenticated. A 401 (handled by
    /// the gateway) or a well-formed answer without a principal
    /// transitions to Unauthenticated and carries the redirect target.
    /// Transport failures fail soft under the token scheme (prior state
    /// kept) and fail closed under cookie SSO, where a network blip is
    /// indistinguishable from a server-side session loss.
    pub async fn refresh(&self) -> Result<Session, ApiError> {
        let path = self.gateway.auth_scheme().session_check_path();
        match self.gateway.get_json::<SessionCheckResponse>(path, &[]).await {
            Ok(resp) => {
                let valid = resp.valid.unwrap_or(resp.user.is_some());
                match resp.user {
                    Some(user) if valid => {
                        info!("Session valid for {}", user.email);
                        self.session.set_authenticated(user).await;
                        Ok(self.session.snapshot().await)
                    }
                    _ => {
                        debug!("Session check answered without a valid principal");
                        self.session.mark_unauthenticated().await;
                        Err(ApiError::Unauthorized {
                            redirect: self.gateway.auth_scheme().redirect_target(),
                        })
                    }
                }
            }
            Err(err) if err.is_transport() && !self.gateway.auth_scheme().is_token() => {
                warn!("Session validation unreachable, failing closed: {}", err);
                self.session.mark_unauthenticated().await;
                Err(ApiError::Unauthorized {
                    redirect: self.gateway.auth_scheme().redirect_target(),
                })
            }
            // Token scheme: a flaky network must not terminate the session.
            Err(err) => Err(err),
        }
    }

    /// Exchange credentials for a bearer token. Token scheme only; under
    /// cookie SSO the portal owns credential entry.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        self.require_token_scheme("login")?;
        let resp: AuthResponse = self
            .gateway
            .post_json("/auth/login", &Credentials { email, password })
            .await?;
        self.install_token_session(resp).await
    }

    /// Create an account and log in. Token scheme only.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        self.require_token_scheme("register")?;
        let resp: AuthResponse = self
            .gateway
            .post_json("/auth/register", &Credentials { email, password })
            .await?;
        self.install_token_session(resp).await
    }

    /// End the session. The logout endpoint is best-effort; local state is
    /// always cleared and the redirect target returned for the embedder to
    /// execute. Under cookie SSO actual session termination is the
    /// portal's job.
    pub async fn logout(&self) -> RedirectTarget {
        if let Err(err) = self.gateway.post_empty("/auth/logout").await {
            warn!("Logout endpoint failed (continuing local cleanup): {}", err);
        }
        self.gateway.tokens().clear().await;
        self.session.mark_unauthenticated().await;
        info!("Logged out");
        self.gateway.auth_scheme().redirect_target()
    }

    async fn install_token_session(&self, resp: AuthResponse) -> Result<User, ApiError> {
        self.gateway
            .tokens()
            .set(SecretString::from(resp.access_token))
            .await;
        self.session.set_authenticated(resp.user.clone()).await;
        info!("Authenticated as {}", resp.user.email);
        Ok(resp.user)
    }

    fn require_token_scheme(&self, operation: &str) -> Result<(), ApiError> {
        if self.gateway.auth_scheme().is_token() {
            Ok(())
        } else {
            Err(ApiError::Unsupported(format!(
                "{} is handled by the SSO portal under the cookie scheme",
                operation
            )))
        }
    }
}

/// Expose the secret only at header-building time.
pub(crate) fn bearer_value(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthScheme, ClientConfig};
    use url::Url;

    fn cookie_manager() -> SessionManager {
        let portal = Url::parse("https://sso.example.com/login?redirect=/eucloud").unwrap();
        let config = ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::cookie_sso(portal),
        );
        SessionManager::new(ApiGateway::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_session_starts_unresolved() {
        let handle = SessionHandle::default();
        let session = handle.snapshot().await;
        assert_eq!(session.status, SessionStatus::Unresolved);
        assert!(session.principal.is_none());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_mark_unauthenticated_transitions_once() {
        let handle = SessionHandle::default();
        assert!(handle.mark_unauthenticated().await);
        assert!(!handle.mark_unauthenticated().await);
        assert_eq!(handle.status().await, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_token_store_lifecycle() {
        let store = TokenStore::default();
        assert!(!store.is_set().await);
        assert!(!store.clear().await);

        store.set(SecretString::from("tok".to_string())).await;
        assert!(store.is_set().await);
        assert!(store.clear().await);
        assert!(!store.is_set().await);
    }

    #[tokio::test]
    async fn test_login_rejected_under_cookie_sso() {
        let manager = cookie_manager();
        let err = manager.login("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Unsupported(_)));
        let err = manager.register("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Unsupported(_)));
    }

    #[test]
    fn test_session_check_decodes_both_shapes() {
        let sso: SessionCheckResponse = serde_json::from_str(
            r#"{"valid": true, "user": {"user_id": 1, "email": "a@b.c"}}"#,
        )
        .unwrap();
        assert_eq!(sso.valid, Some(true));
        assert!(sso.user.is_some());

        let token: SessionCheckResponse =
            serde_json::from_str(r#"{"user": {"user_id": 1, "email": "a@b.c"}}"#).unwrap();
        assert_eq!(token.valid, None);
        assert!(token.user.is_some());

        // Valid flag present but false: principal must be ignored.
        let invalid: SessionCheckResponse = serde_json::from_str(
            r#"{"valid": false, "user": {"user_id": 1, "email": "a@b.c"}}"#,
        )
        .unwrap();
        assert_eq!(invalid.valid, Some(false));
    }
}
