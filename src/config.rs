//! Client configuration
//!
//! A deployment runs exactly one authentication scheme: bearer tokens with
//! a local login form, or a browser-managed session cookie validated
//! against an external SSO portal. The scheme is picked here, at
//! configuration time; the rest of the crate depends only on the session
//! and gateway contracts.

use std::fmt;
use std::time::Duration;

use url::Url;

/// How the deployment authenticates requests.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// Bearer token persisted client-side and attached to every request.
    /// `login`/`register` exchange credentials for the token.
    Token {
        /// Local route the embedder navigates to when the session is lost.
        login_route: String,
    },
    /// Session cookie managed by the browser/cookie jar. No local token,
    /// no local login form; a lost session redirects to the SSO portal.
    CookieSso {
        /// External login portal, including any redirect-back parameters.
        portal_url: Url,
    },
}

impl AuthScheme {
    pub fn token(login_route: impl Into<String>) -> Self {
        AuthScheme::Token { login_route: login_route.into() }
    }

    pub fn cookie_sso(portal_url: Url) -> Self {
        AuthScheme::CookieSso { portal_url }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, AuthScheme::Token { .. })
    }

    /// Where the embedder must navigate once the session is gone.
    pub fn redirect_target(&self) -> RedirectTarget {
        match self {
            AuthScheme::Token { login_route } => RedirectTarget::LocalLogin(login_route.clone()),
            AuthScheme::CookieSso { portal_url } => RedirectTarget::SsoPortal(portal_url.clone()),
        }
    }

    /// Session-check endpoint. The token backend exposes `/auth/me`, the
    /// SSO gateway exposes `/auth/validate`.
    pub(crate) fn session_check_path(&self) -> &'static str {
        match self {
            AuthScheme::Token { .. } => "/auth/me",
            AuthScheme::CookieSso { .. } => "/auth/validate",
        }
    }
}

/// Typed navigation outcome. The gateway never navigates by itself; it
/// hands one of these to the embedding shell, which performs the actual
/// redirect. Repeated auth failures produce the same target, so executing
/// the last one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    LocalLogin(String),
    SsoPortal(Url),
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::LocalLogin(route) => write!(f, "{}", route),
            RedirectTarget::SsoPortal(url) => write!(f, "{}", url),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base, e.g. `https://cloud.example.com/api`.
    pub base_url: Url,
    pub auth: AuthScheme,
    /// Upper bound for a whole request. Expiry surfaces as a transport
    /// failure, never as an auth failure.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Some backends report auth failures as HTTP 422 with a message
    /// substring instead of a clean 401. A 422 whose message contains one
    /// of these patterns is treated exactly like 401. Clear the list to
    /// disable the compensation.
    pub auth_error_patterns: Vec<String>,
}

impl ClientConfig {
    pub fn new(base_url: Url, auth: AuthScheme) -> Self {
        Self {
            base_url,
            auth,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            auth_error_patterns: default_auth_error_patterns(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Message substrings the known backend emits for malformed or missing
/// bearer credentials on 422 responses.
pub fn default_auth_error_patterns() -> Vec<String> {
    vec![
        "Subject must be a string".to_string(),
        "Missing Authorization Header".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_redirect_targets() {
        let token = AuthScheme::token("/login");
        assert!(token.is_token());
        assert_eq!(
            token.redirect_target(),
            RedirectTarget::LocalLogin("/login".to_string())
        );

        let portal = Url::parse("https://sso.example.com/login?redirect=/eucloud").unwrap();
        let sso = AuthScheme::cookie_sso(portal.clone());
        assert!(!sso.is_token());
        assert_eq!(sso.redirect_target(), RedirectTarget::SsoPortal(portal));
    }

    #[test]
    fn test_session_check_path_per_scheme() {
        assert_eq!(AuthScheme::token("/login").session_check_path(), "/auth/me");
        let portal = Url::parse("https://sso.example.com/login").unwrap();
        assert_eq!(AuthScheme::cookie_sso(portal).session_check_path(), "/auth/validate");
    }
}
