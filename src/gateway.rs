//! API gateway
//!
//! The single choke point every backend call flows through. Injects
//! credentials per the configured scheme, decodes each endpoint's response
//! into its typed shape at this boundary, and enforces the global
//! unauthorized policy: any 401 (or a 422 matching the configured
//! auth-quirk patterns) clears the local credential, tears the session
//! down, and surfaces a typed redirect for the embedder to execute.

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{AuthScheme, ClientConfig};
use crate::error::ApiError;
use crate::session::{bearer_value, SessionHandle, TokenStore};

pub struct ApiGateway {
    config: ClientConfig,
    client: reqwest::Client,
    tokens: TokenStore,
    session: SessionHandle,
}

impl ApiGateway {
    pub fn new(config: ClientConfig) -> Result<Arc<Self>, ApiError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout);
        // Cookie jar only under SSO. Token deployments never send cookies,
        // SSO deployments never send a bearer header; a deployment uses
        // exactly one scheme.
        if !config.auth.is_token() {
            builder = builder.cookie_store(true);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("HTTP client: {}", e)))?;
        Ok(Arc::new(Self {
            config,
            client,
            tokens: TokenStore::default(),
            session: SessionHandle::default(),
        }))
    }

    pub fn auth_scheme(&self) -> &AuthScheme {
        &self.config.auth
    }

    pub fn tokens(&self) -> TokenStore {
        self.tokens.clone()
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    // ─── Request surface ─────────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut req = self.client.get(self.absolute(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = self.execute(req).await?;
        Self::decode(path, resp).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.client.post(self.absolute(path)).json(body);
        let resp = self.execute(req).await?;
        Self::decode(path, resp).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.client.put(self.absolute(path)).json(body);
        let resp = self.execute(req).await?;
        Self::decode(path, resp).await
    }

    /// POST without a body, decoding the response.
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.client.post(self.absolute(path));
        let resp = self.execute(req).await?;
        Self::decode(path, resp).await
    }

    /// POST without a body, ignoring the response payload.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let req = self.client.post(self.absolute(path));
        self.execute(req).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let req = self.client.delete(self.absolute(path));
        self.execute(req).await?;
        Ok(())
    }

    /// Multipart POST. The transport sets the content-type (with boundary)
    /// itself; it is never overridden here.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let req = self.client.post(self.absolute(path)).multipart(form);
        let resp = self.execute(req).await?;
        Self::decode(path, resp).await
    }

    /// GET returning the checked raw response, for byte streaming.
    pub async fn get_stream(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ApiError> {
        let mut req = self.client.get(self.absolute(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        self.execute(req).await
    }

    /// Absolute URL for a resource fetched outside the gateway pipeline
    /// (inline previews). Under the token scheme the credential travels as
    /// a query parameter, matching the backend's preview contract.
    pub async fn resource_url(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.absolute(path))
            .map_err(|e| ApiError::InvalidConfig(format!("resource URL: {}", e)))?;
        if self.config.auth.is_token() {
            if let Some(token) = self.tokens.get().await {
                use secrecy::ExposeSecret;
                url.query_pairs_mut().append_pair("token", token.expose_secret());
            }
        }
        Ok(url)
    }

    // ─── Pipeline ────────────────────────────────────────────────────────

    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let req = self.authorize(req).await;
        let resp = req.send().await.map_err(ApiError::from_reqwest)?;
        self.check(resp).await
    }

    /// Attach the bearer token under the token scheme. The token store is
    /// read here, at call time, and nowhere else.
    async fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        if !self.config.auth.is_token() {
            return req;
        }
        match self.tokens.get().await {
            Some(token) => req.header(AUTHORIZATION, bearer_value(&token)),
            None => req,
        }
    }

    async fn check(&self, resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let method_url = format!("{}", resp.url());
        let body = resp.text().await.unwrap_or_default();
        let message = extract_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        if status == StatusCode::UNAUTHORIZED
            || (status == StatusCode::UNPROCESSABLE_ENTITY && self.is_auth_quirk(&message))
        {
            debug!("{} answered {} ({})", method_url, status, message);
            return Err(self.auth_failure().await);
        }

        Err(ApiError::Api { status: status.as_u16(), message })
    }

    /// Global unauthorized policy. Idempotent: the token is cleared at
    /// most once and the session transitions at most once per failure
    /// burst; every caller still receives the same redirect target.
    pub(crate) async fn auth_failure(&self) -> ApiError {
        let had_token = self.tokens.clear().await;
        let transitioned = self.session.mark_unauthenticated().await;
        if transitioned {
            info!("Session invalidated (token cleared: {})", had_token);
        }
        ApiError::Unauthorized { redirect: self.config.auth.redirect_target() }
    }

    fn is_auth_quirk(&self, message: &str) -> bool {
        self.config
            .auth_error_patterns
            .iter()
            .any(|pattern| message.contains(pattern.as_str()))
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ApiError> {
        let bytes = resp.bytes().await.map_err(ApiError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            endpoint: path.to_string(),
            detail: e.to_string(),
        })
    }

    fn absolute(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Pull a human-readable message out of an error body. The backend answers
/// FastAPI-style `{"detail": ...}`, with `{"error"|"msg"|"message": ...}`
/// seen from older route handlers.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "error", "msg", "message"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            // Validation errors arrive as an array of objects; keep the
            // first entry's text.
            Some(serde_json::Value::Array(items)) => {
                if let Some(first) = items.first() {
                    if let Some(msg) = first.get("msg").and_then(|m| m.as_str()) {
                        return Some(msg.to_string());
                    }
                    return Some(first.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_auth_error_patterns, AuthScheme, RedirectTarget};
    use crate::session::SessionStatus;
    use secrecy::SecretString;

    fn token_gateway() -> Arc<ApiGateway> {
        let config = ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::token("/login"),
        );
        ApiGateway::new(config).unwrap()
    }

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(
            extract_message(r#"{"detail": "Storage quota exceeded"}"#).as_deref(),
            Some("Storage quota exceeded")
        );
        assert_eq!(
            extract_message(r#"{"error": "Folder is not empty"}"#).as_deref(),
            Some("Folder is not empty")
        );
        assert_eq!(
            extract_message(r#"{"msg": "Missing Authorization Header"}"#).as_deref(),
            Some("Missing Authorization Header")
        );
        // FastAPI validation arrays keep the first entry's text.
        assert_eq!(
            extract_message(r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#)
                .as_deref(),
            Some("field required")
        );
        assert_eq!(extract_message("not json"), None);
        assert_eq!(extract_message(r#"{"other": 1}"#), None);
    }

    #[test]
    fn test_auth_quirk_patterns_configurable() {
        let gateway = token_gateway();
        assert!(gateway.is_auth_quirk("422 Unprocessable Entity: Subject must be a string"));
        assert!(gateway.is_auth_quirk("Missing Authorization Header"));
        assert!(!gateway.is_auth_quirk("field required"));

        // Emptied patterns disable the compensation without touching call
        // sites.
        let mut config = ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::token("/login"),
        );
        config.auth_error_patterns.clear();
        let gateway = ApiGateway::new(config).unwrap();
        assert!(!gateway.is_auth_quirk("Subject must be a string"));
        assert_eq!(default_auth_error_patterns().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_clears_token_and_transitions_once() {
        let gateway = token_gateway();
        gateway
            .tokens()
            .set(SecretString::from("tok".to_string()))
            .await;

        let first = gateway.auth_failure().await;
        assert!(matches!(
            first,
            ApiError::Unauthorized { redirect: RedirectTarget::LocalLogin(ref r) } if r == "/login"
        ));
        assert!(!gateway.tokens().is_set().await);
        assert_eq!(gateway.session().status().await, SessionStatus::Unauthenticated);

        // A second failure in the same burst is a no-op apart from the
        // (identical) redirect target: last write wins.
        let second = gateway.auth_failure().await;
        assert!(second.is_auth());
        assert_eq!(gateway.session().status().await, SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_absolute_joins_paths() {
        let gateway = token_gateway();
        assert_eq!(
            gateway.absolute("/files/list"),
            "http://127.0.0.1:9/api/files/list"
        );
        assert_eq!(
            gateway.absolute("files/list"),
            "http://127.0.0.1:9/api/files/list"
        );
    }

    #[tokio::test]
    async fn test_resource_url_embeds_token_under_token_scheme() {
        let gateway = token_gateway();
        gateway
            .tokens()
            .set(SecretString::from("tok123".to_string()))
            .await;
        let url = gateway.resource_url("/files/42/preview").await.unwrap();
        assert_eq!(url.query(), Some("token=tok123"));

        let portal = Url::parse("https://sso.example.com/login").unwrap();
        let sso = ApiGateway::new(ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::cookie_sso(portal),
        ))
        .unwrap();
        let url = sso.resource_url("/files/42/preview").await.unwrap();
        assert_eq!(url.query(), None);
    }
}
