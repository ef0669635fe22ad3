//! Share link operations
//!
//! A share link references exactly one file but lives independently of it:
//! deleting the link never deletes the file.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{AccessType, Id, ShareLink, SharedFile};

/// Options for creating a share link.
#[derive(Debug, Clone)]
pub struct ShareOptions {
    pub access_type: AccessType,
    pub expires_in_days: Option<u32>,
    pub password: Option<String>,
}

impl Default for ShareOptions {
    fn default() -> Self {
        Self { access_type: AccessType::View, expires_in_days: None, password: None }
    }
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    file_id: Id,
    access_type: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Clone)]
pub struct ShareService {
    gateway: Arc<ApiGateway>,
}

impl ShareService {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    pub async fn create(&self, file_id: Id, options: &ShareOptions) -> Result<ShareLink, ApiError> {
        self.gateway
            .post_json(
                "/share/create",
                &CreatePayload {
                    file_id,
                    access_type: options.access_type,
                    expires_in_days: options.expires_in_days,
                    password: options.password.as_deref(),
                },
            )
            .await
    }

    /// Resolve a share link to the link plus the shared file's metadata.
    /// A wrong password for a protected link and an elapsed expiry both
    /// surface as business errors carrying the server's specific message.
    pub async fn get(&self, share_id: &str, password: Option<&str>) -> Result<SharedFile, ApiError> {
        let mut query = Vec::new();
        if let Some(pw) = password {
            query.push(("password", pw.to_string()));
        }
        self.gateway.get_json(&format!("/share/{}", share_id), &query).await
    }

    pub async fn delete(&self, share_id: &str) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/share/{}", share_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payload_omits_absent_options() {
        let payload = CreatePayload {
            file_id: 42,
            access_type: AccessType::View,
            expires_in_days: None,
            password: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["file_id"], 42);
        assert_eq!(json["access_type"], "view");
        assert!(json.get("expires_in_days").is_none());
        assert!(json.get("password").is_none());

        let payload = CreatePayload {
            file_id: 42,
            access_type: AccessType::Edit,
            expires_in_days: Some(7),
            password: Some("s3cret"),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["access_type"], "edit");
        assert_eq!(json["expires_in_days"], 7);
        assert_eq!(json["password"], "s3cret");
    }
}
