//! Storage quota

use std::sync::Arc;

use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::StorageUsage;

#[derive(Clone)]
pub struct StorageService {
    gateway: Arc<ApiGateway>,
}

impl StorageService {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Current quota snapshot. Refreshed alongside every listing reload by
    /// the workspace store.
    pub async fn usage(&self) -> Result<StorageUsage, ApiError> {
        self.gateway.get_json("/storage/usage", &[]).await
    }
}
