//! Folder operations

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{Folder, Id};

#[derive(Debug, Deserialize)]
struct FolderEnvelope {
    folder: Folder,
}

#[derive(Debug, Deserialize)]
struct FoldersEnvelope {
    #[serde(default)]
    folders: Vec<Folder>,
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    folder_name: &'a str,
    parent_folder_id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct RenamePayload<'a> {
    folder_name: &'a str,
}

#[derive(Clone)]
pub struct FolderService {
    gateway: Arc<ApiGateway>,
}

impl FolderService {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    pub async fn create(&self, name: &str, parent: Option<Id>) -> Result<Folder, ApiError> {
        let env: FolderEnvelope = self
            .gateway
            .post_json("/folders/create", &CreatePayload { folder_name: name, parent_folder_id: parent })
            .await?;
        info!("Created folder {} ({})", env.folder.name, env.folder.id);
        Ok(env.folder)
    }

    /// Every folder of the workspace, flat. The sidebar tree is derived
    /// client-side from `parent_folder_id`.
    pub async fn list(&self) -> Result<Vec<Folder>, ApiError> {
        let env: FoldersEnvelope = self.gateway.get_json("/folders/list", &[]).await?;
        Ok(env.folders)
    }

    pub async fn get(&self, id: Id) -> Result<Folder, ApiError> {
        let env: FolderEnvelope = self.gateway.get_json(&format!("/folders/{}", id), &[]).await?;
        Ok(env.folder)
    }

    pub async fn rename(&self, id: Id, new_name: &str) -> Result<Folder, ApiError> {
        let env: FolderEnvelope = self
            .gateway
            .put_json(&format!("/folders/{}/rename", id), &RenamePayload { folder_name: new_name })
            .await?;
        Ok(env.folder)
    }

    /// Delete a folder. Whether non-empty folders are refused is backend
    /// policy; a refusal surfaces as a business error with the server's
    /// message.
    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/folders/{}", id)).await
    }
}
