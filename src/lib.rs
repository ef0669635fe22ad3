//! EUcloud workspace client core
//!
//! Async client for the EUcloud personal file-storage service: a
//! hierarchical workspace of files, folders, trash, favorites and share
//! links behind an authenticated session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               WorkspaceStore                 │
//! │  folder context, listing, search, modals     │
//! └──────────────────────────────────────────────┘
//!                       │
//!     ┌────────┬────────┼─────────┬─────────┐
//!     ▼        ▼        ▼         ▼         │
//! ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐   │
//! │ Files │ │Folders│ │ Share │ │Storage│   │
//! └───────┘ └───────┘ └───────┘ └───────┘   │
//!     │        │        │         │         │
//!     └────────┴────┬───┴─────────┘         │
//!                   ▼                       ▼
//!            ┌────────────┐         ┌──────────────┐
//!            │ ApiGateway │◄────────┤SessionManager│
//!            └────────────┘         └──────────────┘
//! ```
//!
//! The session manager resolves first and gates everything else. Every
//! call flows through the gateway, which injects credentials and enforces
//! the global unauthorized policy. The store reconciles the view with a
//! full reload after each mutation instead of patching locally.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod progress;
pub mod services;
pub mod session;
pub mod workspace;

pub use config::{AuthScheme, ClientConfig, RedirectTarget};
pub use error::ApiError;
pub use gateway::ApiGateway;
pub use models::{
    AccessType, FileEntry, Folder, Id, Listing, ShareLink, SharedFile, StorageUsage, User,
};
pub use progress::{progress_channel, ProgressEvents, ProgressSender};
pub use services::{
    CloudServices, FileService, FolderService, ShareOptions, ShareService, StorageService,
    UploadSource,
};
pub use session::{Session, SessionManager, SessionStatus};
pub use workspace::{
    Modal, PendingDelete, ViewMode, WorkspaceBackend, WorkspaceStore, WorkspaceView,
};

use std::sync::Arc;

/// Fully wired client: gateway, session manager, operation services and
/// workspace store over one configuration.
pub struct CloudClient {
    gateway: Arc<ApiGateway>,
    session: SessionManager,
    services: Arc<CloudServices>,
    workspace: WorkspaceStore,
}

impl CloudClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let gateway = ApiGateway::new(config)?;
        let session = SessionManager::new(gateway.clone());
        let services = Arc::new(CloudServices::new(gateway.clone()));
        let workspace = WorkspaceStore::new(services.clone());
        Ok(Self { gateway, session, services, workspace })
    }

    /// Resolve the session, then load the workspace root and quota in
    /// parallel. Nothing else runs until the session check has settled.
    pub async fn start(&self) -> Result<Session, ApiError> {
        let session = self.session.refresh().await?;
        self.workspace.reload().await?;
        Ok(session)
    }

    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn workspace(&self) -> &WorkspaceStore {
        &self.workspace
    }

    pub fn files(&self) -> &FileService {
        &self.services.files
    }

    pub fn folders(&self) -> &FolderService {
        &self.services.folders
    }

    pub fn share(&self) -> &ShareService {
        &self.services.share
    }

    pub fn storage(&self) -> &StorageService {
        &self.services.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_client_wires_up_under_both_schemes() {
        let token = CloudClient::new(ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::token("/login"),
        ));
        assert!(token.is_ok());

        let portal = Url::parse("https://sso.example.com/login?redirect=/eucloud").unwrap();
        let sso = CloudClient::new(ClientConfig::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            AuthScheme::cookie_sso(portal),
        ));
        assert!(sso.is_ok());
    }
}
