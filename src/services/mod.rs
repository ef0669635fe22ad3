//! Typed operation services
//!
//! CRUD-shaped operation sets over the gateway, one service per entity
//! family. Services surface backend errors (with the server's message) to
//! the caller; only the gateway's global auth policy is transparent.

pub mod files;
pub mod folders;
pub mod share;
pub mod storage;

pub use files::{FileService, UploadSource};
pub use folders::FolderService;
pub use share::{ShareOptions, ShareService};
pub use storage::StorageService;

use std::sync::Arc;

use crate::gateway::ApiGateway;

/// The four operation services bundled over one gateway.
#[derive(Clone)]
pub struct CloudServices {
    pub files: FileService,
    pub folders: FolderService,
    pub share: ShareService,
    pub storage: StorageService,
}

impl CloudServices {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            files: FileService::new(gateway.clone()),
            folders: FolderService::new(gateway.clone()),
            share: ShareService::new(gateway.clone()),
            storage: StorageService::new(gateway),
        }
    }
}
