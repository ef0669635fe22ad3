//! Workspace store
//!
//! Owns the current folder context, the loaded listing, the search filter,
//! and modal state, and keeps the view consistent with the remote store.
//!
//! Consistency model: every mutation goes service call first, then a full
//! reconciling reload of the current folder's listing and the storage
//! quota. Nothing is spliced locally; the backend listing is the single
//! source of truth, at the cost of one extra round-trip per mutation.
//!
//! Navigation can fire a new load before the previous one resolves. Every
//! load carries a generation tag; a resolving load whose tag is no longer
//! the newest is discarded, so a slow response for folder A can never
//! overwrite folder B's view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::{FileEntry, Folder, Id, Listing, StorageUsage};
use crate::progress::ProgressSender;
use crate::services::{CloudServices, UploadSource};

/// Operations the store needs from the service layer. Object-safe so tests
/// can drive the store with an in-memory backend.
#[async_trait]
pub trait WorkspaceBackend: Send + Sync {
    async fn list(&self, folder_id: Option<Id>) -> Result<Listing, ApiError>;
    async fn usage(&self) -> Result<StorageUsage, ApiError>;
    async fn upload(
        &self,
        source: UploadSource,
        folder_id: Option<Id>,
        progress: Option<ProgressSender>,
    ) -> Result<FileEntry, ApiError>;
    async fn rename_file(&self, id: Id, new_name: &str) -> Result<FileEntry, ApiError>;
    async fn delete_file(&self, id: Id) -> Result<(), ApiError>;
    async fn move_file(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError>;
    async fn copy_file(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError>;
    async fn create_folder(&self, name: &str, parent: Option<Id>) -> Result<Folder, ApiError>;
    async fn rename_folder(&self, id: Id, new_name: &str) -> Result<Folder, ApiError>;
    async fn delete_folder(&self, id: Id) -> Result<(), ApiError>;
}

#[async_trait]
impl WorkspaceBackend for CloudServices {
    async fn list(&self, folder_id: Option<Id>) -> Result<Listing, ApiError> {
        self.files.list(folder_id).await
    }

    async fn usage(&self) -> Result<StorageUsage, ApiError> {
        self.storage.usage().await
    }

    async fn upload(
        &self,
        source: UploadSource,
        folder_id: Option<Id>,
        progress: Option<ProgressSender>,
    ) -> Result<FileEntry, ApiError> {
        self.files.upload(source, folder_id, progress).await
    }

    async fn rename_file(&self, id: Id, new_name: &str) -> Result<FileEntry, ApiError> {
        self.files.rename(id, new_name).await
    }

    async fn delete_file(&self, id: Id) -> Result<(), ApiError> {
        self.files.delete(id).await
    }

    async fn move_file(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError> {
        self.files.move_to(id, target).await
    }

    async fn copy_file(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError> {
        self.files.copy_to(id, target).await
    }

    async fn create_folder(&self, name: &str, parent: Option<Id>) -> Result<Folder, ApiError> {
        self.folders.create(name, parent).await
    }

    async fn rename_folder(&self, id: Id, new_name: &str) -> Result<Folder, ApiError> {
        self.folders.rename(id, new_name).await
    }

    async fn delete_folder(&self, id: Id) -> Result<(), ApiError> {
        self.folders.delete(id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Which overlay is on screen. One is conceptually primary at a time;
/// opening another replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    Upload,
    Preview(FileEntry),
    Share(FileEntry),
    Trash,
    Favorites,
}

/// A destructive action awaiting explicit confirmation. The service call
/// is only issued from [`WorkspaceStore::confirm_pending_delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDelete {
    File(Id),
    Folder(Id),
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    current_folder_id: Option<Id>,
    files: Vec<FileEntry>,
    folders: Vec<Folder>,
    search_query: String,
    loading: bool,
    usage: Option<StorageUsage>,
    view_mode: ViewMode,
    modal: Option<Modal>,
    pending_delete: Option<PendingDelete>,
}

/// Snapshot handed to the embedder. `files`/`folders` are already filtered
/// by the search query and always reflect the last successful load for
/// `current_folder_id`.
#[derive(Debug, Clone)]
pub struct WorkspaceView {
    pub current_folder_id: Option<Id>,
    pub files: Vec<FileEntry>,
    pub folders: Vec<Folder>,
    pub search_query: String,
    pub loading: bool,
    pub usage: Option<StorageUsage>,
    pub view_mode: ViewMode,
    pub modal: Option<Modal>,
    pub pending_delete: Option<PendingDelete>,
}

pub struct WorkspaceStore {
    backend: Arc<dyn WorkspaceBackend>,
    state: RwLock<ViewState>,
    /// Generation counter for in-flight loads; only the newest may apply.
    load_seq: AtomicU64,
}

impl WorkspaceStore {
    pub fn new(backend: Arc<dyn WorkspaceBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(ViewState { loading: true, ..ViewState::default() }),
            load_seq: AtomicU64::new(0),
        }
    }

    pub async fn view(&self) -> WorkspaceView {
        let state = self.state.read().await;
        let (files, folders) = filter_listing(&state.files, &state.folders, &state.search_query);
        WorkspaceView {
            current_folder_id: state.current_folder_id,
            files,
            folders,
            search_query: state.search_query.clone(),
            loading: state.loading,
            usage: state.usage,
            view_mode: state.view_mode,
            modal: state.modal.clone(),
            pending_delete: state.pending_delete,
        }
    }

    pub async fn current_folder(&self) -> Option<Id> {
        self.state.read().await.current_folder_id
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Navigate to a folder (`None` = root) and load its listing.
    pub async fn open_folder(&self, folder_id: Option<Id>) -> Result<(), ApiError> {
        {
            let mut state = self.state.write().await;
            state.current_folder_id = folder_id;
            state.loading = true;
        }
        self.reload().await
    }

    /// Fetch the current folder's listing and the quota snapshot in
    /// parallel, applying both only if no newer load has started since.
    /// On failure the prior view stays untouched.
    pub async fn reload(&self) -> Result<(), ApiError> {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let target = self.state.read().await.current_folder_id;

        let (listing, usage) = tokio::join!(self.backend.list(target), self.backend.usage());

        let mut state = self.state.write().await;
        if self.load_seq.load(Ordering::SeqCst) != seq || state.current_folder_id != target {
            debug!("Discarding superseded load for folder {:?}", target);
            return Ok(());
        }
        match (listing, usage) {
            (Ok(listing), Ok(usage)) => {
                state.files = listing.files;
                state.folders = listing.folders;
                state.usage = Some(usage);
                state.loading = false;
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => {
                state.loading = false;
                Err(err)
            }
        }
    }

    // ─── Mutations (service call, then reconciling reload) ───────────────

    /// Upload into the current folder.
    pub async fn upload(
        &self,
        source: UploadSource,
        progress: Option<ProgressSender>,
    ) -> Result<FileEntry, ApiError> {
        let target = self.current_folder().await;
        let file = self.backend.upload(source, target, progress).await?;
        self.reload().await?;
        Ok(file)
    }

    pub async fn rename_file(&self, id: Id, new_name: &str) -> Result<(), ApiError> {
        self.backend.rename_file(id, new_name).await?;
        info!("Renamed file {} to {}", id, new_name);
        self.reload().await
    }

    pub async fn move_file(&self, id: Id, target: Option<Id>) -> Result<(), ApiError> {
        self.backend.move_file(id, target).await?;
        self.reload().await
    }

    pub async fn copy_file(&self, id: Id, target: Option<Id>) -> Result<(), ApiError> {
        self.backend.copy_file(id, target).await?;
        self.reload().await
    }

    /// Create a folder under the current one.
    pub async fn create_folder(&self, name: &str) -> Result<(), ApiError> {
        let parent = self.current_folder().await;
        self.backend.create_folder(name, parent).await?;
        self.reload().await
    }

    pub async fn rename_folder(&self, id: Id, new_name: &str) -> Result<(), ApiError> {
        self.backend.rename_folder(id, new_name).await?;
        self.reload().await
    }

    // ─── Destructive actions (two-phase) ─────────────────────────────────

    pub async fn request_delete_file(&self, id: Id) {
        self.state.write().await.pending_delete = Some(PendingDelete::File(id));
    }

    pub async fn request_delete_folder(&self, id: Id) {
        self.state.write().await.pending_delete = Some(PendingDelete::Folder(id));
    }

    pub async fn cancel_pending_delete(&self) {
        self.state.write().await.pending_delete = None;
    }

    /// Issue the confirmed deletion, if one is pending. A backend refusal
    /// (e.g. non-empty folder) surfaces as a business error and the view
    /// keeps showing the entity.
    pub async fn confirm_pending_delete(&self) -> Result<(), ApiError> {
        let pending = self.state.write().await.pending_delete.take();
        match pending {
            Some(PendingDelete::File(id)) => {
                self.backend.delete_file(id).await?;
                info!("Deleted file {}", id);
                self.reload().await
            }
            Some(PendingDelete::Folder(id)) => {
                self.backend.delete_folder(id).await?;
                info!("Deleted folder {}", id);
                self.reload().await
            }
            None => Ok(()),
        }
    }

    // ─── UI state ────────────────────────────────────────────────────────

    pub async fn set_search_query(&self, query: impl Into<String>) {
        self.state.write().await.search_query = query.into();
    }

    pub async fn set_view_mode(&self, mode: ViewMode) {
        self.state.write().await.view_mode = mode;
    }

    pub async fn open_modal(&self, modal: Modal) {
        self.state.write().await.modal = Some(modal);
    }

    pub async fn close_modal(&self) {
        self.state.write().await.modal = None;
    }
}

/// Case-insensitive substring match used by the search filter.
pub fn matches_query(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

/// Pure search filter over a loaded listing. No server round-trip; derived
/// from the current set on every keystroke.
pub fn filter_listing(
    files: &[FileEntry],
    folders: &[Folder],
    query: &str,
) -> (Vec<FileEntry>, Vec<Folder>) {
    (
        files.iter().filter(|f| matches_query(&f.filename, query)).cloned().collect(),
        folders.iter().filter(|f| matches_query(&f.name, query)).cloned().collect(),
    )
}
