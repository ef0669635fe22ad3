//! Workspace entity types
//!
//! Typed representations of the backend's wire shapes. All identities are
//! server-assigned; the client never fabricates ids, it only holds
//! transient, reloadable copies of backend-owned entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned entity id.
pub type Id = i64;

/// Authenticated principal, an immutable snapshot returned by the backend
/// at session validation or login time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: Id,
    pub email: String,
    #[serde(default)]
    pub storage_quota: u64,
    #[serde(default)]
    pub storage_used: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A stored file. Belongs to at most one folder; `parent_folder_id: None`
/// means the workspace root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "file_id")]
    pub id: Id,
    pub filename: String,
    #[serde(rename = "folder_id", default)]
    pub parent_folder_id: Option<Id>,
    #[serde(rename = "file_size", default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(rename = "is_deleted", default)]
    pub is_trashed: bool,
}

/// A folder node. Folders form a tree rooted at `parent_folder_id: None`.
/// Cycle prevention is a backend guarantee; the client does not revalidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(rename = "folder_id")]
    pub id: Id,
    #[serde(rename = "folder_name")]
    pub name: String,
    #[serde(default)]
    pub parent_folder_id: Option<Id>,
}

/// Immediate children of one folder. Never recursive.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// Access granted by a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    View,
    Edit,
}

/// A revocable, optionally expiring, optionally password-protected pointer
/// to one file. Its lifecycle is independent of the file's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    #[serde(rename = "share_id")]
    pub id: String,
    pub file_id: Id,
    pub access_type: AccessType,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_protected: bool,
}

/// Share link plus the metadata of the file it points at, as returned when
/// resolving a share.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SharedFile {
    pub share: ShareLink,
    pub file: FileEntry,
}

/// Quota snapshot, refreshed alongside every listing reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    #[serde(alias = "storage_used")]
    pub used_bytes: u64,
    #[serde(alias = "storage_quota")]
    pub quota_bytes: u64,
}

impl StorageUsage {
    pub fn available_bytes(&self) -> u64 {
        self.quota_bytes.saturating_sub(self.used_bytes)
    }

    pub fn percent_used(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.quota_bytes as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_file_entry_wire_shape() {
        let json = r#"{
            "file_id": 42,
            "filename": "report.pdf",
            "folder_id": null,
            "file_size": 10240,
            "mime_type": "application/pdf",
            "created_at": "2025-08-01T09:30:00Z",
            "is_favorite": true,
            "is_deleted": false
        }"#;
        let file: FileEntry = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, 42);
        assert_eq!(file.filename, "report.pdf");
        assert_eq!(file.parent_folder_id, None);
        assert_eq!(file.size, 10240);
        assert!(file.is_favorite);
        assert!(!file.is_trashed);
    }

    #[test]
    fn test_decode_listing_with_missing_arrays() {
        // A freshly-created account answers with one or both arrays absent.
        let listing: Listing = serde_json::from_str("{}").unwrap();
        assert!(listing.files.is_empty());
        assert!(listing.folders.is_empty());

        let listing: Listing = serde_json::from_str(
            r#"{"files": [], "folders": [{"folder_id": 7, "folder_name": "docs", "parent_folder_id": null}]}"#,
        )
        .unwrap();
        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.folders[0].name, "docs");
    }

    #[test]
    fn test_decode_share_link() {
        let json = r#"{
            "share_id": "abc123",
            "file_id": 42,
            "access_type": "view",
            "expires_at": "2025-08-14T00:00:00Z",
            "password_protected": true
        }"#;
        let share: ShareLink = serde_json::from_str(json).unwrap();
        assert_eq!(share.access_type, AccessType::View);
        assert!(share.password_protected);
        assert!(share.expires_at.is_some());
    }

    #[test]
    fn test_storage_usage_accessors() {
        let usage: StorageUsage =
            serde_json::from_str(r#"{"used_bytes": 25, "quota_bytes": 100}"#).unwrap();
        assert_eq!(usage.available_bytes(), 75);
        assert!((usage.percent_used() - 25.0).abs() < f64::EPSILON);

        // Alias form used by the user profile payload.
        let usage: StorageUsage =
            serde_json::from_str(r#"{"storage_used": 10, "storage_quota": 0}"#).unwrap();
        assert_eq!(usage.percent_used(), 0.0);
        assert_eq!(usage.available_bytes(), 0);
    }
}
