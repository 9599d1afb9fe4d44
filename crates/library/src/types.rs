//! Core data model for the source-file workspace.

use chrono::{DateTime, Utc};
use detect::SourceKind;
use serde::{Deserialize, Serialize};
use service::SourceMetadata;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque identifier for one ingested source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a source file.
///
/// `Ready` implies metadata is present and the kind is known; the store
/// enforces this on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Ingested; no kind assigned yet, or waiting on a user decision.
    Pending,
    /// A kind is assigned and authoritative parsing is in flight.
    Classifying,
    /// Parsed successfully; metadata available.
    Ready,
    /// Parsing rejected the content for the assigned kind.
    Error,
}

/// A file as handed to the store by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    /// Originating filesystem path, when known. Used to opportunistically
    /// reload content after a persisted-workspace restore.
    pub path: Option<PathBuf>,
    pub content: String,
}

/// One ingested source file and everything the engine knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: SourceId,
    pub name: String,
    pub display_name: String,
    /// Raw content. May be empty after a restore whose originating path
    /// could not be re-read; derived-data fetches then fall back to the
    /// stable identity.
    pub content: String,
    pub detected_kind: SourceKind,
    pub status: SourceStatus,
    pub metadata: Option<SourceMetadata>,
    pub error: Option<String>,
    pub path: Option<PathBuf>,
    pub size: u64,
    /// SHA-256 of the content this entry was last parsed from; kept across
    /// restores for change detection even when content itself is absent.
    pub content_sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl SourceFile {
    pub(crate) fn from_upload(upload: UploadedFile, uploaded_at: DateTime<Utc>) -> Self {
        let UploadedFile {
            name,
            path,
            content,
        } = upload;
        let size = content.len() as u64;
        let content_sha256 = hash_content(&content);
        Self {
            id: SourceId::new(),
            display_name: name.clone(),
            name,
            content,
            detected_kind: SourceKind::Unknown,
            status: SourceStatus::Pending,
            metadata: None,
            error: None,
            path,
            size,
            content_sha256,
            uploaded_at,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SourceStatus::Ready
    }

    /// Server-assigned stable identity, when parsing produced one.
    pub fn stable_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.stable_id())
    }
}

/// SHA-256 hex digest of file content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_conversion_captures_size_and_hash() {
        let file = SourceFile::from_upload(
            UploadedFile {
                name: "u235.endf".into(),
                path: None,
                content: "payload".into(),
            },
            Utc::now(),
        );
        assert_eq!(file.size, 7);
        assert_eq!(file.content_sha256, hash_content("payload"));
        assert_eq!(file.status, SourceStatus::Pending);
        assert_eq!(file.detected_kind, SourceKind::Unknown);
        assert_eq!(file.display_name, "u235.endf");
    }

    #[test]
    fn source_ids_are_unique() {
        assert_ne!(SourceId::new(), SourceId::new());
    }
}
