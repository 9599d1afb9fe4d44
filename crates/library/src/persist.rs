//! Persisted workspace summaries.
//!
//! Sessions that opt into durability store, per identity scope, an ordered
//! list of file summaries — metadata, paths, and a content hash, never raw
//! content. The interface is explicit and versioned so the storage medium
//! can change without touching the store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use detect::SourceKind;
use serde::{Deserialize, Serialize};
use service::SourceMetadata;

use crate::error::PersistError;
use crate::types::{SourceFile, SourceId, SourceStatus};

/// Bump when the summary layout changes incompatibly.
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Everything persisted about one source file. Raw content never appears
/// here; `content_sha256` supports change detection on reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub id: SourceId,
    pub name: String,
    pub display_name: String,
    pub path: Option<PathBuf>,
    pub kind: SourceKind,
    pub status: SourceStatus,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub metadata: Option<SourceMetadata>,
    pub content_sha256: String,
}

impl SourceSummary {
    pub fn from_file(file: &SourceFile) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            display_name: file.display_name.clone(),
            path: file.path.clone(),
            kind: file.detected_kind,
            status: file.status,
            size: file.size,
            uploaded_at: file.uploaded_at,
            metadata: file.metadata.clone(),
            content_sha256: file.content_sha256.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VersionedSummaries {
    schema_version: u32,
    summaries: Vec<SourceSummary>,
}

/// Storage interface for workspace summaries, keyed by identity scope.
pub trait SummaryStore: Send + Sync {
    fn load(&self, scope: &str) -> Result<Vec<SourceSummary>, PersistError>;
    fn save(&self, scope: &str, summaries: &[SourceSummary]) -> Result<(), PersistError>;
}

/// JSON file per scope under a base directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        // Scopes are user identifiers; keep the filename filesystem-safe.
        let safe: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl SummaryStore for JsonFileStore {
    fn load(&self, scope: &str) -> Result<Vec<SourceSummary>, PersistError> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        let versioned: VersionedSummaries = serde_json::from_str(&raw)?;
        if versioned.schema_version != SUMMARY_SCHEMA_VERSION {
            return Err(PersistError::SchemaVersion {
                found: versioned.schema_version,
                expected: SUMMARY_SCHEMA_VERSION,
            });
        }
        Ok(versioned.summaries)
    }

    fn save(&self, scope: &str, summaries: &[SourceSummary]) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let versioned = VersionedSummaries {
            schema_version: SUMMARY_SCHEMA_VERSION,
            summaries: summaries.to_vec(),
        };
        let raw = serde_json::to_string_pretty(&versioned)?;
        write_atomically(&self.scope_path(scope), raw.as_bytes())
    }
}

/// Write via a sibling temp file and rename so a crash never leaves a
/// truncated summary file behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Store for guest sessions: never writes, always loads empty.
#[derive(Default)]
pub struct NoopSummaryStore;

impl SummaryStore for NoopSummaryStore {
    fn load(&self, _scope: &str) -> Result<Vec<SourceSummary>, PersistError> {
        Ok(Vec::new())
    }

    fn save(&self, _scope: &str, _summaries: &[SourceSummary]) -> Result<(), PersistError> {
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemorySummaryStore {
    scopes: Mutex<HashMap<String, Vec<SourceSummary>>>,
}

impl MemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SummaryStore for MemorySummaryStore {
    fn load(&self, scope: &str) -> Result<Vec<SourceSummary>, PersistError> {
        let scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        Ok(scopes.get(scope).cloned().unwrap_or_default())
    }

    fn save(&self, scope: &str, summaries: &[SourceSummary]) -> Result<(), PersistError> {
        let mut scopes = self.scopes.lock().unwrap_or_else(|p| p.into_inner());
        scopes.insert(scope.to_string(), summaries.to_vec());
        Ok(())
    }
}
