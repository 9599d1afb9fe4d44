//! The workspace store: ingestion and lifecycle of source files.
//!
//! All mutation happens in two-phase read-modify-write transitions: a
//! short write-lock section to move a file into `Classifying`, the parse
//! await outside any lock, then a second write-lock section that re-finds
//! the file and commits only if nothing superseded the transition in the
//! meantime (removal, reclassification). A parse result for a file that
//! moved on is dropped, mirroring the stale-result guard on the fetch
//! side.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use detect::SourceKind;
use service::DataService;
use tracing::{debug, info, warn};

use crate::error::LibraryError;
use crate::persist::{NoopSummaryStore, SourceSummary, SummaryStore};
use crate::types::{hash_content, SourceFile, SourceId, SourceStatus, UploadedFile};

/// Owns the set of ingested source files and their persisted summaries.
///
/// Constructed once per session and injected into consumers; there is no
/// ambient global.
pub struct SourceLibrary {
    files: RwLock<Vec<SourceFile>>,
    service: Arc<dyn DataService>,
    store: Arc<dyn SummaryStore>,
    /// Identity scope for persistence. `None` means a guest session:
    /// nothing is ever written and every session starts empty.
    scope: Option<String>,
}

impl SourceLibrary {
    /// A guest-session library: no persistence.
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            service,
            store: Arc::new(NoopSummaryStore),
            scope: None,
        }
    }

    /// A durable library persisting summaries for `scope`.
    pub fn with_persistence(
        service: Arc<dyn DataService>,
        store: Arc<dyn SummaryStore>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            service,
            store,
            scope: Some(scope.into()),
        }
    }

    /// Ingest uploaded files.
    ///
    /// With an explicit kind, every file is classified and parsed under
    /// it. Without one, files stay `Pending` until the user decides —
    /// callers that want heuristic classification opt in through
    /// [`ingest_with_detection`](Self::ingest_with_detection). A file-level
    /// parse failure never aborts sibling files.
    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        explicit_kind: Option<SourceKind>,
    ) -> Vec<SourceId> {
        let mut ids = Vec::with_capacity(files.len());
        for upload in files {
            let name = upload.name.clone();
            let id = self.insert(upload);
            ids.push(id);

            match explicit_kind {
                Some(kind) if kind.is_known() => {
                    if let Err(err) = self.classify_and_commit(id, kind).await {
                        warn!(file = %name, error = %err, "ingest_parse_failed");
                    }
                }
                _ => {
                    debug!(file = %name, "ingest_deferred_classification");
                }
            }
        }
        self.persist_if_enabled();
        ids
    }

    /// Ingest with heuristic classification as a courtesy fallback.
    ///
    /// Files the detector cannot decide stay `Pending` and unparsed.
    pub async fn ingest_with_detection(&self, files: Vec<UploadedFile>) -> Vec<SourceId> {
        let mut ids = Vec::with_capacity(files.len());
        for upload in files {
            let name = upload.name.clone();
            let detected = detect::classify(&upload.name, &upload.content);
            let id = self.insert(upload);
            ids.push(id);

            if detected.is_known() {
                if let Err(err) = self.classify_and_commit(id, detected).await {
                    warn!(file = %name, error = %err, "ingest_parse_failed");
                }
            } else {
                debug!(file = %name, "detection_ambiguous");
            }
        }
        self.persist_if_enabled();
        ids
    }

    /// Re-run classification and parsing under a different kind.
    ///
    /// Clears prior metadata and error, then parses. The file ends in
    /// `Ready` or `Error`; a parse rejection is also returned so the
    /// caller can drive a "try a different kind" flow.
    pub async fn reclassify(&self, id: SourceId, new_kind: SourceKind) -> Result<(), LibraryError> {
        if !new_kind.is_known() {
            let name = self
                .get(id)
                .ok_or(LibraryError::UnknownSource(id))?
                .name;
            return Err(LibraryError::KindRequired { name });
        }
        let result = self.classify_and_commit(id, new_kind).await;
        self.persist_if_enabled();
        result
    }

    pub fn remove(&self, id: SourceId) -> Result<(), LibraryError> {
        {
            let mut files = self.write();
            let before = files.len();
            files.retain(|f| f.id != id);
            if files.len() == before {
                return Err(LibraryError::UnknownSource(id));
            }
        }
        info!(source = %id, "source_removed");
        self.persist_if_enabled();
        Ok(())
    }

    pub fn rename(&self, id: SourceId, new_display_name: impl Into<String>) -> Result<(), LibraryError> {
        {
            let mut files = self.write();
            let file = files
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or(LibraryError::UnknownSource(id))?;
            file.display_name = new_display_name.into();
        }
        self.persist_if_enabled();
        Ok(())
    }

    pub fn clear(&self) {
        self.write().clear();
        self.persist_if_enabled();
    }

    /// Only `Ready` files of the given kind.
    pub fn query(&self, kind: SourceKind) -> Vec<SourceFile> {
        self.read()
            .iter()
            .filter(|f| f.is_ready() && f.detected_kind == kind)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: SourceId) -> Option<SourceFile> {
        self.read().iter().find(|f| f.id == id).cloned()
    }

    pub fn all(&self) -> Vec<SourceFile> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Restore the workspace from persisted summaries.
    ///
    /// Entries load with empty content. Where the originating path is
    /// still readable the content is reloaded and the file re-parsed;
    /// otherwise the entry keeps its persisted status and metadata until
    /// content is supplied again. Returns the number of restored entries.
    pub async fn restore(&self) -> Result<usize, LibraryError> {
        let Some(scope) = self.scope.clone() else {
            return Ok(0);
        };
        let summaries = self.store.load(&scope)?;
        let count = summaries.len();

        let mut reparse = Vec::new();
        let mut restored = Vec::with_capacity(count);
        for summary in summaries {
            let mut file = file_from_summary(summary);
            if let Some(path) = &file.path {
                match std::fs::read_to_string(path) {
                    Ok(content) => {
                        let reloaded_hash = hash_content(&content);
                        if reloaded_hash != file.content_sha256 {
                            debug!(file = %file.name, "restored_content_changed");
                        }
                        file.size = content.len() as u64;
                        file.content_sha256 = reloaded_hash;
                        file.content = content;
                        if file.detected_kind.is_known() {
                            reparse.push((file.id, file.detected_kind));
                        }
                    }
                    Err(err) => {
                        debug!(file = %file.name, error = %err, "restored_content_unavailable");
                    }
                }
            }
            restored.push(file);
        }

        *self.write() = restored;
        info!(scope = %scope, count, reparsed = reparse.len(), "workspace_restored");

        for (id, kind) in reparse {
            if let Err(err) = self.classify_and_commit(id, kind).await {
                warn!(source = %id, error = %err, "restore_reparse_failed");
            }
        }
        self.persist_if_enabled();
        Ok(count)
    }

    /// Current summaries, as they would be persisted.
    pub fn summaries(&self) -> Vec<SourceSummary> {
        self.read().iter().map(SourceSummary::from_file).collect()
    }

    fn insert(&self, upload: UploadedFile) -> SourceId {
        let file = SourceFile::from_upload(upload, Utc::now());
        let id = file.id;
        info!(source = %id, file = %file.name, size = file.size, "source_ingested");
        self.write().push(file);
        id
    }

    /// The two-phase classify transition described in the module docs.
    async fn classify_and_commit(&self, id: SourceId, kind: SourceKind) -> Result<(), LibraryError> {
        let (name, content) = {
            let mut files = self.write();
            let file = files
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or(LibraryError::UnknownSource(id))?;
            file.detected_kind = kind;
            file.status = SourceStatus::Classifying;
            file.metadata = None;
            file.error = None;
            (file.name.clone(), file.content.clone())
        };

        let result = self.service.classify_and_parse(kind, &content).await;

        let mut files = self.write();
        let Some(file) = files.iter_mut().find(|f| f.id == id) else {
            // Removed while parsing; drop the result.
            debug!(source = %id, "parse_result_for_removed_file");
            return Ok(());
        };
        if file.status != SourceStatus::Classifying || file.detected_kind != kind {
            // Reclassified while parsing; a newer transition owns the file.
            debug!(source = %id, "parse_result_superseded");
            return Ok(());
        }

        match result {
            Ok(metadata) => {
                file.status = SourceStatus::Ready;
                file.metadata = Some(metadata);
                info!(source = %id, file = %name, kind = %kind, "source_ready");
                Ok(())
            }
            Err(err) => {
                file.status = SourceStatus::Error;
                file.error = Some(err.to_string());
                warn!(source = %id, file = %name, kind = %kind, error = %err, "source_parse_failed");
                Err(LibraryError::ParseFailed { name, source: err })
            }
        }
    }

    fn persist_if_enabled(&self) {
        let Some(scope) = &self.scope else {
            return;
        };
        let summaries = self.summaries();
        if let Err(err) = self.store.save(scope, &summaries) {
            // Persistence trouble must not fail the workspace operation.
            warn!(scope = %scope, error = %err, "summary_persist_failed");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<SourceFile>> {
        self.files.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<SourceFile>> {
        self.files.write().unwrap_or_else(|p| p.into_inner())
    }
}

fn file_from_summary(summary: SourceSummary) -> SourceFile {
    SourceFile {
        id: summary.id,
        name: summary.name,
        display_name: summary.display_name,
        content: String::new(),
        detected_kind: summary.kind,
        status: summary.status,
        metadata: summary.metadata,
        error: None,
        path: summary.path,
        size: summary.size,
        content_sha256: summary.content_sha256,
        uploaded_at: summary.uploaded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemorySummaryStore;
    use service::ScriptedService;
    use std::io::Write as _;

    fn ace_upload(name: &str) -> UploadedFile {
        let mut content = String::from(" 1001.02c   1.00783 -1.12606  0\n");
        for _ in 0..6 {
            content.push_str("  1.234E-05  5.678E+03\n");
        }
        UploadedFile {
            name: name.into(),
            path: None,
            content,
        }
    }

    fn library() -> SourceLibrary {
        SourceLibrary::new(Arc::new(ScriptedService::auto()))
    }

    #[tokio::test]
    async fn explicit_kind_parses_to_ready() {
        let lib = library();
        let ids = lib
            .ingest(vec![ace_upload("h1.ace")], Some(SourceKind::Ace))
            .await;
        let file = lib.get(ids[0]).expect("file");
        assert_eq!(file.status, SourceStatus::Ready);
        assert!(file.metadata.is_some());
        assert_eq!(file.detected_kind, SourceKind::Ace);
    }

    #[tokio::test]
    async fn no_kind_defers_classification() {
        let lib = library();
        let ids = lib.ingest(vec![ace_upload("h1.dat")], None).await;
        let file = lib.get(ids[0]).expect("file");
        assert_eq!(file.status, SourceStatus::Pending);
        assert_eq!(file.detected_kind, SourceKind::Unknown);
        assert!(file.metadata.is_none());
    }

    #[tokio::test]
    async fn detection_opt_in_classifies_when_unambiguous() {
        let lib = library();
        let ids = lib.ingest_with_detection(vec![ace_upload("h1.dat")]).await;
        let file = lib.get(ids[0]).expect("file");
        assert_eq!(file.status, SourceStatus::Ready);
        assert_eq!(file.detected_kind, SourceKind::Ace);
    }

    #[tokio::test]
    async fn ambiguous_detection_leaves_file_pending() {
        let lib = library();
        let upload = UploadedFile {
            name: "notes.txt".into(),
            path: None,
            content: "short note\n".into(),
        };
        let ids = lib.ingest_with_detection(vec![upload]).await;
        let file = lib.get(ids[0]).expect("file");
        assert_eq!(file.status, SourceStatus::Pending);
    }

    #[tokio::test]
    async fn parse_failure_scopes_to_the_file() {
        let service = ScriptedService::auto();
        service.fail_parses_for(SourceKind::Endf);
        let lib = SourceLibrary::new(Arc::new(service));

        let uploads = vec![
            ace_upload("good.ace"),
            UploadedFile {
                name: "bad.endf".into(),
                path: None,
                content: "not really endf".into(),
            },
        ];
        // Mixed batch: parse the first as ACE, the second as ENDF.
        let good = lib.ingest(vec![uploads[0].clone()], Some(SourceKind::Ace)).await[0];
        let bad = lib.ingest(vec![uploads[1].clone()], Some(SourceKind::Endf)).await[0];

        assert_eq!(lib.get(good).unwrap().status, SourceStatus::Ready);
        let bad_file = lib.get(bad).unwrap();
        assert_eq!(bad_file.status, SourceStatus::Error);
        assert!(bad_file.error.is_some());
    }

    #[tokio::test]
    async fn reclassify_recovers_from_wrong_kind() {
        let service = ScriptedService::auto();
        service.fail_parses_for(SourceKind::Endf);
        let lib = SourceLibrary::new(Arc::new(service.clone()));

        let id = lib.ingest(vec![ace_upload("h1.dat")], Some(SourceKind::Endf)).await[0];
        assert_eq!(lib.get(id).unwrap().status, SourceStatus::Error);

        lib.reclassify(id, SourceKind::Ace).await.expect("reclassify");
        let file = lib.get(id).unwrap();
        assert_eq!(file.status, SourceStatus::Ready);
        assert_eq!(file.detected_kind, SourceKind::Ace);
        assert!(file.error.is_none());
    }

    #[tokio::test]
    async fn reclassify_to_unknown_is_rejected() {
        let lib = library();
        let id = lib.ingest(vec![ace_upload("h1.ace")], Some(SourceKind::Ace)).await[0];
        let err = lib.reclassify(id, SourceKind::Unknown).await.unwrap_err();
        assert!(matches!(err, LibraryError::KindRequired { .. }));
    }

    #[tokio::test]
    async fn query_returns_only_ready_files_of_kind() {
        let lib = library();
        lib.ingest(vec![ace_upload("a.ace")], Some(SourceKind::Ace)).await;
        lib.ingest(vec![ace_upload("pending.dat")], None).await;

        assert_eq!(lib.query(SourceKind::Ace).len(), 1);
        assert!(lib.query(SourceKind::Endf).is_empty());
        assert_eq!(lib.len(), 2);
    }

    #[tokio::test]
    async fn remove_and_rename() {
        let lib = library();
        let id = lib.ingest(vec![ace_upload("a.ace")], Some(SourceKind::Ace)).await[0];

        lib.rename(id, "Hydrogen (ENDF/B)").expect("rename");
        assert_eq!(lib.get(id).unwrap().display_name, "Hydrogen (ENDF/B)");

        lib.remove(id).expect("remove");
        assert!(lib.get(id).is_none());
        assert!(matches!(
            lib.remove(id),
            Err(LibraryError::UnknownSource(_))
        ));
    }

    #[tokio::test]
    async fn guest_sessions_never_persist() {
        let lib = library();
        lib.ingest(vec![ace_upload("a.ace")], Some(SourceKind::Ace)).await;
        assert_eq!(lib.restore().await.expect("restore"), 0);
    }

    #[tokio::test]
    async fn durable_sessions_round_trip_summaries() {
        let store = Arc::new(MemorySummaryStore::new());
        let service = Arc::new(ScriptedService::auto());

        let lib = SourceLibrary::with_persistence(service.clone(), store.clone(), "alice");
        lib.ingest(vec![ace_upload("a.ace")], Some(SourceKind::Ace)).await;

        let restored = SourceLibrary::with_persistence(service, store, "alice");
        assert_eq!(restored.restore().await.expect("restore"), 1);

        let file = &restored.all()[0];
        assert_eq!(file.status, SourceStatus::Ready);
        assert!(file.metadata.is_some());
        // No path on the upload, so content stays empty after restore.
        assert!(file.content.is_empty());
    }

    #[tokio::test]
    async fn restore_reloads_content_from_disk_when_possible() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("h1.ace");
        let upload = ace_upload("h1.ace");
        {
            let mut f = std::fs::File::create(&path).expect("create");
            f.write_all(upload.content.as_bytes()).expect("write");
        }

        let store = Arc::new(MemorySummaryStore::new());
        let service = Arc::new(ScriptedService::auto());
        let lib = SourceLibrary::with_persistence(service.clone(), store.clone(), "alice");
        lib.ingest(
            vec![UploadedFile {
                path: Some(path.clone()),
                ..upload.clone()
            }],
            Some(SourceKind::Ace),
        )
        .await;

        let restored = SourceLibrary::with_persistence(service, store, "alice");
        restored.restore().await.expect("restore");
        let file = &restored.all()[0];
        assert_eq!(file.content, upload.content);
        assert_eq!(file.status, SourceStatus::Ready);
    }
}
