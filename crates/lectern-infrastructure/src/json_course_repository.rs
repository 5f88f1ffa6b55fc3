//! Course repository implementation.
//!
//! Stores every record in a single pretty-printed JSON array. Writes go
//! through a [`MutationSerializer`] so that each mutation snapshots the
//! previous content, replaces the file atomically and prunes old snapshots,
//! one mutation at a time.
//!
//! File location: `{base_dir}/data/courses.json`

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

use lectern_core::config::StoreConfig;
use lectern_core::course::{
    CourseRepository, Document, Record, RecordChange, RecordPatch, document, now_timestamp,
};
use lectern_core::error::{LecternError, Result};

use crate::storage::{AtomicJsonFile, CommitPipeline, MutationSerializer, SnapshotStore};

/// File-based course repository with rolling gzip backups.
///
/// Reads are not queued behind writes; they always see a complete document
/// because the file only ever changes by rename. No document is cached, so
/// edits made to the file between mutations are picked up.
#[derive(Debug, Clone)]
pub struct JsonCourseRepository {
    pipeline: CommitPipeline,
    serializer: MutationSerializer,
}

impl JsonCourseRepository {
    const EMPTY_DOCUMENT: &'static str = "[]";

    /// Opens the store described by `config`.
    ///
    /// Creates the data and backup directories and an empty document if
    /// needed, then starts the write queue on the current Tokio runtime.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let file = AtomicJsonFile::new(config.data_file.clone())?;
        if file.ensure_exists(Self::EMPTY_DOCUMENT).await? {
            tracing::info!("Created empty document at {:?}", file.path());
        }

        fs::create_dir_all(&config.backup_dir).await.map_err(|e| {
            LecternError::io(format!(
                "Failed to create backup directory {}: {}",
                config.backup_dir.display(),
                e
            ))
        })?;

        let snapshots = SnapshotStore::for_document(
            &config.data_file,
            config.backup_dir.clone(),
            config.retention,
        );
        let pipeline = CommitPipeline::new(file, snapshots);
        let serializer = MutationSerializer::spawn(pipeline.clone());

        Ok(Self {
            pipeline,
            serializer,
        })
    }

    pub fn data_file(&self) -> &Path {
        self.pipeline.file().path()
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        self.pipeline.snapshots()
    }

    /// Reads the current document.
    ///
    /// # Errors
    ///
    /// `CorruptDocument` when the file holds anything but an array of records.
    pub async fn load(&self) -> Result<Document> {
        self.pipeline.load().await
    }

    /// Runs `mutator` in its turn and returns the committed document along
    /// with whatever the mutator produced.
    ///
    /// An error from the mutator leaves the file and the backups untouched.
    pub async fn mutate<T, F>(&self, mutator: F) -> Result<(Document, T)>
    where
        F: FnOnce(Document) -> Result<(Document, T)> + Send + 'static,
        T: Send + 'static,
    {
        self.serializer.submit(mutator).await
    }
}

#[async_trait]
impl CourseRepository for JsonCourseRepository {
    async fn list(&self) -> Result<Document> {
        self.load().await
    }

    async fn append(&self, mut record: Record) -> Result<RecordChange> {
        let (document, record) = self
            .mutate(move |doc| {
                let now = now_timestamp();
                record.normalize(&now);
                record.set_updated_at(now);
                Ok(document::prepend(doc, record))
            })
            .await?;

        tracing::debug!("Appended record {}", record.id());
        Ok(RecordChange { record, document })
    }

    async fn replace_by_id(&self, id: &str, patch: RecordPatch) -> Result<RecordChange> {
        let id = id.to_string();
        let (document, record) = self
            .mutate(move |doc| document::replace_by_id(doc, &id, &patch, &now_timestamp()))
            .await?;

        tracing::debug!("Updated record {}", record.id());
        Ok(RecordChange { record, document })
    }

    async fn remove_by_id(&self, id: &str) -> Result<RecordChange> {
        let id = id.to_string();
        let (document, record) = self
            .mutate(move |doc| document::remove_by_id(doc, &id))
            .await?;

        tracing::debug!("Removed record {}", record.id());
        Ok(RecordChange { record, document })
    }

    async fn bulk_replace(&self, records: Vec<Record>) -> Result<Document> {
        let (document, ()) = self.mutate(move |_previous| Ok((records, ()))).await?;

        tracing::info!("Replaced document with {} records", document.len());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::config::Retention;
    use lectern_core::course::RecordKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &Path) -> StoreConfig {
        StoreConfig {
            data_file: dir.join("data").join("courses.json"),
            backup_dir: dir.join("backups"),
            log_dir: dir.join("logs"),
            retention: Retention::KeepLatest(50),
        }
    }

    async fn create_test_repository() -> (JsonCourseRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonCourseRepository::open(&config(temp_dir.path()))
            .await
            .unwrap();
        (repo, temp_dir)
    }

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_empty_document() {
        let (repo, temp_dir) = create_test_repository().await;

        assert_eq!(std::fs::read_to_string(repo.data_file()).unwrap(), "[]");
        assert!(temp_dir.path().join("backups").is_dir());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_document() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        std::fs::create_dir_all(config.data_file.parent().unwrap()).unwrap();
        std::fs::write(&config.data_file, "[{\"type\": \"live\", \"id\": \"x\"}]").unwrap();

        let repo = JsonCourseRepository::open(&config).await.unwrap();

        let doc = repo.list().await.unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc[0].id(), "x");
    }

    #[tokio::test]
    async fn test_append_generates_id_and_timestamp() {
        let (repo, _temp_dir) = create_test_repository().await;

        let change = repo
            .append(record(json!({"type": "course", "topic": "X"})))
            .await
            .unwrap();

        assert_eq!(change.total(), 1);
        assert!(!change.record.id().is_empty());
        assert!(change.record.updated_at().ends_with('Z'));
        assert_eq!(repo.list().await.unwrap(), change.document);
    }

    #[tokio::test]
    async fn test_replace_by_id_merges_fields() {
        let (repo, _temp_dir) = create_test_repository().await;
        let created = repo
            .append(record(json!({"type": "course", "topic": "Old", "lessonLabel": "L1"})))
            .await
            .unwrap()
            .record;

        let patch: RecordPatch = serde_json::from_value(json!({"topic": "New"})).unwrap();
        let change = repo.replace_by_id(created.id(), patch).await.unwrap();

        assert_eq!(change.record.id(), created.id());
        assert_eq!(change.record.kind(), RecordKind::Course);
        let stored = serde_json::to_value(&change.document[0]).unwrap();
        assert_eq!(stored["topic"], "New");
        assert_eq!(stored["lessonLabel"], "L1");
    }

    #[tokio::test]
    async fn test_replace_missing_id_is_not_found() {
        let (repo, _temp_dir) = create_test_repository().await;

        let err = repo
            .replace_by_id("missing", RecordPatch::default())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_reports_corrupt_document() {
        let (repo, _temp_dir) = create_test_repository().await;
        std::fs::write(repo.data_file(), "{\"data\": []}").unwrap();

        let err = repo.list().await.unwrap_err();

        assert!(err.is_corrupt());
    }
}
