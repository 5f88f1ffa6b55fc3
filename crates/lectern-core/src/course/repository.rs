//! Course repository trait.
//!
//! Defines the interface a request-handling layer uses to read and mutate
//! the course document.

use super::model::{Document, Record, RecordPatch};
use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a mutation that touched a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    /// The record as stored (or as removed).
    pub record: Record,
    /// The full document after the mutation committed.
    pub document: Document,
}

impl RecordChange {
    /// Number of records in the committed document.
    pub fn total(&self) -> usize {
        self.document.len()
    }
}

/// An abstract repository for the course document.
///
/// # Implementation Notes
///
/// Implementations must apply mutations one at a time in submission order,
/// never expose a partially written document to `list`, and leave the
/// document untouched when a mutation fails with `NotFound`.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Returns the current document. An empty store yields an empty list.
    async fn list(&self) -> Result<Document>;

    /// Stores `record` in front of all others.
    ///
    /// The timestamp is refreshed and a missing id is generated.
    async fn append(&self, record: Record) -> Result<RecordChange>;

    /// Copies the patch's present fields over the record with `id`.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordChange)`: the merged record and resulting document
    /// - `Err(LecternError::NotFound)`: no record has that id
    async fn replace_by_id(&self, id: &str, patch: RecordPatch) -> Result<RecordChange>;

    /// Removes the first record with `id`.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordChange)`: the removed record and resulting document
    /// - `Err(LecternError::NotFound)`: no record has that id
    async fn remove_by_id(&self, id: &str) -> Result<RecordChange>;

    /// Replaces the whole document.
    ///
    /// Callers are responsible for ids and timestamps; duplicate ids are
    /// stored as given.
    async fn bulk_replace(&self, records: Vec<Record>) -> Result<Document>;
}
