//! Pure document transformations used as mutators.
//!
//! Each function takes the current document by value and returns the next one
//! together with the record it touched. They never perform I/O, so the store
//! can run them inside its serialized commit cycle.

use super::model::{Document, Record, RecordPatch};
use crate::error::{LecternError, Result};

/// Entity name used in NotFound errors.
pub const RECORD_ENTITY: &str = "record";

/// Finds the position of the first record with the given id.
pub fn position_of(document: &[Record], id: &str) -> Option<usize> {
    document.iter().position(|record| record.id() == id)
}

/// Puts `record` in front of every existing record.
pub fn prepend(mut document: Document, record: Record) -> (Document, Record) {
    document.insert(0, record.clone());
    (document, record)
}

/// Merges `patch` into the first record with `id`, keeping its position.
pub fn replace_by_id(
    mut document: Document,
    id: &str,
    patch: &RecordPatch,
    updated_at: &str,
) -> Result<(Document, Record)> {
    let index =
        position_of(&document, id).ok_or_else(|| LecternError::not_found(RECORD_ENTITY, id))?;
    let next = document[index].merged(patch, updated_at)?;
    document[index] = next.clone();
    Ok((document, next))
}

/// Removes the first record with `id` and hands it back.
pub fn remove_by_id(mut document: Document, id: &str) -> Result<(Document, Record)> {
    let index =
        position_of(&document, id).ok_or_else(|| LecternError::not_found(RECORD_ENTITY, id))?;
    let removed = document.remove(index);
    Ok((document, removed))
}
