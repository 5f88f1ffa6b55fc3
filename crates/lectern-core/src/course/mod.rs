//! Course records: domain models, document transformations, validation and
//! the repository trait.

pub mod document;
mod model;
mod repository;
pub mod validation;

pub use model::{
    Course, Document, Instructor, LiveSession, Material, Record, RecordKind, RecordPatch,
    new_record_id, now_timestamp,
};
pub use repository::{CourseRepository, RecordChange};
pub use validation::{ValidationMode, ensure_valid, parse_import, validate_patch};
