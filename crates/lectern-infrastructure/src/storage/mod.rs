//! Storage layer: atomic document file, snapshots and the serialized commit
//! cycle.

mod atomic_json;
mod serializer;
mod snapshot_store;

pub use atomic_json::{AtomicJsonFile, StagedWrite};
pub use serializer::{
    CommitPipeline, MutationHandle, MutationSerializer, parse_document, serialize_document,
};
pub use snapshot_store::{PruneReport, SnapshotEntry, SnapshotStore};
