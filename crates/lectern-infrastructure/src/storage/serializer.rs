//! Serialized commit cycle for the course document.
//!
//! A single worker task owns the [`CommitPipeline`] and pulls boxed mutation
//! jobs off an unbounded channel one at a time. Because the worker awaits each
//! job to completion before receiving the next, the job submitted later always
//! reads what the earlier one committed.

use futures::future::BoxFuture;
use lectern_core::course::Document;
use lectern_core::error::{LecternError, Result};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

use super::atomic_json::AtomicJsonFile;
use super::snapshot_store::SnapshotStore;

/// Parses raw document content.
///
/// Empty or whitespace-only content is an empty document. Anything that is
/// not a JSON array of records is reported as corrupt, never repaired.
pub fn parse_document(raw: &str, path: &Path) -> Result<Document> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        LecternError::corrupt(path.display().to_string(), format!("invalid JSON: {}", e))
    })?;

    let found = match &value {
        serde_json::Value::Array(_) => None,
        serde_json::Value::Object(_) => Some("an object"),
        serde_json::Value::String(_) => Some("a string"),
        serde_json::Value::Number(_) => Some("a number"),
        serde_json::Value::Bool(_) => Some("a boolean"),
        serde_json::Value::Null => Some("null"),
    };
    if let Some(found) = found {
        return Err(LecternError::corrupt(
            path.display().to_string(),
            format!("expected an array of records, found {}", found),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        LecternError::corrupt(path.display().to_string(), format!("invalid record: {}", e))
    })
}

/// Renders a document the way it is stored: pretty JSON, two-space indent.
pub fn serialize_document(document: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Read, apply, snapshot, write and prune for one mutation.
#[derive(Debug, Clone)]
pub struct CommitPipeline {
    file: AtomicJsonFile,
    snapshots: SnapshotStore,
}

impl CommitPipeline {
    pub fn new(file: AtomicJsonFile, snapshots: SnapshotStore) -> Self {
        Self { file, snapshots }
    }

    pub fn file(&self) -> &AtomicJsonFile {
        &self.file
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Reads and parses the current document without any serialization.
    pub async fn load(&self) -> Result<Document> {
        let raw = self.file.read_raw().await?;
        parse_document(&raw, self.file.path())
    }

    /// Runs one full mutation cycle.
    ///
    /// A mutator failure returns before anything touches disk. Snapshot and
    /// prune failures never block or undo the document write; they are logged
    /// and then reported to the caller as `Io` after the write has landed.
    pub async fn run<T, F>(&self, mutator: F) -> Result<(Document, T)>
    where
        F: FnOnce(Document) -> Result<(Document, T)>,
    {
        let raw_before = self.file.read_raw().await?;
        let current = parse_document(&raw_before, self.file.path())?;

        let (next, value) = match apply(mutator, current) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::debug!("Mutation aborted without side effects: {}", e);
                return Err(e);
            }
        };
        let serialized = serialize_document(&next)?;

        let mut deferred: Option<LecternError> = None;
        if !raw_before.trim().is_empty() {
            if let Err(e) = self.snapshots.snapshot(raw_before.as_bytes()).await {
                tracing::warn!("Snapshot failed, writing document anyway: {}", e);
                deferred = Some(e);
            }
        }

        if let Err(e) = self.file.write(serialized.as_bytes()).await {
            tracing::error!("Failed to commit {:?}: {}", self.file.path(), e);
            return Err(e);
        }

        if let Err(e) = self.snapshots.prune().await {
            tracing::warn!("Snapshot pruning failed: {}", e);
            deferred.get_or_insert(e);
        }

        if let Some(e) = deferred {
            return Err(LecternError::io(format!(
                "document committed ({} records) but backup maintenance failed: {}",
                next.len(),
                e
            )));
        }

        tracing::info!("Committed {:?} ({} records)", self.file.path(), next.len());
        Ok((next, value))
    }
}

/// Calls the mutator, turning a panic into a rejection so the worker lives on.
fn apply<T, F>(mutator: F, current: Document) -> Result<(Document, T)>
where
    F: FnOnce(Document) -> Result<(Document, T)>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| mutator(current))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Mutator panicked: {}", message);
            Err(LecternError::rejected(format!("mutation panicked: {}", message)))
        }
    }
}

type Job = Box<dyn FnOnce(CommitPipeline) -> BoxFuture<'static, ()> + Send>;

/// Single-writer queue in front of a [`CommitPipeline`].
///
/// Cloning shares the same queue. The worker stops once every clone is gone.
#[derive(Debug, Clone)]
pub struct MutationSerializer {
    sender: mpsc::UnboundedSender<Job>,
}

impl MutationSerializer {
    /// Starts the worker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(pipeline: CommitPipeline) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job(pipeline.clone()).await;
            }
            tracing::debug!("Mutation serializer for {:?} stopped", pipeline.file().path());
        });

        Self { sender }
    }

    /// Enqueues `mutator` and returns a handle resolving to its outcome.
    ///
    /// The job is queued before this returns, so submission order is call
    /// order. Dropping the handle does not cancel the job; it still runs
    /// exactly once in its turn.
    pub fn submit<T, F>(&self, mutator: F) -> MutationHandle<T>
    where
        F: FnOnce(Document) -> Result<(Document, T)> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let job: Job = Box::new(move |pipeline: CommitPipeline| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let result = pipeline.run(mutator).await;
                // The caller may have stopped waiting.
                let _ = reply.send(result);
            })
        });

        let state = match self.sender.send(job) {
            Ok(()) => HandleState::Pending(outcome),
            Err(_) => HandleState::Failed(Some(LecternError::internal(
                "mutation serializer is not running",
            ))),
        };
        MutationHandle { state }
    }
}

/// Completion handle for a submitted mutation.
#[must_use = "dropping the handle discards the outcome, the mutation still runs"]
pub struct MutationHandle<T> {
    state: HandleState<T>,
}

enum HandleState<T> {
    Pending(oneshot::Receiver<Result<(Document, T)>>),
    Failed(Option<LecternError>),
}

impl<T> Future for MutationHandle<T> {
    type Output = Result<(Document, T)>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            HandleState::Pending(outcome) => Pin::new(outcome).poll(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(LecternError::internal(
                        "mutation serializer stopped before replying",
                    ))
                })
            }),
            HandleState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or_else(|| {
                LecternError::internal("mutation handle polled after completion")
            }))),
        }
    }
}
