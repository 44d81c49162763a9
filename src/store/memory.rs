//! In-process bucket and cluster.
//!
//! Behaves like the remote store at the boundary: CAS stamping, duplicate
//! and missing key failures, atomic statement execution. Faults can be
//! scripted per operation so retry and classification paths are reachable
//! without a real cluster.

use super::{Bucket, Cluster, StoreFailure, StoreResult, StoredDocument};
use crate::connection::BucketConfig;
use crate::core::{Cas, JsonObject};
use crate::query::{Projection, SetExpression, UpdateStatement};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Store operations that can be counted and faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketOp {
    Insert,
    Get,
    Replace,
    Remove,
    Query,
}

/// A scripted outcome consumed by the next call of one operation.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail the call with this failure without touching the data.
    Fail(StoreFailure),
    /// Stall for this long, then proceed normally.
    Delay(Duration),
}

#[derive(Debug)]
struct StoredEntry {
    content: JsonObject,
    cas: Cas,
}

#[derive(Debug, Default)]
struct CallCounters {
    insert: AtomicUsize,
    get: AtomicUsize,
    replace: AtomicUsize,
    remove: AtomicUsize,
    query: AtomicUsize,
}

impl CallCounters {
    fn counter(&self, op: BucketOp) -> &AtomicUsize {
        match op {
            BucketOp::Insert => &self.insert,
            BucketOp::Get => &self.get,
            BucketOp::Replace => &self.replace,
            BucketOp::Remove => &self.remove,
            BucketOp::Query => &self.query,
        }
    }
}

pub struct MemoryBucket {
    name: String,
    documents: RwLock<HashMap<String, StoredEntry>>,
    faults: Mutex<HashMap<BucketOp, VecDeque<Fault>>>,
    calls: CallCounters,
    closed: AtomicBool,
    next_cas: AtomicU64,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            calls: CallCounters::default(),
            closed: AtomicBool::new(false),
            next_cas: AtomicU64::new(1),
        }
    }

    /// Queue a fault for the next call of `op`. Faults are consumed in order.
    pub async fn inject(&self, op: BucketOp, fault: Fault) {
        self.faults
            .lock()
            .await
            .entry(op)
            .or_default()
            .push_back(fault);
    }

    /// Queue the same failure `times` times.
    pub async fn fail_times(&self, op: BucketOp, failure: StoreFailure, times: usize) {
        let mut faults = self.faults.lock().await;
        let queue = faults.entry(op).or_default();
        for _ in 0..times {
            queue.push_back(Fault::Fail(failure.clone()));
        }
    }

    pub async fn clear_faults(&self) {
        self.faults.lock().await.clear();
    }

    /// Number of calls of `op` that reached this bucket.
    pub fn calls(&self, op: BucketOp) -> usize {
        self.calls.counter(op).load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        [
            BucketOp::Insert,
            BucketOp::Get,
            BucketOp::Replace,
            BucketOp::Remove,
            BucketOp::Query,
        ]
        .into_iter()
        .map(|op| self.calls(op))
        .sum()
    }

    /// Raw view of a stored value, bypassing counters and faults.
    pub async fn peek(&self, id: &str) -> Option<(JsonObject, Cas)> {
        self.documents
            .read()
            .await
            .get(id)
            .map(|entry| (entry.content.clone(), entry.cas))
    }

    /// Overwrite a document behind the client's back, as a concurrent writer would.
    pub async fn touch(&self, id: &str) -> Option<Cas> {
        let mut documents = self.documents.write().await;
        let entry = documents.get_mut(id)?;
        entry.cas = self.stamp();
        Some(entry.cas)
    }

    fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn stamp(&self) -> Cas {
        Cas::new(self.next_cas.fetch_add(1, Ordering::SeqCst))
    }

    async fn enter(&self, op: BucketOp) -> StoreResult<()> {
        self.calls.counter(op).fetch_add(1, Ordering::SeqCst);

        if self.is_closed() {
            return Err(StoreFailure::Other(format!(
                "bucket '{}' is closed",
                self.name
            )));
        }

        let fault = self
            .faults
            .lock()
            .await
            .get_mut(&op)
            .and_then(VecDeque::pop_front);

        match fault {
            Some(Fault::Fail(failure)) => Err(failure),
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    async fn insert(&self, id: &str, content: JsonObject) -> StoreResult<StoredDocument> {
        self.enter(BucketOp::Insert).await?;

        let mut documents = self.documents.write().await;
        if documents.contains_key(id) {
            return Err(StoreFailure::DuplicateKey(id.to_string()));
        }

        let cas = self.stamp();
        documents.insert(
            id.to_string(),
            StoredEntry {
                content: content.clone(),
                cas,
            },
        );

        Ok(StoredDocument {
            id: id.to_string(),
            content,
            cas,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<StoredDocument>> {
        self.enter(BucketOp::Get).await?;

        let documents = self.documents.read().await;
        Ok(documents.get(id).map(|entry| StoredDocument {
            id: id.to_string(),
            content: entry.content.clone(),
            cas: entry.cas,
        }))
    }

    async fn replace(
        &self,
        id: &str,
        content: JsonObject,
        cas: Option<Cas>,
    ) -> StoreResult<StoredDocument> {
        self.enter(BucketOp::Replace).await?;

        let mut documents = self.documents.write().await;
        let entry = documents
            .get_mut(id)
            .ok_or_else(|| StoreFailure::KeyNotFound(id.to_string()))?;

        if cas.is_some_and(|expected| expected != entry.cas) {
            return Err(StoreFailure::VersionMismatch(id.to_string()));
        }

        entry.content = content.clone();
        entry.cas = self.stamp();

        Ok(StoredDocument {
            id: id.to_string(),
            content,
            cas: entry.cas,
        })
    }

    async fn remove(&self, id: &str, cas: Option<Cas>) -> StoreResult<Cas> {
        self.enter(BucketOp::Remove).await?;

        let mut documents = self.documents.write().await;
        let current = documents
            .get(id)
            .map(|entry| entry.cas)
            .ok_or_else(|| StoreFailure::KeyNotFound(id.to_string()))?;

        if cas.is_some_and(|expected| expected != current) {
            return Err(StoreFailure::VersionMismatch(id.to_string()));
        }

        documents.remove(id);
        Ok(self.stamp())
    }

    async fn query(&self, statement: &UpdateStatement) -> StoreResult<Vec<JsonObject>> {
        self.enter(BucketOp::Query).await?;

        if statement.keyspace() != self.name {
            return Err(StoreFailure::Other(format!(
                "keyspace '{}' not found",
                statement.keyspace()
            )));
        }

        let mut documents = self.documents.write().await;
        let Some(entry) = documents.get_mut(statement.key()) else {
            return Ok(Vec::new());
        };

        // Work on a copy so a failing assignment leaves the stored value intact.
        let mut updated = entry.content.clone();
        for (path, expression) in statement.assignments() {
            apply_assignment(&mut updated, path, expression)?;
        }

        entry.content = updated;
        entry.cas = self.stamp();

        let row = project(&entry.content, statement.key(), statement.projections());
        Ok(vec![row])
    }
}

fn apply_assignment(
    content: &mut JsonObject,
    path: &str,
    expression: &SetExpression,
) -> StoreResult<()> {
    let slot = slot_mut(content, path)?;
    match expression {
        SetExpression::Add(amount) => {
            let current = match slot {
                Value::Null => 0,
                Value::Number(number) => number.as_i64().ok_or_else(|| {
                    StoreFailure::Other(format!("field '{path}' is not an integer"))
                })?,
                _ => {
                    return Err(StoreFailure::Other(format!(
                        "field '{path}' is not numeric"
                    )));
                }
            };
            let next = current
                .checked_add(*amount)
                .ok_or_else(|| StoreFailure::Other(format!("field '{path}' overflowed")))?;
            *slot = Value::from(next);
        }
        SetExpression::ArrayAppend(element) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            slot.as_array_mut()
                .ok_or_else(|| StoreFailure::Other(format!("field '{path}' is not an array")))?
                .push(element.clone());
        }
    }
    Ok(())
}

/// Walks `path`, creating intermediate objects, and returns the final slot.
fn slot_mut<'a>(content: &'a mut JsonObject, path: &str) -> StoreResult<&'a mut Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(StoreFailure::Other("empty path".to_string()));
    };

    let mut current = content;
    for segment in parents {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(JsonObject::new()));
        if next.is_null() {
            *next = Value::Object(JsonObject::new());
        }
        current = next.as_object_mut().ok_or_else(|| {
            StoreFailure::Other(format!("path segment '{segment}' is not an object"))
        })?;
    }

    Ok(current.entry(last.to_string()).or_insert(Value::Null))
}

fn resolve<'a>(content: &'a JsonObject, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = content.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn project(content: &JsonObject, key: &str, projections: &[Projection]) -> JsonObject {
    let mut row = JsonObject::new();
    for projection in projections {
        let value = match projection {
            Projection::Field(path) => resolve(content, path).cloned(),
            Projection::LastElement { path, .. } => resolve(content, path)
                .and_then(Value::as_array)
                .and_then(|items| items.last())
                .cloned(),
            Projection::MetaId => Some(Value::String(key.to_string())),
        };
        // Missing values are left out of the row rather than set to null.
        if let Some(value) = value {
            row.insert(projection.output_key().to_string(), value);
        }
    }
    row
}

/// A cluster holding [`MemoryBucket`]s by name.
///
/// Opening a bucket that was closed reopens the same instance, so data
/// survives a close/reopen cycle. Until a user is registered any
/// credentials are accepted.
pub struct MemoryCluster {
    buckets: Mutex<HashMap<String, Arc<MemoryBucket>>>,
    users: Mutex<HashMap<String, String>>,
    last_open: Mutex<Option<String>>,
    open_failure: Mutex<Option<StoreFailure>>,
    open_delay: Mutex<Option<Duration>>,
    opens: AtomicUsize,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            last_open: Mutex::new(None),
            open_failure: Mutex::new(None),
            open_delay: Mutex::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    /// Register a user; from then on opens must present matching credentials.
    pub async fn add_user(&self, username: &str, password: &str) {
        self.users
            .lock()
            .await
            .insert(username.to_string(), password.to_string());
    }

    /// Connection string (password masked) of the most recent open attempt.
    pub async fn last_open(&self) -> Option<String> {
        self.last_open.lock().await.clone()
    }

    async fn authenticate(&self, config: &BucketConfig) -> StoreResult<()> {
        let users = self.users.lock().await;
        if users.is_empty() {
            return Ok(());
        }

        match users.get(&config.username) {
            Some(password) if *password == config.password => Ok(()),
            _ => Err(StoreFailure::Other(format!(
                "authentication failed for user '{}'",
                config.username
            ))),
        }
    }

    /// Returns the bucket called `name`, creating it (open) if needed.
    pub async fn bucket(&self, name: &str) -> Arc<MemoryBucket> {
        self.buckets
            .lock()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone()
    }

    /// Make every open attempt fail with `failure` until cleared with `None`.
    pub async fn fail_opens(&self, failure: Option<StoreFailure>) {
        *self.open_failure.lock().await = failure;
    }

    pub async fn set_open_delay(&self, delay: Option<Duration>) {
        *self.open_delay.lock().await = delay;
    }

    /// Number of open attempts seen so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn open_bucket(&self, config: &BucketConfig) -> StoreResult<Arc<dyn Bucket>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_open.lock().await = Some(config.to_url());

        let delay = *self.open_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.open_failure.lock().await.clone() {
            return Err(failure);
        }
        self.authenticate(config).await?;

        let bucket = self.bucket(&config.bucket).await;
        bucket.reopen();
        Ok(bucket as Arc<dyn Bucket>)
    }
}
