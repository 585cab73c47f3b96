//! Per-collection cache with optimistic writes.
//!
//! Every write goes through [`Collection::mutate`]:
//!
//! 1. cancel any in-flight refetch of the collection,
//! 2. snapshot the records and apply the optimistic change (same critical
//!    section as step 1, so a later mutation always snapshots after an
//!    earlier one has applied),
//! 3. await the remote commit and fold the authoritative result back in,
//! 4. on failure restore the snapshot verbatim,
//! 5. [`Collection::settle`] marks the collection stale; the owner then
//!    refetches.
//!
//! The lock is never held across an `.await`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{Item, Project};
use crate::telemetry::{Event, Handle};

/// A record the cache can hold.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn position(&self) -> i64;
}

impl Record for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> i64 {
        self.position
    }
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> i64 {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Items,
    Projects,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Items => "items",
            CollectionKind::Projects => "projects",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchOutcome {
    /// The cache now holds this many authoritative records.
    Fresh(usize),
    /// A mutation started (or a newer refetch began) while the read was in
    /// flight; its result was discarded.
    Cancelled,
    /// Other mutations are still in flight; the last one to settle refetches.
    Deferred,
}

/// Records as they were right before an optimistic apply.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    records: Vec<T>,
    loaded: bool,
}

impl<T> Snapshot<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }
}

#[derive(Debug)]
struct RefetchSlot {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug)]
struct CollectionState<T> {
    records: Vec<T>,
    loaded: bool,
    stale: bool,
    version: u64,
    in_flight: usize,
    next_generation: u64,
    refetch: Option<RefetchSlot>,
}

/// Handle to an in-flight read, used to drop its result if superseded.
#[derive(Debug, Clone)]
pub struct RefetchTicket {
    generation: u64,
    token: CancellationToken,
}

impl RefetchTicket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Clone)]
pub struct Collection<T> {
    kind: CollectionKind,
    inner: Arc<Mutex<CollectionState<T>>>,
    telemetry: Arc<Handle>,
}

impl<T: fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &self.kind)
            .field("state", &*self.inner.lock())
            .finish()
    }
}

impl<T: Record> Collection<T> {
    pub fn new(kind: CollectionKind, telemetry: Arc<Handle>) -> Self {
        Self {
            kind,
            inner: Arc::new(Mutex::new(CollectionState {
                records: Vec::new(),
                loaded: false,
                stale: true,
                version: 0,
                in_flight: 0,
                next_generation: 0,
                refetch: None,
            })),
            telemetry,
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn records(&self) -> Vec<T> {
        self.inner.lock().records.clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an authoritative list has been received at least once.
    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    pub fn is_stale(&self) -> bool {
        self.inner.lock().stale
    }

    /// Bumped on every change to the records.
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Mutations applied but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    /// Whether a refetch is currently outstanding.
    pub fn is_fetching(&self) -> bool {
        self.inner.lock().refetch.is_some()
    }

    /// Position one past the current last record.
    pub fn next_position(&self) -> i64 {
        next_position(&self.inner.lock().records)
    }

    /// Steps 1 and 2: cancel the outstanding refetch, snapshot, apply.
    pub fn begin_mutation<F>(&self, action: &'static str, apply: F) -> Snapshot<T>
    where
        F: FnOnce(&mut Vec<T>),
    {
        let mut state = self.inner.lock();
        if let Some(slot) = state.refetch.take() {
            slot.token.cancel();
            self.telemetry.record(Event::RefetchCancelled(self.kind));
        }
        let snapshot = Snapshot {
            records: state.records.clone(),
            loaded: state.loaded,
        };
        apply(&mut state.records);
        state.version = state.version.wrapping_add(1);
        state.in_flight += 1;
        drop(state);

        self.telemetry.record(Event::MutationApplied {
            collection: self.kind,
            action,
        });
        snapshot
    }

    /// Fold the authoritative outcome of a commit into the cache.
    pub fn reconcile<F>(&self, apply: F)
    where
        F: FnOnce(&mut Vec<T>),
    {
        let mut state = self.inner.lock();
        apply(&mut state.records);
        state.version = state.version.wrapping_add(1);
    }

    /// Step 4: put back exactly what the snapshot captured.
    pub fn rollback(&self, snapshot: Snapshot<T>) {
        let mut state = self.inner.lock();
        state.records = snapshot.records;
        state.loaded = snapshot.loaded;
        state.version = state.version.wrapping_add(1);
    }

    /// Step 5: the mutation is over, the cache no longer trusted.
    pub fn settle(&self) {
        let mut state = self.inner.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.stale = true;
    }

    /// Mark the collection stale without a mutation.
    pub fn invalidate(&self) {
        self.inner.lock().stale = true;
    }

    /// Run steps 1 to 4 around `commit`. `reconcile` receives the
    /// authoritative result on success. The caller settles and refetches.
    pub async fn mutate<R, A, Fut, C>(
        &self,
        action: &'static str,
        apply: A,
        commit: Fut,
        reconcile: C,
    ) -> Result<R>
    where
        A: FnOnce(&mut Vec<T>),
        Fut: Future<Output = Result<R>>,
        C: FnOnce(&mut Vec<T>, &R),
    {
        let snapshot = self.begin_mutation(action, apply);
        match commit.await {
            Ok(result) => {
                self.reconcile(|records| reconcile(records, &result));
                self.telemetry.record(Event::MutationCommitted {
                    collection: self.kind,
                    action,
                });
                debug!(collection = self.kind.as_str(), action, "mutation committed");
                Ok(result)
            }
            Err(err) => {
                self.rollback(snapshot);
                self.telemetry.record(Event::MutationRolledBack {
                    collection: self.kind,
                    action,
                    error: err.to_string(),
                });
                warn!(
                    collection = self.kind.as_str(),
                    action,
                    error = %err,
                    "remote commit failed; optimistic change rolled back"
                );
                Err(err)
            }
        }
    }

    /// Register a new read. Any older outstanding read is superseded.
    pub fn begin_refetch(&self) -> RefetchTicket {
        let mut state = self.inner.lock();
        if let Some(previous) = state.refetch.take() {
            previous.token.cancel();
        }
        state.next_generation = state.next_generation.wrapping_add(1);
        let slot = RefetchSlot {
            generation: state.next_generation,
            token: CancellationToken::new(),
        };
        let ticket = RefetchTicket {
            generation: slot.generation,
            token: slot.token.clone(),
        };
        state.refetch = Some(slot);
        drop(state);

        self.telemetry.record(Event::RefetchStarted(self.kind));
        ticket
    }

    /// Install `records` if the ticket is still the current read. Returns
    /// whether they were installed.
    pub fn finish_refetch(&self, ticket: &RefetchTicket, records: Vec<T>) -> bool {
        let mut state = self.inner.lock();
        let current = matches!(&state.refetch, Some(slot) if slot.generation == ticket.generation);
        if !current || ticket.is_cancelled() {
            return false;
        }
        state.refetch = None;
        state.records = records;
        state.loaded = true;
        state.stale = state.in_flight > 0;
        state.version = state.version.wrapping_add(1);
        true
    }

    /// Drop the ticket's slot after a failed read.
    pub fn abandon_refetch(&self, ticket: &RefetchTicket) {
        let mut state = self.inner.lock();
        if matches!(&state.refetch, Some(slot) if slot.generation == ticket.generation) {
            state.refetch = None;
        }
    }

    /// Read the authoritative list through `fetch`, unless a mutation
    /// cancels the read first.
    pub async fn refetch<Fut>(&self, fetch: Fut) -> Result<RefetchOutcome>
    where
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let ticket = self.begin_refetch();
        let token = ticket.token.clone();
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = fetch => Some(result),
        };

        match fetched {
            None => {
                debug!(collection = self.kind.as_str(), "refetch cancelled by a newer write");
                Ok(RefetchOutcome::Cancelled)
            }
            Some(Ok(records)) => {
                let count = records.len();
                if self.finish_refetch(&ticket, records) {
                    self.telemetry.record(Event::RefetchCompleted {
                        collection: self.kind,
                        count,
                    });
                    Ok(RefetchOutcome::Fresh(count))
                } else {
                    Ok(RefetchOutcome::Cancelled)
                }
            }
            Some(Err(err)) => {
                self.abandon_refetch(&ticket);
                self.telemetry.record(Event::RefetchFailed {
                    collection: self.kind,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

pub(crate) fn next_position<T: Record>(records: &[T]) -> i64 {
    records
        .iter()
        .map(|record| record.position())
        .max()
        .map_or(1, |max| max + 1)
}
