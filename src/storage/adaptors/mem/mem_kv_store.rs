use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::MEM_STORE_EVENT_BUFFER;
use crate::constants::MEM_STORE_WATCH_BUFFER;
use crate::Event;
use crate::EventType;
use crate::KeyScope;
use crate::KeyValue;
use crate::KvStore;
use crate::Op;
use crate::OpResponse;
use crate::RangeResponse;
use crate::StoreError;
use crate::StoreResult;
use crate::Txn;
use crate::TxnResponse;
use crate::WatchResponse;
use crate::WatchStream;

#[derive(Debug)]
struct MemState {
    data: BTreeMap<Bytes, KeyValue>,

    // Revision of the last committed write
    revision: i64,

    // History before this revision has been discarded
    compact_revision: i64,

    // One batch per committed write revision, ascending
    history: Vec<WatchResponse>,
}

/// In-process revisioned key-value store.
///
/// Follows the same revision rules as the distributed store it stands in for:
/// the counter starts at 1, every transaction with at least one effective
/// write advances it by exactly one, and deleting a missing key is not a
/// write. Full history is kept until `compact` so watches can replay from
/// any retained revision.
#[derive(Debug)]
pub struct MemKvStore {
    state: Mutex<MemState>,

    // Live fan-out of committed batches, sent while holding `state`
    events_tx: broadcast::Sender<Arc<WatchResponse>>,
}

impl Default for MemKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemKvStore {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(MEM_STORE_EVENT_BUFFER);
        Self {
            state: Mutex::new(MemState {
                data: BTreeMap::new(),
                revision: 1,
                compact_revision: 0,
                history: Vec::new(),
            }),
            events_tx,
        }
    }

    pub fn current_revision(&self) -> i64 {
        self.state.lock().revision
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards history older than `revision`. Watches starting before it
    /// fail with [`StoreError::Compacted`].
    pub fn compact(
        &self,
        revision: i64,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        if revision > state.revision {
            return Err(StoreError::Unavailable(format!(
                "cannot compact to future revision {revision}, current revision is {}",
                state.revision
            )));
        }
        if revision <= state.compact_revision {
            return Err(StoreError::Compacted {
                requested: revision,
                compact_revision: state.compact_revision,
            });
        }

        state.history.retain(|batch| batch.revision >= revision);
        state.compact_revision = revision;
        debug!(compact_revision = revision, "Memory store compacted");
        Ok(())
    }

    fn collect(
        data: &BTreeMap<Bytes, KeyValue>,
        key: &Bytes,
        scope: KeyScope,
    ) -> Vec<KeyValue> {
        match scope {
            KeyScope::Exact => data.get(key).cloned().into_iter().collect(),
            KeyScope::Prefix => data
                .range(key.clone()..)
                .take_while(|(k, _)| k.starts_with(key))
                .map(|(_, kv)| kv.clone())
                .collect(),
        }
    }

    fn apply_op(
        state: &mut MemState,
        op: Op,
        pending_revision: &mut Option<i64>,
        events: &mut Vec<Event>,
    ) -> OpResponse {
        let base_revision = state.revision;
        let mut next_revision = || *pending_revision.get_or_insert(base_revision + 1);

        match op {
            Op::Put { key, value } => {
                let revision = next_revision();
                let (create_revision, version) = match state.data.get(&key) {
                    Some(existing) => (existing.create_revision, existing.version + 1),
                    None => (revision, 1),
                };
                let kv = KeyValue {
                    key: key.clone(),
                    value,
                    create_revision,
                    mod_revision: revision,
                    version,
                };
                state.data.insert(key, kv.clone());
                events.push(Event {
                    event_type: EventType::Put,
                    kv,
                });
                OpResponse::Put
            }
            Op::Delete { key, scope } => {
                let doomed: Vec<Bytes> = Self::collect(&state.data, &key, scope)
                    .into_iter()
                    .map(|kv| kv.key)
                    .collect();
                for key in doomed.iter() {
                    let revision = next_revision();
                    state.data.remove(key);
                    events.push(Event {
                        event_type: EventType::Delete,
                        kv: KeyValue {
                            key: key.clone(),
                            mod_revision: revision,
                            ..Default::default()
                        },
                    });
                }
                OpResponse::Delete {
                    deleted: doomed.len() as u64,
                }
            }
            Op::Get { key, scope } => OpResponse::Get {
                kvs: Self::collect(&state.data, &key, scope),
            },
        }
    }
}

fn filter_batch(
    batch: &WatchResponse,
    key: &Bytes,
    scope: KeyScope,
) -> Option<WatchResponse> {
    let events: Vec<Event> = batch
        .events
        .iter()
        .filter(|event| scope.matches(key, &event.kv.key))
        .cloned()
        .collect();

    if events.is_empty() {
        None
    } else {
        Some(WatchResponse {
            revision: batch.revision,
            events,
        })
    }
}

async fn forward_watch(
    key: Bytes,
    scope: KeyScope,
    start_revision: i64,
    replay: Vec<WatchResponse>,
    mut live: broadcast::Receiver<Arc<WatchResponse>>,
    tx: mpsc::Sender<StoreResult<WatchResponse>>,
) {
    for batch in replay {
        if tx.send(Ok(batch)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = tx.closed() => {
                trace!(key = ?key, "Watch consumer dropped");
                return;
            }
            received = live.recv() => match received {
                Ok(batch) => {
                    if batch.revision < start_revision {
                        continue;
                    }
                    if let Some(batch) = filter_batch(&batch, &key, scope) {
                        if tx.send(Ok(batch)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(key = ?key, skipped, "Watch lagged behind memory store");
                    let _ = tx.send(Err(StoreError::WatchLagged(skipped))).await;
                    return;
                }
                Err(RecvError::Closed) => return,
            }
        }
    }
}

#[async_trait]
impl KvStore for MemKvStore {
    async fn range(
        &self,
        key: Bytes,
        scope: KeyScope,
    ) -> StoreResult<RangeResponse> {
        let state = self.state.lock();
        Ok(RangeResponse {
            kvs: Self::collect(&state.data, &key, scope),
            revision: state.revision,
        })
    }

    async fn txn(
        &self,
        txn: Txn,
    ) -> StoreResult<TxnResponse> {
        let mut state = self.state.lock();

        let succeeded = txn
            .compares
            .iter()
            .all(|cmp| cmp.evaluate(state.data.get(&cmp.key)));
        let ops = if succeeded { txn.success } else { txn.failure };

        let mut pending_revision = None;
        let mut events = Vec::new();
        let responses = ops
            .into_iter()
            .map(|op| Self::apply_op(&mut state, op, &mut pending_revision, &mut events))
            .collect();

        if let Some(revision) = pending_revision {
            state.revision = revision;
            let batch = WatchResponse { revision, events };
            trace!(revision, events = batch.events.len(), "Memory store committed");
            state.history.push(batch.clone());
            // No receivers is fine
            let _ = self.events_tx.send(Arc::new(batch));
        }

        Ok(TxnResponse {
            succeeded,
            revision: state.revision,
            responses,
        })
    }

    async fn watch(
        &self,
        key: Bytes,
        scope: KeyScope,
        start_revision: i64,
    ) -> StoreResult<WatchStream> {
        let (replay, live) = {
            let state = self.state.lock();
            if start_revision > 0 && start_revision < state.compact_revision {
                return Err(StoreError::Compacted {
                    requested: start_revision,
                    compact_revision: state.compact_revision,
                });
            }

            // Subscribe under the lock so no batch falls between replay and live.
            let live = self.events_tx.subscribe();
            let replay: Vec<WatchResponse> = if start_revision > 0 {
                state
                    .history
                    .iter()
                    .filter(|batch| batch.revision >= start_revision)
                    .filter_map(|batch| filter_batch(batch, &key, scope))
                    .collect()
            } else {
                Vec::new()
            };
            (replay, live)
        };

        debug!(key = ?key, ?scope, start_revision, replayed = replay.len(), "Memory store watch opened");

        let (tx, rx) = mpsc::channel(MEM_STORE_WATCH_BUFFER);
        tokio::spawn(forward_watch(key, scope, start_revision, replay, live, tx));

        Ok(ReceiverStream::new(rx).boxed())
    }
}
