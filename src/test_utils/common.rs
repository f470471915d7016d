use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::BindingStore;
use crate::Event;
use crate::EventType;
use crate::KeyValue;
use crate::MemKvStore;
use crate::MockKvStore;
use crate::Settings;
use crate::SourceBound;

pub(crate) const WORKER1: &str = "dm-worker-1";
pub(crate) const WORKER2: &str = "dm-worker-2";
pub(crate) const SOURCE1: &str = "mysql-replica-1";
pub(crate) const SOURCE2: &str = "mysql-replica-2";

/// Binding store over a fresh in-memory store; the raw store is returned
/// too so tests can compact it or inspect revisions.
pub(crate) fn mem_binding_store() -> (Arc<MemKvStore>, BindingStore<MemKvStore>) {
    let store = Arc::new(MemKvStore::new());
    let bindings =
        BindingStore::new(store.clone(), Settings::default()).expect("default settings are valid");
    (store, bindings)
}

pub(crate) fn mock_binding_store(mock: MockKvStore) -> BindingStore<MockKvStore> {
    BindingStore::new(Arc::new(mock), Settings::default()).expect("default settings are valid")
}

pub(crate) fn bound_kv(
    bound: &SourceBound,
    mod_revision: i64,
) -> KeyValue {
    KeyValue {
        key: Bytes::from(format!("/dm-master/bound-worker/{}", bound.worker_id)),
        value: bound.encode(),
        create_revision: mod_revision,
        mod_revision,
        version: 1,
    }
}

pub(crate) fn put_event(kv: KeyValue) -> Event {
    Event {
        event_type: EventType::Put,
        kv,
    }
}

pub(crate) fn delete_event(
    worker: &str,
    revision: i64,
) -> Event {
    Event {
        event_type: EventType::Delete,
        kv: KeyValue {
            key: Bytes::from(format!("/dm-master/bound-worker/{worker}")),
            mod_revision: revision,
            ..Default::default()
        },
    }
}

/// Waits up to `ms` for the next item; `None` on timeout or closed channel.
pub(crate) async fn recv_within<T>(
    rx: &mut mpsc::Receiver<T>,
    ms: u64,
) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(ms), rx.recv())
        .await
        .ok()
        .flatten()
}
