use std::sync::Arc;
use std::time::Duration;

use source_bound::BindingStore;
use source_bound::MemKvStore;
use source_bound::Settings;
use tokio::sync::mpsc;

pub const WORKER1: &str = "dm-worker-1";
pub const WORKER2: &str = "dm-worker-2";
pub const SOURCE1: &str = "mysql-replica-1";
pub const SOURCE2: &str = "mysql-replica-2";

// watch notifications on the in-memory store arrive well within this
pub const WAIT_FOR_EVENT_IN_MS: u64 = 500;

pub fn new_store() -> (Arc<MemKvStore>, BindingStore<MemKvStore>) {
    crate::enable_logger();
    let kv = Arc::new(MemKvStore::new());
    let store = BindingStore::new(kv.clone(), Settings::default()).expect("default settings");
    (kv, store)
}

pub async fn next_within<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(WAIT_FOR_EVENT_IN_MS), rx.recv())
        .await
        .ok()
        .flatten()
}
