//! Revision-ordered watch over bindings.
//!
//! ```text
//! KvStore::watch ─► WatchStream ─► watch_source_bound ─┬─► out_tx: SourceBound
//!                                                       └─► err_tx: Error
//! ```
//!
//! Store events are turned into [`SourceBound`] notifications one at a time,
//! in the order the store emits them. A delete becomes a tombstone carrying
//! the worker (recovered from the key) and an empty source, since the store
//! does not report the value that was removed.

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::BindingStore;
use super::SourceBound;
use crate::Error;
use crate::Event;
use crate::EventType;
use crate::KeyScope;
use crate::KvStore;
use crate::Result;

/// A watch running on its own task, see
/// [`BindingStore::spawn_source_bound_watch`].
#[derive(Debug)]
pub struct SourceBoundWatch {
    /// Binding changes in store order
    pub bounds: mpsc::Receiver<SourceBound>,
    /// Decode and transport errors
    pub errors: mpsc::Receiver<Error>,
    /// Completes when the watch stops
    pub handle: JoinHandle<()>,
}

impl<S: KvStore> BindingStore<S> {
    /// Streams binding changes for `worker` (every worker when empty),
    /// starting at `revision`, until `cancel` fires or the store stream ends.
    ///
    /// - put events are decoded and sent on `out_tx`
    /// - delete events become tombstones on `out_tx`
    /// - values that fail to decode are reported on `err_tx`, and the watch
    ///   carries on with the next event
    /// - a transport error is reported on `err_tx` and ends the watch; the
    ///   caller decides whether to watch again from the last seen revision
    ///
    /// Cancellation wins over a pending send and is not reported. The watch
    /// also stops once either receiver is dropped.
    pub async fn watch_source_bound(
        &self,
        cancel: CancellationToken,
        worker: &str,
        revision: i64,
        out_tx: mpsc::Sender<SourceBound>,
        err_tx: mpsc::Sender<Error>,
    ) {
        let (key, scope) = if worker.is_empty() {
            (self.keyspace().bound_prefix.clone(), KeyScope::Prefix)
        } else {
            (self.keyspace().bound_key(worker), KeyScope::Exact)
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            opened = self.store().watch(Bytes::from(key), scope, revision) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                warn!(worker, revision, error = %e, "Failed to open source bound watch");
                deliver(&cancel, &err_tx, e.into()).await;
                return;
            }
        };
        debug!(worker, revision, "Source bound watch started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(worker, "Source bound watch cancelled");
                    return;
                }
                next = stream.next() => next,
            };

            let resp = match next {
                Some(Ok(resp)) => resp,
                Some(Err(e)) => {
                    warn!(worker, error = %e, "Source bound watch failed");
                    deliver(&cancel, &err_tx, e.into()).await;
                    return;
                }
                None => {
                    debug!(worker, "Source bound watch stream closed");
                    return;
                }
            };

            for event in resp.events {
                let delivered = match self.bound_from_event(event) {
                    Ok(bound) => {
                        trace!(worker, ?bound, "Source bound changed");
                        deliver(&cancel, &out_tx, bound).await
                    }
                    Err(e) => {
                        warn!(worker, error = %e, "Skipping undecodable source bound event");
                        deliver(&cancel, &err_tx, e).await
                    }
                };
                if !delivered {
                    return;
                }
            }
        }
    }

    /// Runs [`watch_source_bound`](Self::watch_source_bound) on a new task
    /// with channels sized by [`WatchConfig`](crate::WatchConfig).
    pub fn spawn_source_bound_watch(
        &self,
        cancel: CancellationToken,
        worker: impl Into<String>,
        revision: i64,
    ) -> SourceBoundWatch {
        let watch = &self.settings().watch;
        let (out_tx, bounds) = mpsc::channel(watch.bound_channel_capacity);
        let (err_tx, errors) = mpsc::channel(watch.error_channel_capacity);

        let this = self.clone();
        let worker = worker.into();
        let handle = tokio::spawn(async move {
            this.watch_source_bound(cancel, &worker, revision, out_tx, err_tx)
                .await;
        });

        SourceBoundWatch {
            bounds,
            errors,
            handle,
        }
    }

    fn bound_from_event(
        &self,
        event: Event,
    ) -> Result<SourceBound> {
        match event.event_type {
            EventType::Put => {
                let mut bound = SourceBound::decode(&event.kv.value)?;
                bound.revision = event.kv.mod_revision;
                Ok(bound)
            }
            EventType::Delete => {
                let worker = self.keyspace().worker_from_bound_key(&event.kv.key)?;
                Ok(SourceBound::tombstone(worker, event.kv.mod_revision))
            }
        }
    }
}

/// Sends `item` unless cancelled first. False when the watch should stop.
async fn deliver<T>(
    cancel: &CancellationToken,
    tx: &mpsc::Sender<T>,
    item: T,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}
