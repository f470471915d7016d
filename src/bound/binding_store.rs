use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use autometrics::autometrics;
use bytes::Bytes;
use tracing::debug;
use tracing::trace;

use super::SourceBound;
use crate::config::id_from_key;
use crate::Compare;
use crate::CompareOp;
use crate::DecodeError;
use crate::Error;
use crate::KeyScope;
use crate::KeyValue;
use crate::KeyspaceConfig;
use crate::KvStore;
use crate::Op;
use crate::Result;
use crate::Settings;
use crate::Txn;
use crate::API_SLO;

/// Result of a guarded write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOutcome {
    /// Store revision after the transaction, whether or not it wrote
    pub revision: i64,
    /// False when a condition failed and nothing was written
    pub succeeded: bool,
}

/// Typed access to bindings and source configs kept in a revisioned store.
///
/// The store handle is injected; cloning shares it. No operation retries or
/// locks on its own: the store serializes conflicting writes and hands out
/// the revision order, and failures are returned to the caller classified.
pub struct BindingStore<S: KvStore> {
    store: Arc<S>,
    settings: Arc<Settings>,
}

impl<S: KvStore> Clone for BindingStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: KvStore> fmt::Debug for BindingStore<S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BindingStore")
            .field("keyspace", &self.settings.keyspace)
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> BindingStore<S> {
    /// Validates `settings` and wraps `store`.
    pub fn new(
        store: Arc<S>,
        settings: Settings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            store,
            settings: Arc::new(settings),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn keyspace(&self) -> &KeyspaceConfig {
        &self.settings.keyspace
    }

    /// Writes `bound` under its worker's key, replacing any existing binding,
    /// and records it as the worker's last binding in the same transaction.
    ///
    /// Returns the revision at which the write took effect.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if either identifier is empty
    /// - [`Error::Transport`] if the store cannot be reached
    #[autometrics(objective = API_SLO)]
    pub async fn put_source_bound(
        &self,
        bound: &SourceBound,
    ) -> Result<i64> {
        let resp = self.store.txn(Txn::new().and_then(self.put_ops(bound)?)).await?;
        debug!(
            source = %bound.source_id,
            worker = %bound.worker_id,
            revision = resp.revision,
            "Source bound put"
        );
        Ok(resp.revision)
    }

    /// Like [`put_source_bound`](Self::put_source_bound), but only writes if
    /// every condition in `compares` holds at commit time.
    #[autometrics(objective = API_SLO)]
    pub async fn put_source_bound_if(
        &self,
        bound: &SourceBound,
        compares: Vec<Compare>,
    ) -> Result<TxnOutcome> {
        let txn = Txn::new().when(compares).and_then(self.put_ops(bound)?);
        let resp = self.store.txn(txn).await?;
        debug!(
            source = %bound.source_id,
            worker = %bound.worker_id,
            revision = resp.revision,
            succeeded = resp.succeeded,
            "Conditional source bound put"
        );
        Ok(TxnOutcome {
            revision: resp.revision,
            succeeded: resp.succeeded,
        })
    }

    /// Binds only if the worker currently has no live binding.
    pub async fn bind_if_unbound(
        &self,
        bound: &SourceBound,
    ) -> Result<TxnOutcome> {
        let key = self.keyspace().bound_key(&bound.worker_id);
        self.put_source_bound_if(bound, vec![Compare::absent(key)]).await
    }

    /// Moves `source` from `old_worker` to `new_worker` in one transaction,
    /// so a failure halfway never leaves the source unbound.
    ///
    /// Nothing is written unless `old_worker` is currently bound to `source`;
    /// the outcome then reports `succeeded == false`.
    #[autometrics(objective = API_SLO)]
    pub async fn replace_source_bound(
        &self,
        source: &str,
        old_worker: &str,
        new_worker: &str,
    ) -> Result<TxnOutcome> {
        if old_worker.is_empty() {
            return Err(Error::InvalidArgument("old worker cannot be empty".into()));
        }
        let old_key = self.keyspace().bound_key(old_worker);
        let held = Compare::value(
            old_key.clone(),
            CompareOp::Equal,
            SourceBound::new(source, old_worker).encode(),
        );
        let mut ops = vec![Op::delete(old_key)];
        ops.extend(self.put_ops(&SourceBound::new(source, new_worker))?);

        let resp = self.store.txn(Txn::new().when([held]).and_then(ops)).await?;
        debug!(
            source,
            old_worker,
            new_worker,
            revision = resp.revision,
            succeeded = resp.succeeded,
            "Source bound replaced"
        );
        Ok(TxnOutcome {
            revision: resp.revision,
            succeeded: resp.succeeded,
        })
    }

    /// Reads live bindings.
    ///
    /// With an empty `worker` every binding is returned, otherwise at most
    /// the one for `worker`. The returned revision is the store's read
    /// revision even when nothing was found, usable as a watch start point.
    ///
    /// # Errors
    /// - [`Error::Decode`] if a stored binding is corrupt
    /// - [`Error::Transport`] if the store cannot be reached
    #[autometrics(objective = API_SLO)]
    pub async fn get_source_bound(
        &self,
        worker: &str,
    ) -> Result<(HashMap<String, SourceBound>, i64)> {
        let (key, scope) = if worker.is_empty() {
            (self.keyspace().bound_prefix.clone(), KeyScope::Prefix)
        } else {
            (self.keyspace().bound_key(worker), KeyScope::Exact)
        };

        let resp = self.store.range(Bytes::from(key), scope).await?;
        let bounds = bounds_from_kvs(&self.keyspace().bound_prefix, resp.kvs)?;
        trace!(worker, found = bounds.len(), revision = resp.revision, "Source bound get");
        Ok((bounds, resp.revision))
    }

    /// Reads the most recent binding of every worker, including workers
    /// whose live binding has since been deleted.
    #[autometrics(objective = API_SLO)]
    pub async fn get_last_source_bounds(&self) -> Result<(HashMap<String, SourceBound>, i64)> {
        let prefix = Bytes::from(self.keyspace().last_bound_prefix.clone());
        let resp = self.store.range(prefix, KeyScope::Prefix).await?;
        let bounds = bounds_from_kvs(&self.keyspace().last_bound_prefix, resp.kvs)?;
        Ok((bounds, resp.revision))
    }

    /// Removes the binding of `worker`. Succeeds when there is none.
    #[autometrics(objective = API_SLO)]
    pub async fn delete_source_bound(
        &self,
        worker: &str,
    ) -> Result<i64> {
        self.delete_source_bounds(&[worker]).await
    }

    /// Removes the bindings of all `workers` in one transaction.
    #[autometrics(objective = API_SLO)]
    pub async fn delete_source_bounds(
        &self,
        workers: &[&str],
    ) -> Result<i64> {
        if workers.iter().any(|w| w.is_empty()) {
            return Err(Error::InvalidArgument("worker cannot be empty".into()));
        }
        let ops = workers
            .iter()
            .map(|worker| Op::delete(self.keyspace().bound_key(worker)));

        let resp = self.store.txn(Txn::new().and_then(ops)).await?;
        debug!(?workers, revision = resp.revision, "Source bound deleted");
        Ok(resp.revision)
    }

    fn put_ops(
        &self,
        bound: &SourceBound,
    ) -> Result<Vec<Op>> {
        if bound.source_id.is_empty() {
            return Err(Error::InvalidArgument("source cannot be empty".into()));
        }
        if bound.worker_id.is_empty() {
            return Err(Error::InvalidArgument("worker cannot be empty".into()));
        }

        let value = bound.encode();
        Ok(vec![
            Op::put(self.keyspace().bound_key(&bound.worker_id), value.clone()),
            Op::put(self.keyspace().last_bound_key(&bound.worker_id), value),
        ])
    }
}

/// Decodes binding values read under `prefix`, keyed by the worker in their
/// store key and stamped with the revision they were last modified at.
///
/// A value naming a different worker than its key is reported as corrupt.
pub(crate) fn bounds_from_kvs(
    prefix: &str,
    kvs: Vec<KeyValue>,
) -> Result<HashMap<String, SourceBound>> {
    let mut bounds = HashMap::with_capacity(kvs.len());
    for kv in kvs {
        let worker = id_from_key(prefix, &kv.key)?;
        let mut bound = SourceBound::decode(&kv.value)?;
        if bound.worker_id != worker {
            return Err(DecodeError::WorkerMismatch {
                key: String::from_utf8_lossy(&kv.key).into_owned(),
                worker: bound.worker_id,
            }
            .into());
        }
        bound.revision = kv.mod_revision;
        bounds.insert(worker, bound);
    }
    Ok(bounds)
}
