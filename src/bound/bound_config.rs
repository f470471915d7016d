use autometrics::autometrics;
use tracing::debug;
use tracing::warn;

use super::bounds_from_kvs;
use super::BindingStore;
use super::SourceBound;
use crate::source::source_configs_from_kvs;
use crate::Error;
use crate::KeyScope;
use crate::KvStore;
use crate::Op;
use crate::OpResponse;
use crate::Result;
use crate::SourceConfig;
use crate::StoreError;
use crate::Txn;
use crate::TxnResponse;
use crate::API_SLO;

impl<S: KvStore> BindingStore<S> {
    /// Resolves what `worker` should run right now.
    ///
    /// - no binding: empty bound, `None`, current revision
    /// - binding whose source has no config: [`Error::ConfigMissing`]
    /// - otherwise the binding and its config, read together at one revision
    ///
    /// The binding is looked up first to learn its source; binding and config
    /// are then read in one transaction. If the binding moved to another
    /// source in between, the joint read is repeated up to
    /// `retry.get_bound_config_attempts` times before giving up with
    /// [`Error::BoundUnstable`].
    #[autometrics(objective = API_SLO)]
    pub async fn get_source_bound_config(
        &self,
        worker: &str,
    ) -> Result<(SourceBound, Option<SourceConfig>, i64)> {
        if worker.is_empty() {
            return Err(Error::InvalidArgument("worker cannot be empty".into()));
        }

        let (mut bounds, revision) = self.get_source_bound(worker).await?;
        let Some(mut bound) = bounds.remove(worker) else {
            return Ok((SourceBound::default(), None, revision));
        };

        let attempts = self.settings().retry.get_bound_config_attempts;
        for attempt in 1..=attempts {
            let resp = self
                .store()
                .txn(Txn::new().and_then([
                    Op::get(self.keyspace().bound_key(worker), KeyScope::Exact),
                    Op::get(
                        self.keyspace().source_config_key(&bound.source_id),
                        KeyScope::Exact,
                    ),
                ]))
                .await?;
            let revision = resp.revision;
            let (current, config) = self.split_joint_read(resp)?;

            let Some(current) = current else {
                debug!(worker, revision, "Source bound removed during config lookup");
                return Ok((SourceBound::default(), None, revision));
            };

            if current.source_id != bound.source_id {
                debug!(
                    worker,
                    attempt,
                    previous = %bound.source_id,
                    current = %current.source_id,
                    "Source bound changed during config lookup, retrying"
                );
                bound = current;
                continue;
            }

            return match config {
                Some(config) => Ok((current, Some(config), revision)),
                None => {
                    warn!(worker, source = %current.source_id, "Source bound without source config");
                    Err(Error::ConfigMissing {
                        worker: worker.to_string(),
                        source_id: current.source_id,
                    })
                }
            };
        }

        Err(Error::BoundUnstable {
            worker: worker.to_string(),
            attempts,
        })
    }

    fn split_joint_read(
        &self,
        resp: TxnResponse,
    ) -> Result<(Option<SourceBound>, Option<SourceConfig>)> {
        let mut responses = resp.responses.into_iter();
        let (Some(OpResponse::Get { kvs: bound_kvs }), Some(OpResponse::Get { kvs: config_kvs })) =
            (responses.next(), responses.next())
        else {
            return Err(StoreError::UnexpectedResponse(
                "joint bound/config read expects two get responses".into(),
            )
            .into());
        };

        let bound = bounds_from_kvs(&self.keyspace().bound_prefix, bound_kvs)?
            .into_values()
            .next();
        let config = source_configs_from_kvs(config_kvs)?.into_values().next();
        Ok((bound, config))
    }
}
