//! Durable source-to-worker bindings on a revisioned key-value store.
//!
//! A controller records which worker owns which replication source; workers
//! read and watch their binding to react to reassignment. The store is the
//! system of record: it orders every write with a global revision, and this
//! crate maps its keys and events to typed [`SourceBound`] records.
//!
//! ```ignore
//! let store = BindingStore::new(Arc::new(MemKvStore::new()), Settings::default())?;
//!
//! let rev = store.put_source_bound(&SourceBound::new("mysql-replica-1", "dm-worker-1")).await?;
//! let (bounds, _) = store.get_source_bound("dm-worker-1").await?;
//!
//! let watch = store.spawn_source_bound_watch(CancellationToken::new(), "dm-worker-1", rev);
//! ```

mod bound;
mod config;
mod constants;
mod errors;
mod source;
mod storage;

pub use bound::*;
pub use self::config::*;
pub use errors::*;
pub use source::*;
pub use storage::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
