// Store namespaces
pub(crate) const DEFAULT_BOUND_PREFIX: &str = "/dm-master/bound-worker/";
pub(crate) const DEFAULT_LAST_BOUND_PREFIX: &str = "/dm-master/last-bound-worker/";
pub(crate) const DEFAULT_SOURCE_CONFIG_PREFIX: &str = "/dm-master/v2/upstream/config/";

// In-memory store
pub(crate) const MEM_STORE_EVENT_BUFFER: usize = 1024;
pub(crate) const MEM_STORE_WATCH_BUFFER: usize = 128;
