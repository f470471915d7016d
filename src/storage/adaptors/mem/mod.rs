mod mem_kv_store;

pub use mem_kv_store::*;
