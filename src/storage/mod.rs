mod adaptors;
mod kv_store;
mod txn;


pub use adaptors::*;
pub use kv_store::*;
pub use txn::*;
