//! Transaction primitives: guarded, atomic batches of store operations.

use bytes::Bytes;

use super::KeyScope;
use super::KeyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
}

impl CompareOp {
    fn holds<T: Ord>(
        self,
        actual: T,
        expected: T,
    ) -> bool {
        match self {
            CompareOp::Equal => actual == expected,
            CompareOp::NotEqual => actual != expected,
            CompareOp::Greater => actual > expected,
            CompareOp::Less => actual < expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareTarget {
    CreateRevision(i64),
    ModRevision(i64),
    Version(i64),
    Value(Bytes),
}

/// A condition on the current state of a single key.
///
/// Revision and version targets treat an absent key as 0; a value target
/// never holds for an absent key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compare {
    pub key: Bytes,
    pub op: CompareOp,
    pub target: CompareTarget,
}

impl Compare {
    pub fn create_revision(
        key: impl Into<Bytes>,
        op: CompareOp,
        revision: i64,
    ) -> Self {
        Self {
            key: key.into(),
            op,
            target: CompareTarget::CreateRevision(revision),
        }
    }

    pub fn mod_revision(
        key: impl Into<Bytes>,
        op: CompareOp,
        revision: i64,
    ) -> Self {
        Self {
            key: key.into(),
            op,
            target: CompareTarget::ModRevision(revision),
        }
    }

    pub fn version(
        key: impl Into<Bytes>,
        op: CompareOp,
        version: i64,
    ) -> Self {
        Self {
            key: key.into(),
            op,
            target: CompareTarget::Version(version),
        }
    }

    pub fn value(
        key: impl Into<Bytes>,
        op: CompareOp,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            op,
            target: CompareTarget::Value(value.into()),
        }
    }

    /// Holds only while `key` does not exist.
    pub fn absent(key: impl Into<Bytes>) -> Self {
        Self::create_revision(key, CompareOp::Equal, 0)
    }

    /// Evaluate against the current entry for `self.key`, if any.
    pub fn evaluate(
        &self,
        current: Option<&KeyValue>,
    ) -> bool {
        match &self.target {
            CompareTarget::CreateRevision(rev) => self
                .op
                .holds(current.map(|kv| kv.create_revision).unwrap_or(0), *rev),
            CompareTarget::ModRevision(rev) => self
                .op
                .holds(current.map(|kv| kv.mod_revision).unwrap_or(0), *rev),
            CompareTarget::Version(version) => self
                .op
                .holds(current.map(|kv| kv.version).unwrap_or(0), *version),
            CompareTarget::Value(value) => match current {
                Some(kv) => self.op.holds(&kv.value, value),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Put { key: Bytes, value: Bytes },
    Delete { key: Bytes, scope: KeyScope },
    Get { key: Bytes, scope: KeyScope },
}

impl Op {
    pub fn put(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Op::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Bytes>) -> Self {
        Op::Delete {
            key: key.into(),
            scope: KeyScope::Exact,
        }
    }

    pub fn get(
        key: impl Into<Bytes>,
        scope: KeyScope,
    ) -> Self {
        Op::Get {
            key: key.into(),
            scope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpResponse {
    Put,
    /// Number of keys actually removed
    Delete { deleted: u64 },
    Get { kvs: Vec<KeyValue> },
}

/// `if compares then success else failure`, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Txn {
    pub compares: Vec<Compare>,
    pub success: Vec<Op>,
    pub failure: Vec<Op>,
}

impl Txn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(
        mut self,
        compares: impl IntoIterator<Item = Compare>,
    ) -> Self {
        self.compares.extend(compares);
        self
    }

    pub fn and_then(
        mut self,
        ops: impl IntoIterator<Item = Op>,
    ) -> Self {
        self.success.extend(ops);
        self
    }

    pub fn or_else(
        mut self,
        ops: impl IntoIterator<Item = Op>,
    ) -> Self {
        self.failure.extend(ops);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxnResponse {
    /// Whether every compare held (and the success branch ran)
    pub succeeded: bool,
    /// Store revision after the transaction
    pub revision: i64,
    /// One response per op of the branch that ran, in order
    pub responses: Vec<OpResponse>,
}
