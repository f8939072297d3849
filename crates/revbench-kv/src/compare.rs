//! Transaction compare predicates

use crate::types::KeyValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Expected relation between the stored field and the constant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareResult {
    #[default]
    Equal,
    Greater,
    Less,
    NotEqual,
}

/// The stored field a predicate inspects, with the constant to compare against.
///
/// Exactly one target exists per predicate; the type makes zero or several
/// targets unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareTarget {
    ModRevision(i64),
    CreateRevision(i64),
    Version(i64),
    Value(Vec<u8>),
}

/// A single boolean test against one stored key.
///
/// Build with a target constructor, then pick the relation:
///
/// ```
/// use revbench_kv::{Compare, CompareResult};
///
/// // "key is absent"
/// let absent = Compare::mod_revision("lock", 0).equal();
/// assert_eq!(absent.result, CompareResult::Equal);
///
/// let newer = Compare::version("lock", 3).greater();
/// assert_eq!(newer.result, CompareResult::Greater);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compare {
    pub key: Vec<u8>,
    pub result: CompareResult,
    pub target: CompareTarget,
}

impl Compare {
    pub fn new(key: impl Into<Vec<u8>>, result: CompareResult, target: CompareTarget) -> Self {
        Self {
            key: key.into(),
            result,
            target,
        }
    }

    pub fn mod_revision(key: impl Into<Vec<u8>>, revision: i64) -> Self {
        Self::new(key, CompareResult::Equal, CompareTarget::ModRevision(revision))
    }

    pub fn create_revision(key: impl Into<Vec<u8>>, revision: i64) -> Self {
        Self::new(key, CompareResult::Equal, CompareTarget::CreateRevision(revision))
    }

    pub fn version(key: impl Into<Vec<u8>>, version: i64) -> Self {
        Self::new(key, CompareResult::Equal, CompareTarget::Version(version))
    }

    pub fn value(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, CompareResult::Equal, CompareTarget::Value(value.into()))
    }

    pub fn equal(mut self) -> Self {
        self.result = CompareResult::Equal;
        self
    }

    pub fn greater(mut self) -> Self {
        self.result = CompareResult::Greater;
        self
    }

    pub fn less(mut self) -> Self {
        self.result = CompareResult::Less;
        self
    }

    pub fn not_equal(mut self) -> Self {
        self.result = CompareResult::NotEqual;
        self
    }

    /// Evaluate the predicate against the stored entry for `self.key`.
    ///
    /// An absent key reads its revisions and version as `0`, which makes
    /// `mod_revision == 0` the "key absent" check. A value predicate never
    /// holds for an absent key.
    pub fn evaluate(&self, stored: Option<&KeyValue>) -> bool {
        let ordering = match (&self.target, stored) {
            (CompareTarget::Value(_), None) => return false,
            (CompareTarget::Value(expected), Some(kv)) => kv.value.as_slice().cmp(expected.as_slice()),
            (CompareTarget::ModRevision(rev), kv) => kv.map_or(0, |kv| kv.mod_revision).cmp(rev),
            (CompareTarget::CreateRevision(rev), kv) => kv.map_or(0, |kv| kv.create_revision).cmp(rev),
            (CompareTarget::Version(version), kv) => kv.map_or(0, |kv| kv.version).cmp(version),
        };

        match self.result {
            CompareResult::Equal => ordering == Ordering::Equal,
            CompareResult::Greater => ordering == Ordering::Greater,
            CompareResult::Less => ordering == Ordering::Less,
            CompareResult::NotEqual => ordering != Ordering::Equal,
        }
    }
}
