//! Expected-revision tracking for sequential operation streams

use crate::response::Response;
use thiserror::Error;

/// A response carried a revision other than the one predicted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("revision mismatch: expected {expected}, got {actual} (write: {write})")]
pub struct RevisionMismatch {
    pub expected: i64,
    pub actual: i64,
    pub write: bool,
}

/// Predicts the store revision from the order of observed responses.
///
/// Only valid when a single client issues operations one at a time and no
/// one else writes to the store.
///
/// The first response sets the baseline: its revision, minus one when it was
/// a write. From then on every write must advance the revision by exactly one
/// and every read must report the current revision. After a mismatch the
/// oracle follows the observed revision so one bad response is reported once.
#[derive(Debug, Clone, Default)]
pub struct RevisionOracle {
    current: Option<i64>,
}

impl RevisionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known revision instead of the first response
    pub fn starting_at(revision: i64) -> Self {
        Self {
            current: Some(revision),
        }
    }

    /// Last revision the oracle agrees on, if any response has been seen
    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Check `response` against the prediction and advance.
    ///
    /// Returns the revision now expected to be current.
    pub fn observe(&mut self, response: &Response) -> Result<i64, RevisionMismatch> {
        let write = response.is_write();
        let actual = response.revision();
        let base = *self
            .current
            .get_or_insert(if write { actual - 1 } else { actual });

        let expected = if write { base + 1 } else { base };
        self.current = Some(actual);

        if actual == expected {
            Ok(actual)
        } else {
            Err(RevisionMismatch {
                expected,
                actual,
                write,
            })
        }
    }
}
