//! Stored record type

use serde::{Deserialize, Serialize};

/// A stored key with its revision metadata.
///
/// `mod_revision >= create_revision` always holds; `version` counts writes
/// since creation and starts over when the key is deleted and recreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Revision of the write that created the key
    pub create_revision: i64,
    /// Revision of the most recent write
    pub mod_revision: i64,
    /// Number of writes since creation
    pub version: i64,
}

impl KeyValue {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Set all three revision fields at once
    pub fn with_revisions(mut self, create_revision: i64, mod_revision: i64, version: i64) -> Self {
        self.create_revision = create_revision;
        self.mod_revision = mod_revision;
        self.version = version;
        self
    }

    /// Key as UTF-8, lossily
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Value as UTF-8, lossily
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}
