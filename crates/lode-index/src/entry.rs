//! Index entry type.

use lode_types::{ContentHash, Timestamp};
use serde::{Deserialize, Serialize};

/// What the index knows about one key.
///
/// `created` is set when the key is first written and never changes.
/// `modified` moves forward on every write that changes the content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Content hash of the current value.
    pub hash: ContentHash,
    /// When the key was first written (unix seconds).
    pub created: Timestamp,
    /// When the value last changed (unix seconds).
    pub modified: Timestamp,
}

impl IndexEntry {
    /// Entry for a key written for the first time at `now`.
    pub fn new(hash: ContentHash, now: Timestamp) -> Self {
        Self {
            hash,
            created: now,
            modified: now,
        }
    }

    /// Returns `true` if the value changed after it was first written.
    pub fn was_updated(&self) -> bool {
        self.modified > self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_created_and_modified_at_once() {
        let entry = IndexEntry::new(ContentHash::from_digest([1; 32]), 42);
        assert_eq!(entry.created, 42);
        assert_eq!(entry.modified, 42);
        assert!(!entry.was_updated());
    }

    #[test]
    fn later_modification_counts_as_update() {
        let mut entry = IndexEntry::new(ContentHash::from_digest([1; 32]), 42);
        entry.modified = 43;
        assert!(entry.was_updated());
    }
}
