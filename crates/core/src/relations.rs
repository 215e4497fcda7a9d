//! Tag sets and the diff between a coffee's current and target tags.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::types::TagId;

/// A deduplicated, ordered set of tag IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Number of distinct tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: TagId) -> bool {
        self.0.contains(&id)
    }

    /// Add a tag; returns `false` if it was already present.
    pub fn insert(&mut self, id: TagId) -> bool {
        self.0.insert(id)
    }

    /// Iterate in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.0.iter().copied()
    }

    /// Tags in `self` that are not in `other`, in ascending order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).copied().collect())
    }

    /// The IDs as raw UUIDs, e.g. for binding a `uuid[]` parameter.
    #[must_use]
    pub fn to_uuids(&self) -> Vec<Uuid> {
        self.iter().map(|id| id.as_uuid()).collect()
    }

    /// The IDs as a vector, in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TagId> {
        self.iter().collect()
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<&[TagId]> for TagSet {
    fn from(ids: &[TagId]) -> Self {
        ids.iter().copied().collect()
    }
}

/// The associations to delete and to insert so that a coffee's current tag
/// set becomes the target set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Associations present now but absent from the target.
    pub remove: TagSet,
    /// Associations in the target that don't exist yet.
    pub insert: TagSet,
}

impl TagDiff {
    /// Diff `current` against `target`.
    ///
    /// Applying `remove` then `insert` to `current` yields exactly `target`.
    #[must_use]
    pub fn between(current: &TagSet, target: &TagSet) -> Self {
        Self {
            remove: current.difference(target),
            insert: target.difference(current),
        }
    }

    /// Whether applying the diff changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.insert.is_empty()
    }
}
