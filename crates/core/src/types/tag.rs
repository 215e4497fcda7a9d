//! Tag type.

use serde::{Deserialize, Serialize};

use super::id::TagId;

/// A label that coffees can carry.
///
/// Tags live independently of coffees: removing a coffee removes its
/// associations but never the tags themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Unique tag ID.
    pub id: TagId,
    /// Display name. Matching against it is case-insensitive.
    pub name: String,
}

impl Tag {
    /// Whether this tag's name equals `name`, ignoring case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_named_ignores_case() {
        let tag = Tag {
            id: TagId::random(),
            name: "Sweet".to_owned(),
        };
        assert!(tag.is_named("sweet"));
        assert!(tag.is_named("SWEET"));
        assert!(!tag.is_named("sweetish"));
    }
}
