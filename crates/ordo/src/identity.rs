//! Identifiers and positions.
//!
//! Snapshots never look at item content. Sections and items are addressed by
//! identifiers, and positions inside a snapshot are expressed as
//! [`IndexPath`]s.

use std::fmt;
use std::hash::Hash;

/// Bound shared by section and item identifiers.
///
/// Identifiers must be cheap to clone, hash stably and compare by value.
/// They are `Send + Sync` so snapshots can be diffed off the UI thread.
pub trait Identifier: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Identifier for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// The position of an item in a sectioned snapshot.
///
/// Index paths order by section first, then by item.
///
/// # Validity
///
/// An index path is only meaningful for the snapshot it was obtained from.
/// After the snapshot is edited or a new one is applied, look the item up
/// again by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
    /// The section index.
    pub section: usize,
    /// The item index within the section.
    pub item: usize,
}

impl IndexPath {
    /// Creates an index path.
    #[inline]
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }

    /// Returns the index path of a sibling in the same section.
    #[inline]
    pub const fn sibling(&self, item: usize) -> Self {
        Self::new(self.section, item)
    }

    /// Returns the index path of the next item in the same section.
    #[inline]
    pub const fn next(&self) -> Self {
        self.sibling(self.item + 1)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

impl From<(usize, usize)> for IndexPath {
    fn from((section, item): (usize, usize)) -> Self {
        Self::new(section, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_section_major() {
        let mut paths = vec![
            IndexPath::new(1, 0),
            IndexPath::new(0, 5),
            IndexPath::new(0, 1),
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![IndexPath::new(0, 1), IndexPath::new(0, 5), IndexPath::new(1, 0)]
        );
    }

    #[test]
    fn test_sibling_and_next() {
        let path = IndexPath::new(2, 3);
        assert_eq!(path.sibling(0), IndexPath::new(2, 0));
        assert_eq!(path.next(), IndexPath::new(2, 4));
        assert_eq!(path.to_string(), "[2, 3]");
        assert_eq!(IndexPath::from((1, 1)), IndexPath::new(1, 1));
    }
}
