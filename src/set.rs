//! Ordered set and multiset facades.

use crate::bridge::{facade_common, RefTree};
use crate::cursor::{Position, PositionError};
use crate::order::{Comparator, DefaultOrder};
use crate::runtime::Runtime;
use crate::slot::Slot;
use crate::view::{Keys, View, ViewIter};
use core::fmt;

/// View over a set's keys.
pub type SetView<'a, R, K, C> = View<'a, Keys, R, K, (), C>;

/// Ordered set of unique keys.
///
/// Each stored handle key owns one host reference, released when the key
/// is erased, the set is cleared, or the set is dropped.
///
/// ```
/// use handle_btree::{BTreeSet, CountingRuntime};
///
/// let mut s: BTreeSet<CountingRuntime, i64> = [3, 1, 2, 1].into_iter().collect();
/// assert_eq!(s.len(), 3);
/// assert_eq!(s.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
/// assert_eq!(s.erase(&2), 1);
/// assert_eq!(s.erase(&2), 0);
/// ```
pub struct BTreeSet<R, K, C = <K as DefaultOrder>::Order>
where
    R: Runtime,
    K: Slot<R>,
    C: Comparator<K>,
{
    tree: RefTree<R, K, (), C>,
}

impl<R, K, C> BTreeSet<R, K, C>
where
    R: Runtime,
    K: Slot<R>,
    C: Comparator<K>,
{
    facade_common!(());

    /// Insert `key` unless an equivalent key is present. Returns the
    /// position of the stored key and whether it was inserted.
    pub fn insert(&mut self, key: K) -> (Position, bool) {
        let (at, inserted) = self.tree.insert_unique(key, ());
        (self.tree.position(at), inserted)
    }

    /// Erase `key`; returns the number of keys erased (0 or 1).
    pub fn erase(&mut self, key: &K) -> usize {
        self.tree.erase_unique(key)
    }

    pub fn cursor(&self, position: Position) -> Result<SetView<'_, R, K, C>, PositionError> {
        self.tree.cursor(position).map(View::new)
    }

    pub fn iter(&self) -> ViewIter<'_, Keys, R, K, (), C> {
        self.keys().iter()
    }
}

/// Ordered multiset; equivalent keys are kept in insertion order.
pub struct BTreeMultiset<R, K, C = <K as DefaultOrder>::Order>
where
    R: Runtime,
    K: Slot<R>,
    C: Comparator<K>,
{
    tree: RefTree<R, K, (), C>,
}

impl<R, K, C> BTreeMultiset<R, K, C>
where
    R: Runtime,
    K: Slot<R>,
    C: Comparator<K>,
{
    facade_common!(());

    /// Insert `key` after every equivalent key already present.
    pub fn insert(&mut self, key: K) -> Position {
        let at = self.tree.insert_multi(key, ());
        self.tree.position(at)
    }

    /// Erase every key equivalent to `key`; returns how many were erased.
    pub fn erase(&mut self, key: &K) -> usize {
        self.tree.erase_multi(key)
    }

    pub fn count(&self, key: &K) -> usize {
        self.tree.native().count(key)
    }

    /// `[lower_bound(key), upper_bound(key))`.
    pub fn equal_range(&self, key: &K) -> (Position, Position) {
        let (first, last) = self.tree.native().equal_range(key);
        (self.tree.position(first), self.tree.position(last))
    }

    pub fn cursor(&self, position: Position) -> Result<SetView<'_, R, K, C>, PositionError> {
        self.tree.cursor(position).map(View::new)
    }

    pub fn iter(&self) -> ViewIter<'_, Keys, R, K, (), C> {
        self.keys().iter()
    }
}

macro_rules! set_traits {
    ($set:ident) => {
        impl<R, K, C> Default for $set<R, K, C>
        where
            R: Runtime,
            K: Slot<R>,
            C: Comparator<K>,
        {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<R, K, C> fmt::Debug for $set<R, K, C>
        where
            R: Runtime,
            K: Slot<R> + fmt::Debug,
            C: Comparator<K>,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set()
                    .entries(self.tree.native().iter().map(|(_, k, _)| k))
                    .finish()
            }
        }

        impl<R, K, C> Extend<K> for $set<R, K, C>
        where
            R: Runtime,
            K: Slot<R>,
            C: Comparator<K>,
        {
            fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
                for key in iter {
                    self.insert(key);
                }
            }
        }

        impl<R, K, C> FromIterator<K> for $set<R, K, C>
        where
            R: Runtime,
            K: Slot<R>,
            C: Comparator<K>,
        {
            fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
                let mut set = Self::new();
                set.extend(iter);
                set
            }
        }

        impl<'a, R, K, C> IntoIterator for &'a $set<R, K, C>
        where
            R: Runtime,
            K: Slot<R> + 'a,
            C: Comparator<K>,
        {
            type Item = K::Out<'a>;
            type IntoIter = ViewIter<'a, Keys, R, K, (), C>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }
    };
}

set_traits!(BTreeSet);
set_traits!(BTreeMultiset);
