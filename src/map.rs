//! Ordered map and multimap facades.

use crate::bridge::{facade_common, RefTree};
use crate::cursor::{Cursor, Position, PositionError};
use crate::order::{Comparator, DefaultOrder};
use crate::runtime::Runtime;
use crate::slot::{Slot, SlotDefault};
use crate::view::{Items, ViewIter, ViewRange, Values};
use core::fmt;

/// Ordered map with unique keys.
///
/// Handle keys and values each own one host reference while stored.
/// Reading a handle value out (`get`, `get_item`, cursors, views) hands
/// the caller a fresh `Owned` reference.
///
/// ```
/// use handle_btree::{BTreeMap, CountingRuntime};
///
/// let mut m = BTreeMap::<CountingRuntime, String, i64>::new();
/// m.insert("b".to_string(), 2);
/// m.insert_or_assign("a".to_string(), 1);
/// m.insert_or_assign("a".to_string(), 10);
/// assert_eq!(m.get(&"a".to_string()), Some(&10));
/// assert_eq!(*m.get_item("z".to_string()), 0);
/// assert_eq!(m.len(), 3);
/// ```
pub struct BTreeMap<R, K, V, C = <K as DefaultOrder>::Order>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    tree: RefTree<R, K, V, C>,
}

impl<R, K, V, C> BTreeMap<R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    facade_common!(V);

    /// Insert `(key, value)` unless an equivalent key is present; an
    /// existing value is left untouched.
    pub fn insert(&mut self, key: K, value: V) -> (Position, bool) {
        let (at, inserted) = self.tree.insert_unique(key, value);
        (self.tree.position(at), inserted)
    }

    /// Insert `(key, value)`, or overwrite the value under an equivalent
    /// key. The boolean is true when a new element was created.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Position, bool) {
        let (at, inserted) = self.tree.insert_or_assign(key, value);
        (self.tree.position(at), inserted)
    }

    /// The value under `key`, inserting the default value first when the
    /// key is absent.
    pub fn get_item(&mut self, key: K) -> V::Out<'_>
    where
        V: SlotDefault<R>,
    {
        self.tree.get_or_insert_default(key)
    }

    /// The value under `key`, without inserting.
    pub fn get(&self, key: &K) -> Option<V::Out<'_>> {
        self.tree.cursor_at(self.tree.native().find(key)).value()
    }

    /// Erase `key`; returns the number of elements erased (0 or 1).
    pub fn erase(&mut self, key: &K) -> usize {
        self.tree.erase_unique(key)
    }

    pub fn cursor(&self, position: Position) -> Result<Cursor<'_, R, K, V, C>, PositionError> {
        self.tree.cursor(position)
    }

    pub fn values(&self) -> ViewRange<'_, Values, R, K, V, C> {
        self.tree.view()
    }

    pub fn items(&self) -> ViewRange<'_, Items, R, K, V, C> {
        self.tree.view()
    }

    pub fn iter(&self) -> ViewIter<'_, Items, R, K, V, C> {
        self.items().iter()
    }
}

/// Ordered multimap; elements with equivalent keys keep insertion order.
pub struct BTreeMultimap<R, K, V, C = <K as DefaultOrder>::Order>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    tree: RefTree<R, K, V, C>,
}

impl<R, K, V, C> BTreeMultimap<R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    facade_common!(V);

    /// Insert `(key, value)` after every element with an equivalent key.
    pub fn insert(&mut self, key: K, value: V) -> Position {
        let at = self.tree.insert_multi(key, value);
        self.tree.position(at)
    }

    /// Erase every element whose key is equivalent to `key`.
    pub fn erase(&mut self, key: &K) -> usize {
        self.tree.erase_multi(key)
    }

    pub fn count(&self, key: &K) -> usize {
        self.tree.native().count(key)
    }

    pub fn equal_range(&self, key: &K) -> (Position, Position) {
        let (first, last) = self.tree.native().equal_range(key);
        (self.tree.position(first), self.tree.position(last))
    }

    pub fn cursor(&self, position: Position) -> Result<Cursor<'_, R, K, V, C>, PositionError> {
        self.tree.cursor(position)
    }

    pub fn values(&self) -> ViewRange<'_, Values, R, K, V, C> {
        self.tree.view()
    }

    pub fn items(&self) -> ViewRange<'_, Items, R, K, V, C> {
        self.tree.view()
    }

    pub fn iter(&self) -> ViewIter<'_, Items, R, K, V, C> {
        self.items().iter()
    }
}

macro_rules! map_traits {
    ($map:ident) => {
        impl<R, K, V, C> Default for $map<R, K, V, C>
        where
            R: Runtime,
            K: Slot<R>,
            V: Slot<R>,
            C: Comparator<K>,
        {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<R, K, V, C> fmt::Debug for $map<R, K, V, C>
        where
            R: Runtime,
            K: Slot<R> + fmt::Debug,
            V: Slot<R> + fmt::Debug,
            C: Comparator<K>,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.tree.native().iter().map(|(_, k, v)| (k, v)))
                    .finish()
            }
        }

        impl<R, K, V, C> Extend<(K, V)> for $map<R, K, V, C>
        where
            R: Runtime,
            K: Slot<R>,
            V: Slot<R>,
            C: Comparator<K>,
        {
            fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
                for (key, value) in iter {
                    self.insert(key, value);
                }
            }
        }

        impl<R, K, V, C> FromIterator<(K, V)> for $map<R, K, V, C>
        where
            R: Runtime,
            K: Slot<R>,
            V: Slot<R>,
            C: Comparator<K>,
        {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                let mut map = Self::new();
                map.extend(iter);
                map
            }
        }

        impl<'a, R, K, V, C> IntoIterator for &'a $map<R, K, V, C>
        where
            R: Runtime,
            K: Slot<R> + 'a,
            V: Slot<R> + 'a,
            C: Comparator<K>,
        {
            type Item = (K::Out<'a>, V::Out<'a>);
            type IntoIter = ViewIter<'a, Items, R, K, V, C>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }
    };
}

map_traits!(BTreeMap);
map_traits!(BTreeMultimap);
