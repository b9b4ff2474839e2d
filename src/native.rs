//! NativeTree: ordered structural layer with stable positions.
//!
//! `BTreeMap` keeps the order, `SlotMap` owns the elements. A position is
//! the element's generational slot key, so erasing one element never
//! invalidates positions to the others and a position to an erased
//! element is detected instead of aliasing a newer one. This layer knows
//! nothing about host references.

use crate::order::{compare, Comparator, Ordered};
use crate::reentrancy::DebugReentrancy;
use core::cmp::Ordering;
use core::ops::{Bound, RangeBounds};
use slotmap::{DefaultKey, SlotMap};
use std::collections::{btree_map, BTreeMap};

/// A position in a `NativeTree`; `Pos::END` is one past the last element.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Pos(Option<DefaultKey>);

impl Pos {
    pub const END: Pos = Pos(None);

    #[inline]
    pub fn is_end(self) -> bool {
        self.0.is_none()
    }
}

struct Entry<K, V, C> {
    at: Ordered<K, C>,
    value: V,
}

// Order index plus element storage. Kept apart from the reentrancy
// tracker so a guard can stay alive across mutation.
struct Storage<K, V, C> {
    index: BTreeMap<Ordered<K, C>, DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V, C>>,
}

pub struct NativeTree<K, V, C> {
    store: Storage<K, V, C>,
    next_seq: u64,
    reentrancy: DebugReentrancy,
}

impl<K, V, C> NativeTree<K, V, C>
where
    K: Clone,
    C: Comparator<K>,
{
    pub fn new() -> Self {
        Self {
            store: Storage {
                index: BTreeMap::new(),
                slots: SlotMap::with_key(),
            },
            // Unique inserts use 0, so a multi insert always sorts after
            // them.
            next_seq: 1,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.slots.is_empty()
    }

    pub fn begin(&self) -> Pos {
        self.store
            .index
            .first_key_value()
            .map(|(_, &k)| Pos(Some(k)))
            .unwrap_or(Pos::END)
    }

    #[inline]
    pub fn end(&self) -> Pos {
        Pos::END
    }

    /// False for positions whose element has been erased.
    pub fn is_valid(&self, pos: Pos) -> bool {
        pos.0.map_or(true, |k| self.store.slots.contains_key(k))
    }

    pub fn get(&self, pos: Pos) -> Option<(&K, &V)> {
        self.store.get(pos)
    }

    pub fn value_mut(&mut self, pos: Pos) -> Option<&mut V> {
        self.store.slots.get_mut(pos.0?).map(|e| &mut e.value)
    }

    /// Position after `pos`. `None` when `pos` is the end or stale.
    pub fn next(&self, pos: Pos) -> Option<Pos> {
        let _g = self.reentrancy.enter("next");
        let e = self.store.slots.get(pos.0?)?;
        Some(self.store.successor(&e.at))
    }

    /// Position before `pos`. `None` when `pos` is the first element, the
    /// tree is empty, or `pos` is stale.
    pub fn prev(&self, pos: Pos) -> Option<Pos> {
        let _g = self.reentrancy.enter("prev");
        let index = &self.store.index;
        match pos.0 {
            None => index.last_key_value().map(|(_, &k)| Pos(Some(k))),
            Some(k) => {
                let e = self.store.slots.get(k)?;
                index
                    .range::<Ordered<K, C>, _>((Bound::Unbounded, Bound::Excluded(&e.at)))
                    .next_back()
                    .map(|(_, &k)| Pos(Some(k)))
            }
        }
    }

    pub fn lower_bound(&self, key: &K) -> Pos {
        let _g = self.reentrancy.enter("lower_bound");
        self.store.lower_bound(key)
    }

    pub fn upper_bound(&self, key: &K) -> Pos {
        let _g = self.reentrancy.enter("upper_bound");
        self.store.upper_bound(key)
    }

    /// First element equivalent to `key`, or the end.
    pub fn find(&self, key: &K) -> Pos {
        let _g = self.reentrancy.enter("find");
        self.store.find(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter("contains");
        !self.store.find(key).is_end()
    }

    pub fn equal_range(&self, key: &K) -> (Pos, Pos) {
        let _g = self.reentrancy.enter("equal_range");
        (self.store.lower_bound(key), self.store.upper_bound(key))
    }

    pub fn count(&self, key: &K) -> usize {
        let _g = self.reentrancy.enter("count");
        let lo = Ordered::new(key.clone(), 0);
        let hi = Ordered::new(key.clone(), u64::MAX);
        self.store.index.range::<Ordered<K, C>, _>(lo..=hi).count()
    }

    /// Insert unless an equivalent key is present. Returns the position of
    /// the new or the blocking element and whether insertion happened.
    pub fn insert_unique(&mut self, key: K, value: V) -> (Pos, bool) {
        let _g = self.reentrancy.enter("insert_unique");
        let found = self.store.find(&key);
        if !found.is_end() {
            return (found, false);
        }
        (self.store.link(key, 0, value), true)
    }

    /// Insert after every element equivalent to `key`.
    pub fn insert_multi(&mut self, key: K, value: V) -> Pos {
        let _g = self.reentrancy.enter("insert_multi");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.store.link(key, seq, value)
    }

    /// Like `insert_unique`, but builds the value only when inserting.
    pub fn try_emplace<F>(&mut self, key: K, make: F) -> (Pos, bool)
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter("try_emplace");
        let found = self.store.find(&key);
        if !found.is_end() {
            return (found, false);
        }
        (self.store.link(key, 0, make()), true)
    }

    /// Unlink the element at `pos` and hand it back with the position that
    /// followed it. `None` for the end or a stale position.
    pub fn remove(&mut self, pos: Pos) -> Option<(K, V, Pos)> {
        let _g = self.reentrancy.enter("remove");
        let k = pos.0?;
        let next = self.store.successor(&self.store.slots.get(k)?.at);
        let (key, value) = self.store.unlink(k);
        Some((key, value, next))
    }

    /// Unlink every element in `[first, last)` and hand them back in order.
    pub fn drain_range(&mut self, first: Pos, last: Pos) -> Vec<(K, V)> {
        let _g = self.reentrancy.enter("drain_range");
        let mut doomed = Vec::new();
        let mut at = first;
        while at != last {
            let Some(k) = at.0 else { break };
            let Some(e) = self.store.slots.get(k) else { break };
            doomed.push(k);
            at = self.store.successor(&e.at);
        }
        doomed.into_iter().map(|k| self.store.unlink(k)).collect()
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        self.store.index.clear();
        self.store.slots.clear();
    }

    /// In-order traversal of `(position, key, value)`.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter {
            order: self.store.index.values(),
            slots: &self.store.slots,
        }
    }
}

impl<K, V, C> Storage<K, V, C>
where
    K: Clone,
    C: Comparator<K>,
{
    fn get(&self, pos: Pos) -> Option<(&K, &V)> {
        let e = self.slots.get(pos.0?)?;
        Some((e.at.key(), &e.value))
    }

    // Comparisons run before storage changes, so a panicking comparator
    // leaves both halves in step.
    fn link(&mut self, key: K, seq: u64, value: V) -> Pos {
        let at = Ordered::new(key, seq);
        match self.index.entry(at.clone()) {
            btree_map::Entry::Vacant(slot) => {
                let k = self.slots.insert(Entry { at, value });
                slot.insert(k);
                Pos(Some(k))
            }
            btree_map::Entry::Occupied(_) => {
                unreachable!("an equivalent key must not already hold this sequence number")
            }
        }
    }

    fn unlink(&mut self, k: DefaultKey) -> (K, V) {
        let entry = self
            .slots
            .get(k)
            .expect("slot must exist for a linked position");
        self.index.remove(&entry.at);
        let entry = self
            .slots
            .remove(k)
            .expect("slot must exist for a linked position");
        (entry.at.key, entry.value)
    }

    fn successor(&self, at: &Ordered<K, C>) -> Pos {
        self.first_in((Bound::Excluded(at), Bound::Unbounded))
    }

    fn first_in<B>(&self, range: B) -> Pos
    where
        B: RangeBounds<Ordered<K, C>>,
    {
        self.index
            .range::<Ordered<K, C>, B>(range)
            .next()
            .map(|(_, &k)| Pos(Some(k)))
            .unwrap_or(Pos::END)
    }

    fn lower_bound(&self, key: &K) -> Pos {
        let probe = Ordered::new(key.clone(), 0);
        self.first_in((Bound::Included(probe), Bound::Unbounded))
    }

    fn upper_bound(&self, key: &K) -> Pos {
        let probe = Ordered::new(key.clone(), u64::MAX);
        self.first_in((Bound::Excluded(probe), Bound::Unbounded))
    }

    fn find(&self, key: &K) -> Pos {
        let lb = self.lower_bound(key);
        match self.get(lb) {
            Some((found, _)) if compare::<K, C>(found, key) == Ordering::Equal => lb,
            _ => Pos::END,
        }
    }
}

impl<K, V, C> Default for NativeTree<K, V, C>
where
    K: Clone,
    C: Comparator<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over a `NativeTree`.
pub struct Iter<'a, K, V, C> {
    order: btree_map::Values<'a, Ordered<K, C>, DefaultKey>,
    slots: &'a SlotMap<DefaultKey, Entry<K, V, C>>,
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C> {
    type Item = (Pos, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let &k = self.order.next()?;
        let e = self
            .slots
            .get(k)
            .expect("indexed slot must be live");
        Some((Pos(Some(k)), &e.at.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}
