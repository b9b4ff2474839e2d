//! Key ordering: comparators and the default comparator selector.

use crate::runtime::{Handle, Runtime};
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

/// Strict "less than" over keys. Two keys are equivalent when neither is
/// less than the other; multi-containers group equivalent keys.
pub trait Comparator<K: ?Sized> {
    fn less(a: &K, b: &K) -> bool;
}

/// Orders plain keys by `Ord`.
#[derive(Copy, Clone, Debug, Default)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn less(a: &K, b: &K) -> bool {
        a < b
    }
}

/// Orders handle keys with the host's rich comparison.
pub struct HostOrder<R>(PhantomData<fn() -> R>);

impl<R: Runtime> Comparator<Handle<R>> for HostOrder<R> {
    #[inline]
    fn less(a: &Handle<R>, b: &Handle<R>) -> bool {
        R::less(a.raw(), b.raw())
    }
}

impl<R> fmt::Debug for HostOrder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostOrder")
    }
}

/// Picks the comparator a container uses when none is named.
pub trait DefaultOrder: Sized {
    type Order: Comparator<Self>;
}

/// Total-order wrapper the native tree is keyed by.
///
/// `seq` breaks ties between equivalent keys: single-result containers
/// always store 0, multi-containers store an increasing insertion number,
/// so equal keys sit together in insertion order.
pub struct Ordered<K, C> {
    pub(crate) key: K,
    pub(crate) seq: u64,
    _cmp: PhantomData<fn() -> C>,
}

impl<K, C> Ordered<K, C> {
    #[inline]
    pub(crate) fn new(key: K, seq: u64) -> Self {
        Self {
            key,
            seq,
            _cmp: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Clone, C> Clone for Ordered<K, C> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone(), self.seq)
    }
}

impl<K: fmt::Debug, C> fmt::Debug for Ordered<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.key, self.seq)
    }
}

/// Three-way comparison derived from a strict "less than".
#[inline]
pub(crate) fn compare<K, C: Comparator<K>>(a: &K, b: &K) -> Ordering {
    if C::less(a, b) {
        Ordering::Less
    } else if C::less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

impl<K, C: Comparator<K>> Ord for Ordered<K, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare::<K, C>(&self.key, &other.key).then(self.seq.cmp(&other.seq))
    }
}

impl<K, C: Comparator<K>> PartialOrd for Ordered<K, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, C: Comparator<K>> PartialEq for Ordered<K, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K, C: Comparator<K>> Eq for Ordered<K, C> {}
