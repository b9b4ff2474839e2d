//! Positions and cursors over a container.
//!
//! A `Position` is detached: it survives mutation of the container and is
//! checked again whenever it is used. A `Cursor` borrows the container, so
//! it cannot outlive it or see a mutation in progress.

use crate::lock::{Lock, LockGuard};
use crate::native::{NativeTree, Pos};
use crate::order::Comparator;
use crate::runtime::Runtime;
use crate::slot::Slot;
use crate::view::{Items, Keys, Projection, Values};
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Identity of one container instance; stable across moves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct OwnerId(u64);

impl OwnerId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        OwnerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A detached position in a container, or its end.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    pub(crate) owner: OwnerId,
    pub(crate) at: Pos,
}

impl Position {
    #[inline]
    pub fn is_end(&self) -> bool {
        self.at.is_end()
    }
}

/// Misuse of a detached `Position`.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("position belongs to a different container")]
    WrongContainer,
    #[error("position refers to an element that has been erased")]
    Stale,
    #[error("the end position has no element")]
    End,
}

/// Borrowing cursor over a container's elements, in key order.
///
/// Dereferencing a handle slot acquires a new reference for the caller
/// (an `Owned`); plain slots are borrowed.
pub struct Cursor<'a, R, K, V, C> {
    native: &'a NativeTree<K, V, C>,
    owner: OwnerId,
    at: Pos,
    _rt: PhantomData<fn() -> R>,
}

impl<'a, R, K, V, C> Cursor<'a, R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    pub(crate) fn new(native: &'a NativeTree<K, V, C>, owner: OwnerId, at: Pos) -> Self {
        Self {
            native,
            owner,
            at,
            _rt: PhantomData,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            owner: self.owner,
            at: self.at,
        }
    }

    pub fn is_end(&self) -> bool {
        self.at.is_end()
    }

    /// Pre-increment. Returns `false`, staying put, at the end.
    pub fn move_next(&mut self) -> bool {
        match self.native.next(self.at) {
            Some(at) => {
                self.at = at;
                true
            }
            None => false,
        }
    }

    /// Pre-decrement. Returns `false`, staying put, at the first element.
    pub fn move_prev(&mut self) -> bool {
        match self.native.prev(self.at) {
            Some(at) => {
                self.at = at;
                true
            }
            None => false,
        }
    }

    /// Post-increment: advance, returning the cursor as it was.
    pub fn post_next(&mut self) -> Self {
        let before = *self;
        self.move_next();
        before
    }

    /// Post-decrement: step back, returning the cursor as it was.
    pub fn post_prev(&mut self) -> Self {
        let before = *self;
        self.move_prev();
        before
    }

    /// Dereference as `(key, value)`. `None` at the end.
    pub fn get(&self) -> Option<(K::Out<'a>, V::Out<'a>)> {
        self.project::<Items>()
    }

    pub fn key(&self) -> Option<K::Out<'a>> {
        self.project::<Keys>()
    }

    pub fn value(&self) -> Option<V::Out<'a>> {
        self.project::<Values>()
    }

    /// Dereference through projection `P`, observing only the slots `P`
    /// extracts.
    pub fn project<P: Projection<R, K, V>>(&self) -> Option<P::Item<'a>> {
        let (key, value) = self.native.get(self.at)?;
        // Handing handles out happens on the caller's side of the lock.
        let guard = LockGuard::<R>::new(Lock::AlreadyHeld);
        Some(P::project(key, value, &guard.held()))
    }
}

impl<'a, R, K, V, C> Clone for Cursor<'a, R, K, V, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R, K, V, C> Copy for Cursor<'a, R, K, V, C> {}

impl<'a, R, K, V, C> PartialEq for Cursor<'a, R, K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.native, other.native) && self.at == other.at
    }
}

impl<'a, R, K, V, C> Eq for Cursor<'a, R, K, V, C> {}

impl<'a, R, K, V, C> fmt::Debug for Cursor<'a, R, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("owner", &self.owner)
            .field("at", &self.at)
            .finish()
    }
}
