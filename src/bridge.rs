//! RefTree: the element reference bridge.
//!
//! Wraps a `NativeTree` and keeps one host reference per handle slot for
//! as long as the element is stored. Every code path that puts a slot into
//! storage acquires exactly once, after the tree has accepted the element,
//! so a comparator that panics mid-insert leaves no reference behind.
//! Every path that takes one out releases exactly once, after the tree has
//! been unlinked, so a release that runs host code never sees a
//! half-updated tree.
//!
//! Lock discipline:
//! - inserts and assignment hand handles in from the caller, who already
//!   holds the lock;
//! - erasure, `clear` and drop take the lock themselves;
//! - get-or-insert-default takes the lock unless its key is a handle.
//!
//! Containers whose slots are all plain never touch the lock.

use crate::cursor::{Cursor, OwnerId, Position, PositionError};
use crate::lock::{Lock, LockGuard};
use crate::native::{NativeTree, Pos};
use crate::order::Comparator;
use crate::runtime::Runtime;
use crate::slot::{Slot, SlotDefault};
use crate::view::{Projection, ViewRange};
use core::marker::PhantomData;
use log::{debug, trace};

pub(crate) struct RefTree<R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    native: NativeTree<K, V, C>,
    owner: OwnerId,
    _rt: PhantomData<fn() -> R>,
}

impl<R, K, V, C> RefTree<R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    const HOLDS_HANDLE: bool = K::KIND.is_handle() || V::KIND.is_handle();

    pub(crate) fn new() -> Self {
        Self {
            native: NativeTree::new(),
            owner: OwnerId::fresh(),
            _rt: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn native(&self) -> &NativeTree<K, V, C> {
        &self.native
    }

    #[inline]
    pub(crate) fn position(&self, at: Pos) -> Position {
        Position {
            owner: self.owner,
            at,
        }
    }

    /// Check that `position` belongs here and is still live.
    pub(crate) fn resolve(&self, position: Position) -> Result<Pos, PositionError> {
        if position.owner != self.owner {
            trace!("rejected position from container {:?}", position.owner);
            return Err(PositionError::WrongContainer);
        }
        if !self.native.is_valid(position.at) {
            trace!("rejected stale position {:?}", position.at);
            return Err(PositionError::Stale);
        }
        Ok(position.at)
    }

    #[inline]
    pub(crate) fn cursor_at(&self, at: Pos) -> Cursor<'_, R, K, V, C> {
        Cursor::new(&self.native, self.owner, at)
    }

    pub(crate) fn cursor(&self, position: Position) -> Result<Cursor<'_, R, K, V, C>, PositionError> {
        let at = self.resolve(position)?;
        Ok(self.cursor_at(at))
    }

    /// Every element, dereferenced through `P`.
    pub(crate) fn view<P: Projection<R, K, V>>(&self) -> ViewRange<'_, P, R, K, V, C> {
        ViewRange::new(self.cursor_at(self.native.begin()), self.cursor_at(Pos::END))
    }

    /// Lock guard for an operation in `mode`; a no-op for all-plain trees.
    #[inline]
    fn guard(mode: Lock) -> LockGuard<R> {
        LockGuard::new(if Self::HOLDS_HANDLE {
            mode
        } else {
            Lock::AlreadyHeld
        })
    }

    /// Insert unless an equivalent key is stored. References are taken only
    /// when the element was actually stored.
    pub(crate) fn insert_unique(&mut self, key: K, value: V) -> (Pos, bool) {
        let (at, inserted) = self.native.insert_unique(key, value);
        if inserted && Self::HOLDS_HANDLE {
            let guard = Self::guard(Lock::AlreadyHeld);
            let held = guard.held();
            let (k, v) = self
                .native
                .get(at)
                .expect("freshly inserted position must resolve");
            k.acquire(&held);
            v.acquire(&held);
        }
        (at, inserted)
    }

    /// Insert after every equivalent key. Always stores, so always acquires.
    pub(crate) fn insert_multi(&mut self, key: K, value: V) -> Pos {
        let at = self.native.insert_multi(key, value);
        if Self::HOLDS_HANDLE {
            let guard = Self::guard(Lock::AlreadyHeld);
            let held = guard.held();
            let (k, v) = self
                .native
                .get(at)
                .expect("freshly inserted position must resolve");
            k.acquire(&held);
            v.acquire(&held);
        }
        at
    }

    /// Store `value` under `key`, replacing any current value.
    ///
    /// When the key is present the incoming value is acquired before the
    /// old one is released, so assigning a value to the slot that already
    /// holds it never drops the count to zero in between. Nothing is
    /// acquired until the tree has placed the element.
    pub(crate) fn insert_or_assign(&mut self, key: K, value: V) -> (Pos, bool) {
        let mut incoming = Some(value);
        let (at, inserted) = self.native.try_emplace(key, || {
            incoming
                .take()
                .expect("value is consumed at most once")
        });
        let guard = Self::guard(Lock::AlreadyHeld);
        let held = guard.held();
        match incoming {
            None => {
                let (k, v) = self
                    .native
                    .get(at)
                    .expect("freshly inserted position must resolve");
                k.acquire(&held);
                v.acquire(&held);
            }
            Some(value) => {
                value.acquire(&held);
                let slot = self
                    .native
                    .value_mut(at)
                    .expect("found position must resolve");
                let old = core::mem::replace(slot, value);
                old.release(&held);
            }
        }
        (at, inserted)
    }

    /// Value under `key`, default-constructing the element when absent.
    ///
    /// Each call hands one reference to the caller; a call that creates the
    /// element additionally takes the container's own references.
    pub(crate) fn get_or_insert_default(&mut self, key: K) -> V::Out<'_>
    where
        V: SlotDefault<R>,
    {
        let (at, inserted) = self.native.try_emplace(key, V::slot_default);
        let guard = Self::guard(Lock::for_arguments(K::KIND.is_handle()));
        let held = guard.held();
        let (k, v) = self
            .native
            .get(at)
            .expect("emplaced position must resolve");
        if inserted {
            k.acquire(&held);
            v.acquire(&held);
        }
        v.observe(&held)
    }

    /// Erase the element equivalent to `key`, if any. Returns 0 or 1.
    pub(crate) fn erase_unique(&mut self, key: &K) -> usize {
        let at = self.native.find(key);
        match self.native.remove(at) {
            Some((k, v, _)) => Self::release_detached([(k, v)]),
            None => 0,
        }
    }

    /// Erase every element equivalent to `key` and return how many went.
    pub(crate) fn erase_multi(&mut self, key: &K) -> usize {
        let (first, last) = self.native.equal_range(key);
        let detached = self.native.drain_range(first, last);
        let erased = Self::release_detached(detached);
        if erased > 1 {
            trace!("erased {} elements under one key", erased);
        }
        erased
    }

    /// Erase the element at `position`; returns the position that
    /// followed it.
    pub(crate) fn remove(&mut self, position: Position) -> Result<Position, PositionError> {
        let at = self.resolve(position)?;
        let (k, v, next) = self.native.remove(at).ok_or(PositionError::End)?;
        Self::release_detached([(k, v)]);
        Ok(self.position(next))
    }

    pub(crate) fn clear(&mut self) {
        let released = self.release_stored();
        if released > 0 {
            debug!("cleared {} elements", released);
        }
        self.native.clear();
    }

    /// Release the references of elements already unlinked from storage.
    fn release_detached<I>(detached: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        if !Self::HOLDS_HANDLE {
            return detached.into_iter().count();
        }
        let guard = Self::guard(Lock::Acquire);
        let held = guard.held();
        let mut released = 0;
        for (k, v) in detached {
            k.release(&held);
            v.release(&held);
            released += 1;
        }
        released
    }

    /// Release the references of every stored element, leaving storage in
    /// place. The caller clears or drops storage next.
    fn release_stored(&mut self) -> usize {
        if !Self::HOLDS_HANDLE || self.native.is_empty() {
            return 0;
        }
        let guard = Self::guard(Lock::Acquire);
        let held = guard.held();
        let mut released = 0;
        for (_, k, v) in self.native.iter() {
            k.release(&held);
            v.release(&held);
            released += 1;
        }
        released
    }
}

impl<R, K, V, C> Drop for RefTree<R, K, V, C>
where
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    fn drop(&mut self) {
        let released = self.release_stored();
        if released > 0 {
            debug!("dropped container holding {} elements", released);
        }
    }
}

/// Operations every container facade shares. Expands inside an `impl`
/// block whose `Self` has a `tree: RefTree<R, K, $value, C>` field.
macro_rules! facade_common {
    ($value:ty) => {
        pub fn new() -> Self {
            Self {
                tree: $crate::bridge::RefTree::new(),
            }
        }

        pub fn len(&self) -> usize {
            self.tree.native().len()
        }

        pub fn is_empty(&self) -> bool {
            self.tree.native().is_empty()
        }

        pub fn contains(&self, key: &K) -> bool {
            self.tree.native().contains(key)
        }

        /// Position of the first element equivalent to `key`, or `end()`.
        pub fn find(&self, key: &K) -> $crate::Position {
            self.tree.position(self.tree.native().find(key))
        }

        /// First position whose key is not less than `key`.
        pub fn lower_bound(&self, key: &K) -> $crate::Position {
            self.tree.position(self.tree.native().lower_bound(key))
        }

        /// First position whose key is greater than `key`.
        pub fn upper_bound(&self, key: &K) -> $crate::Position {
            self.tree.position(self.tree.native().upper_bound(key))
        }

        pub fn begin(&self) -> $crate::Position {
            self.tree.position(self.tree.native().begin())
        }

        pub fn end(&self) -> $crate::Position {
            self.tree.position(self.tree.native().end())
        }

        /// Erase the element at `position` and return the position after it.
        pub fn remove(
            &mut self,
            position: $crate::Position,
        ) -> Result<$crate::Position, $crate::PositionError> {
            self.tree.remove(position)
        }

        /// Erase every element, releasing the references they held.
        pub fn clear(&mut self) {
            self.tree.clear()
        }

        pub fn keys(&self) -> $crate::ViewRange<'_, $crate::Keys, R, K, $value, C> {
            self.tree.view()
        }
    };
}

pub(crate) use facade_common;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::CountingRuntime;
    use crate::order::{HostOrder, NaturalOrder};
    use crate::runtime::Handle;
    use core::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    type Rt = CountingRuntime;
    type H = Handle<Rt>;
    type HandleKeys = RefTree<Rt, H, (), HostOrder<Rt>>;
    type HandleValues = RefTree<Rt, i64, H, NaturalOrder>;

    fn refs(h: H) -> usize {
        CountingRuntime::ref_count(h)
    }

    #[test]
    fn unique_insert_acquires_only_when_stored() {
        let a = CountingRuntime::object(1);
        let twin = CountingRuntime::object(1);
        CountingRuntime::with_lock(|| {
            let mut t = HandleKeys::new();
            assert!(t.insert_unique(a.handle(), ()).1);
            assert_eq!(refs(a.handle()), 2);
            assert!(!t.insert_unique(twin.handle(), ()).1);
            assert_eq!(refs(twin.handle()), 1);
            drop(t);
        });
        assert_eq!(refs(a.handle()), 1);
    }

    #[test]
    fn multi_insert_acquires_every_copy() {
        let a = CountingRuntime::object(4);
        CountingRuntime::with_lock(|| {
            let mut t = HandleKeys::new();
            for _ in 0..3 {
                t.insert_multi(a.handle(), ());
            }
            assert_eq!(refs(a.handle()), 4);
            assert_eq!(t.erase_multi(&a.handle()), 3);
            assert_eq!(refs(a.handle()), 1);
        });
    }

    #[test]
    fn assign_same_value_keeps_it_alive() {
        // The caller's reference, no longer tracked by `Owned`.
        let h = CountingRuntime::object(7).into_handle();
        assert_eq!(refs(h), 1);
        CountingRuntime::with_lock(|| {
            let mut t = HandleValues::new();
            t.insert_or_assign(1, h);
            assert_eq!(refs(h), 2);
            t.insert_or_assign(1, h);
            assert_eq!(refs(h), 2);
            assert_eq!(CountingRuntime::value(h), 7);
            t.clear();
            assert_eq!(refs(h), 1);
        });
    }

    thread_local! {
        static FAIL_COMPARE: Cell<bool> = Cell::new(false);
    }

    // Host ordering that can be made to fail, as a host comparison that
    // raises would.
    struct Failing;

    impl Comparator<H> for Failing {
        fn less(a: &H, b: &H) -> bool {
            if FAIL_COMPARE.with(Cell::get) {
                panic!("host comparison failed");
            }
            <HostOrder<Rt> as Comparator<H>>::less(a, b)
        }
    }

    #[test]
    fn failed_comparison_takes_no_reference() {
        let a = CountingRuntime::object(1);
        let b = CountingRuntime::object(2);
        let v = CountingRuntime::object(10);
        CountingRuntime::with_lock(|| {
            let mut t = RefTree::<Rt, H, H, Failing>::new();
            t.insert_unique(a.handle(), v.handle());
            assert_eq!(refs(v.handle()), 2);

            FAIL_COMPARE.with(|f| f.set(true));
            let multi = catch_unwind(AssertUnwindSafe(|| {
                t.insert_multi(b.handle(), v.handle());
            }));
            let assign = catch_unwind(AssertUnwindSafe(|| {
                t.insert_or_assign(b.handle(), v.handle());
            }));
            FAIL_COMPARE.with(|f| f.set(false));

            assert!(multi.is_err() && assign.is_err());
            assert_eq!(refs(b.handle()), 1);
            assert_eq!(refs(v.handle()), 2);
            assert_eq!(t.native().len(), 1);
            assert_eq!(t.native().iter().count(), 1);

            // The tree is still usable afterwards.
            t.insert_multi(b.handle(), v.handle());
            assert_eq!((refs(b.handle()), refs(v.handle())), (2, 3));
        });
        assert_eq!(refs(a.handle()), 1);
        assert_eq!(refs(b.handle()), 1);
        assert_eq!(refs(v.handle()), 1);
    }

    #[test]
    fn remove_checks_owner_and_liveness() {
        CountingRuntime::with_lock(|| {
            let mut t = RefTree::<Rt, i64, i64, NaturalOrder>::new();
            let other = RefTree::<Rt, i64, i64, NaturalOrder>::new();
            let (at, _) = t.insert_unique(1, 10);
            let p = t.position(at);
            assert_eq!(
                other.resolve(p),
                Err(PositionError::WrongContainer)
            );
            assert_eq!(t.remove(t.position(Pos::END)), Err(PositionError::End));
            assert!(t.remove(p).expect("live position").is_end());
            assert_eq!(t.remove(p), Err(PositionError::Stale));
        });
    }

    #[test]
    fn plain_trees_never_lock() {
        let mut t = RefTree::<Rt, i64, String, NaturalOrder>::new();
        t.insert_unique(1, "a".into());
        t.insert_or_assign(1, "b".into());
        assert_eq!(t.get_or_insert_default(2), "");
        assert_eq!(t.erase_unique(&1), 1);
        t.clear();
        assert_eq!(CountingRuntime::lock_depth(), 0);
    }
}
