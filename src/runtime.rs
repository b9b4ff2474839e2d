//! The host runtime seam: primitives the containers consume, the
//! non-owning `Handle` token and the owning `Owned` reference.

use crate::lock::{Held, Lock, LockGuard};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Primitives supplied by the host that reference-counts opaque objects.
///
/// Every method is an associated function: the host is process-wide, the
/// same way a language runtime's C API is.
pub trait Runtime: 'static {
    /// Pointer-sized opaque object token.
    type Object: Copy + Eq + fmt::Debug;

    /// Whatever the host needs to undo one lock acquisition.
    type LockState;

    /// Acquire the process-wide lock. Must be reentrant.
    fn acquire_lock() -> Self::LockState;

    /// Undo one `acquire_lock`.
    fn release_lock(state: Self::LockState);

    /// Add one reference to `obj`.
    fn inc_ref(obj: Self::Object, held: &Held<'_, Self>);

    /// Drop one reference to `obj`; the host may free it.
    fn dec_ref(obj: Self::Object, held: &Held<'_, Self>);

    /// Strict "less than" used to order handle keys. Must be a strict weak
    /// order consistent with the host's equality.
    fn less(a: Self::Object, b: Self::Object) -> bool;

    /// The canonical "nothing" object stored by get-or-insert-default.
    fn default_object() -> Self::Object;
}

/// Non-owning handle to a host object.
///
/// Passing a `Handle` into a container lends it: the container acquires
/// its own reference and the caller keeps whatever it already owned.
#[repr(transparent)]
pub struct Handle<R: Runtime> {
    obj: R::Object,
    _rt: PhantomData<fn() -> R>,
}

impl<R: Runtime> Handle<R> {
    #[inline]
    pub fn from_raw(obj: R::Object) -> Self {
        Self {
            obj,
            _rt: PhantomData,
        }
    }

    #[inline]
    pub fn raw(self) -> R::Object {
        self.obj
    }

    /// The host's default object.
    pub fn default_object() -> Self {
        Self::from_raw(R::default_object())
    }
}

impl<R: Runtime> Clone for Handle<R> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime> Copy for Handle<R> {}

impl<R: Runtime> PartialEq for Handle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.obj == other.obj
    }
}

impl<R: Runtime> Eq for Handle<R> {}

impl<R: Runtime> Hash for Handle<R>
where
    R::Object: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.obj.hash(state);
    }
}

impl<R: Runtime> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?})", self.obj)
    }
}

/// One owned reference to a host object. Dropping it releases the
/// reference under the host lock.
pub struct Owned<R: Runtime> {
    handle: Handle<R>,
}

impl<R: Runtime> Owned<R> {
    /// Acquire a new reference to `handle`.
    pub fn acquire(handle: Handle<R>, held: &Held<'_, R>) -> Self {
        R::inc_ref(handle.raw(), held);
        Self { handle }
    }

    /// Take ownership of a reference the caller already owns.
    ///
    /// The caller gives up its reference; it will be released when the
    /// returned `Owned` is dropped.
    pub fn from_owned_handle(handle: Handle<R>) -> Self {
        Self { handle }
    }

    #[inline]
    pub fn handle(&self) -> Handle<R> {
        self.handle
    }

    /// Hand the reference back to the host side without releasing it.
    pub fn into_handle(self) -> Handle<R> {
        let handle = self.handle;
        core::mem::forget(self);
        handle
    }
}

impl<R: Runtime> Clone for Owned<R> {
    fn clone(&self) -> Self {
        let guard = LockGuard::<R>::new(Lock::Acquire);
        Self::acquire(self.handle, &guard.held())
    }
}

impl<R: Runtime> Drop for Owned<R> {
    fn drop(&mut self) {
        let guard = LockGuard::<R>::new(Lock::Acquire);
        R::dec_ref(self.handle.raw(), &guard.held());
    }
}

impl<R: Runtime> PartialEq for Owned<R> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<R: Runtime> Eq for Owned<R> {}

impl<R: Runtime> PartialEq<Handle<R>> for Owned<R> {
    fn eq(&self, other: &Handle<R>) -> bool {
        self.handle == *other
    }
}

impl<R: Runtime> fmt::Debug for Owned<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned({:?})", self.handle.raw())
    }
}
