//! Scoped host-lock guard and the capability that proves the lock is held.
//!
//! `Held` is a zero-sized proof tied to a live `LockGuard` by lifetime.
//! Reference-count primitives on `Runtime` take `&Held`, so every acquire
//! and release site in this crate names how the lock got held.

use crate::runtime::Runtime;
use core::marker::PhantomData;

/// How a guard obtains the host lock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lock {
    /// Take the lock now; release it when the guard drops.
    Acquire,
    /// The calling context already holds the lock; the guard is a no-op.
    AlreadyHeld,
}

impl Lock {
    /// Mode for an operation whose arguments may carry handles. A binding
    /// layer that hands handles across holds the lock while doing so.
    #[inline]
    pub const fn for_arguments(carry_handles: bool) -> Self {
        if carry_handles {
            Lock::AlreadyHeld
        } else {
            Lock::Acquire
        }
    }
}

/// Zero-sized proof that the host lock is held for `'a`.
pub struct Held<'a, R: ?Sized> {
    _lt: PhantomData<&'a ()>,
    _rt: PhantomData<fn() -> *const R>,
}

impl<'a, R: ?Sized> Held<'a, R> {
    #[inline]
    fn new() -> Self {
        Self {
            _lt: PhantomData,
            _rt: PhantomData,
        }
    }
}

/// RAII guard over the host's process-wide lock.
pub struct LockGuard<R: Runtime> {
    state: Option<R::LockState>,
    // Lock ownership belongs to the thread that took it.
    _nosend: PhantomData<*mut ()>,
}

impl<R: Runtime> LockGuard<R> {
    pub fn new(mode: Lock) -> Self {
        let state = match mode {
            Lock::Acquire => Some(R::acquire_lock()),
            Lock::AlreadyHeld => None,
        };
        Self {
            state,
            _nosend: PhantomData,
        }
    }

    /// Shorthand for `LockGuard::new(Lock::Acquire)`.
    pub fn acquire() -> Self {
        Self::new(Lock::Acquire)
    }

    /// True when this guard took the lock itself.
    pub fn is_acquiring(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn held(&self) -> Held<'_, R> {
        Held::new()
    }
}

impl<R: Runtime> Drop for LockGuard<R> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            R::release_lock(state);
        }
    }
}
