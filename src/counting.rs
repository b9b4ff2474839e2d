//! An in-process host that counts references.
//!
//! `CountingRuntime` keeps a thread-local heap of integer-valued objects
//! with explicit reference counts and a reentrant lock depth. It fails
//! fast where a real host would crash: releasing a dead object, acquiring
//! one, or touching a count while the lock is not held.

use crate::lock::Held;
use crate::runtime::{Handle, Owned, Runtime};
use core::cell::RefCell;

/// Identifier of an object on the counting heap.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(u32);

/// Totals observed since the heap was created on this thread.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    pub acquires: u64,
    pub releases: u64,
    /// Lock acquisitions, nested ones included.
    pub locks: u64,
}

#[derive(Debug)]
struct Object {
    value: i64,
    refs: usize,
}

#[derive(Debug)]
struct Heap {
    objects: Vec<Object>,
    lock_depth: usize,
    stats: Stats,
}

impl Heap {
    fn new() -> Self {
        // Slot 0 is the default object. The runtime owns one reference
        // to it so it never dies.
        Self {
            objects: vec![Object {
                value: i64::MIN,
                refs: 1,
            }],
            lock_depth: 0,
            stats: Stats::default(),
        }
    }

    fn live(&mut self, id: ObjectId) -> &mut Object {
        let obj = self
            .objects
            .get_mut(id.0 as usize)
            .unwrap_or_else(|| panic!("unknown object {:?}", id));
        assert!(obj.refs > 0, "object {:?} used after its last release", id);
        obj
    }
}

thread_local! {
    static HEAP: RefCell<Heap> = RefCell::new(Heap::new());
}

/// Host runtime backed by the thread-local counting heap.
#[derive(Debug)]
pub enum CountingRuntime {}

impl CountingRuntime {
    /// Allocate an object holding `value`. The caller owns its only
    /// reference.
    pub fn object(value: i64) -> Owned<Self> {
        let id = HEAP.with(|h| {
            let mut h = h.borrow_mut();
            let id = ObjectId(h.objects.len() as u32);
            h.objects.push(Object { value, refs: 1 });
            id
        });
        Owned::from_owned_handle(Handle::from_raw(id))
    }

    /// The default object (`i64::MIN` payload).
    pub fn none() -> Handle<Self> {
        Handle::from_raw(ObjectId(0))
    }

    /// Current reference count; zero once the object has been freed.
    pub fn ref_count(handle: Handle<Self>) -> usize {
        HEAP.with(|h| {
            h.borrow()
                .objects
                .get(handle.raw().0 as usize)
                .map(|o| o.refs)
                .unwrap_or(0)
        })
    }

    pub fn value(handle: Handle<Self>) -> i64 {
        HEAP.with(|h| h.borrow_mut().live(handle.raw()).value)
    }

    pub fn is_alive(handle: Handle<Self>) -> bool {
        Self::ref_count(handle) > 0
    }

    pub fn lock_depth() -> usize {
        HEAP.with(|h| h.borrow().lock_depth)
    }

    pub fn stats() -> Stats {
        HEAP.with(|h| h.borrow().stats)
    }

    /// Run `f` with the lock held, the way a binding layer calls in.
    pub fn with_lock<T>(f: impl FnOnce() -> T) -> T {
        let guard = crate::lock::LockGuard::<Self>::acquire();
        let out = f();
        drop(guard);
        out
    }
}

impl Runtime for CountingRuntime {
    type Object = ObjectId;
    type LockState = ();

    fn acquire_lock() {
        HEAP.with(|h| {
            let mut h = h.borrow_mut();
            h.lock_depth += 1;
            h.stats.locks += 1;
        });
    }

    fn release_lock(_state: ()) {
        HEAP.with(|h| {
            let mut h = h.borrow_mut();
            assert!(h.lock_depth > 0, "lock released more often than acquired");
            h.lock_depth -= 1;
        });
    }

    fn inc_ref(obj: ObjectId, _held: &Held<'_, Self>) {
        HEAP.with(|h| {
            let mut h = h.borrow_mut();
            assert!(h.lock_depth > 0, "inc_ref on {:?} without the host lock", obj);
            h.live(obj).refs += 1;
            h.stats.acquires += 1;
        });
    }

    fn dec_ref(obj: ObjectId, _held: &Held<'_, Self>) {
        HEAP.with(|h| {
            let mut h = h.borrow_mut();
            assert!(h.lock_depth > 0, "dec_ref on {:?} without the host lock", obj);
            h.live(obj).refs -= 1;
            h.stats.releases += 1;
        });
    }

    fn less(a: ObjectId, b: ObjectId) -> bool {
        HEAP.with(|h| {
            let mut h = h.borrow_mut();
            let a = h.live(a).value;
            let b = h.live(b).value;
            a < b
        })
    }

    fn default_object() -> ObjectId {
        ObjectId(0)
    }
}
