//! handle-btree: ordered set, multiset, map and multimap whose key and
//! value slots may hold handles to reference-counted host objects.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: store opaque host objects (a language runtime's objects, say)
//!   in ordered containers without leaking or double-releasing a single
//!   reference, while plain Rust data in the same containers pays nothing.
//! - Layers:
//!   - NativeTree<K, V, C>: structural ordered tree with stable,
//!     generational positions; knows nothing about host references;
//!     includes a debug-only reentrancy guard around every operation.
//!   - RefTree<R, K, V, C>: wraps NativeTree and owns one host reference
//!     per stored handle slot; every insert, assignment, erase, clear and
//!     drop path balances its acquires against its releases.
//!   - BTreeSet / BTreeMultiset / BTreeMap / BTreeMultimap: public
//!     facades exposing detached `Position`s, borrowing `Cursor`s and
//!     projected `View`s.
//!
//! Constraints
//! - The host is abstracted by `Runtime`: a reentrant process-wide lock,
//!   reference increment/decrement, a strict "less than" over objects and
//!   a canonical default object.
//! - Reference-count primitives take a `Held` capability, which only a
//!   live `LockGuard` can produce.
//! - Slot kinds (`SlotKind::Plain` or `SlotKind::Handle`) are decided at
//!   compile time; containers whose slots are all plain never take the
//!   lock.
//! - Containers are not `Sync`.
//!
//! Lock policy
//! - Operations that receive or hand out handles (inserts, assignment,
//!   dereferences, `get_item` with a handle key) expect the caller to
//!   hold the host lock already, the way a binding layer does.
//! - Erasure, `remove`, `clear`, drop and `get_item` with a plain key take
//!   the lock themselves.
//!
//! Reentrancy policy
//! - NativeTree runs host code only through the comparator. A comparator
//!   that calls back into the same container panics in debug builds.
//! - References are released only after NativeTree has unlinked the
//!   elements, so a release that runs host finalizers sees a consistent
//!   container.
//!
//! Positions
//! - `Position` is detached and `Copy`. It names its container and a
//!   generational slot; using it on another container, or after its
//!   element was erased, yields a `PositionError`.
//! - `Cursor` and `View` borrow their container, so no mutation can
//!   happen while one is alive.
//!
//! Notes and non-goals
//! - No thread-safety beyond what the host lock provides.
//! - Ordering of handle keys is exactly the host's ordering; keys must not
//!   be mutated in ways that change their order while stored.
//! - `CountingRuntime` is an in-process host for tests, benches and
//!   examples.

mod bridge;
pub mod counting;
mod cursor;
mod lock;
mod map;
#[cfg(feature = "bench_internal")]
pub mod native;
#[cfg(not(feature = "bench_internal"))]
mod native;
#[cfg(test)]
mod native_proptest;
mod order;
mod reentrancy;
mod runtime;
mod set;
mod slot;
mod view;

// Public surface
pub use counting::CountingRuntime;
pub use cursor::{Cursor, Position, PositionError};
pub use lock::{Held, Lock, LockGuard};
pub use map::{BTreeMap, BTreeMultimap};
pub use order::{Comparator, DefaultOrder, HostOrder, NaturalOrder};
pub use runtime::{Handle, Owned, Runtime};
pub use set::{BTreeMultiset, BTreeSet, SetView};
pub use slot::{PlainData, Slot, SlotDefault, SlotKind};
pub use view::{Items, Keys, Projection, Values, View, ViewIter, ViewRange};
