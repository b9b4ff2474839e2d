//! Compile-time classification of key and value slots.
//!
//! A slot is `Plain` (ordinary data, no reference counting) or `Handle`
//! (an opaque host object whose references the container must own). The
//! classification belongs to the type, so every branch on `KIND` folds
//! away per container instantiation.

use crate::lock::Held;
use crate::order::{DefaultOrder, HostOrder, NaturalOrder};
use crate::runtime::{Handle, Owned, Runtime};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotKind {
    Plain,
    Handle,
}

impl SlotKind {
    #[inline]
    pub const fn is_handle(self) -> bool {
        matches!(self, SlotKind::Handle)
    }
}

/// A type that can sit in a key or value slot of a container bound to
/// runtime `R`.
pub trait Slot<R: Runtime>: Clone {
    const KIND: SlotKind;

    /// What observing a stored slot hands out: a borrow for plain data, a
    /// fresh owned reference for handles.
    type Out<'a>
    where
        Self: 'a;

    /// Take the container's reference when the slot enters storage.
    fn acquire(&self, held: &Held<'_, R>);

    /// Give the container's reference back when the slot leaves storage.
    fn release(&self, held: &Held<'_, R>);

    fn observe<'a>(&'a self, held: &Held<'_, R>) -> Self::Out<'a>;
}

/// Value used when get-or-insert-default creates an entry.
pub trait SlotDefault<R: Runtime>: Slot<R> {
    fn slot_default() -> Self;
}

impl<R: Runtime> Slot<R> for Handle<R> {
    const KIND: SlotKind = SlotKind::Handle;

    type Out<'a> = Owned<R>;

    #[inline]
    fn acquire(&self, held: &Held<'_, R>) {
        R::inc_ref(self.raw(), held);
    }

    #[inline]
    fn release(&self, held: &Held<'_, R>) {
        R::dec_ref(self.raw(), held);
    }

    #[inline]
    fn observe<'a>(&'a self, held: &Held<'_, R>) -> Owned<R> {
        Owned::acquire(*self, held)
    }
}

impl<R: Runtime> SlotDefault<R> for Handle<R> {
    fn slot_default() -> Self {
        Handle::default_object()
    }
}

impl<R: Runtime> DefaultOrder for Handle<R> {
    type Order = HostOrder<R>;
}

/// Marker for ordinary data: never reference-counted by the host.
///
/// Implemented by the slot macros below. `Handle` never implements it, so
/// a tuple of `PlainData` cannot carry a handle in.
pub trait PlainData: Clone {}

/// Classify types as plain value slots, with `Default` as the value
/// get-or-insert-default stores. No key ordering is implied, which admits
/// types such as `f64` that are not `Ord`.
///
/// ```
/// #[derive(Clone, Default, PartialEq)]
/// struct Reading(f64);
/// handle_btree::value_slot!(Reading);
/// ```
#[macro_export]
macro_rules! value_slot {
    ($($t:ty),* $(,)?) => {
        $(
            $crate::plain_slot!(@slot $t);

            impl<R: $crate::Runtime> $crate::SlotDefault<R> for $t {
                fn slot_default() -> Self {
                    <$t as ::core::default::Default>::default()
                }
            }
        )*
    };
}

/// Classify types as plain slots ordered by `Ord`.
///
/// ```
/// #[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
/// struct Version(u32, u32);
/// handle_btree::plain_slot!(Version);
/// ```
#[macro_export]
macro_rules! plain_slot {
    (@slot $t:ty) => {
        impl $crate::PlainData for $t {}

        impl<R: $crate::Runtime> $crate::Slot<R> for $t {
            const KIND: $crate::SlotKind = $crate::SlotKind::Plain;

            type Out<'a> = &'a $t;

            #[inline]
            fn acquire(&self, _held: &$crate::Held<'_, R>) {}

            #[inline]
            fn release(&self, _held: &$crate::Held<'_, R>) {}

            #[inline]
            fn observe<'a>(&'a self, _held: &$crate::Held<'_, R>) -> &'a $t {
                self
            }
        }
    };
    ($($t:ty),* $(,)?) => {
        $(
            $crate::plain_slot!(@slot $t);

            impl $crate::DefaultOrder for $t {
                type Order = $crate::NaturalOrder;
            }
        )*
    };
}

/// Like `plain_slot!`, and also lets `get_item` default-construct the type.
#[macro_export]
macro_rules! plain_default_slot {
    ($($t:ty),* $(,)?) => {
        $crate::plain_slot!($($t),*);
        $(
            impl<R: $crate::Runtime> $crate::SlotDefault<R> for $t {
                fn slot_default() -> Self {
                    <$t as ::core::default::Default>::default()
                }
            }
        )*
    };
}

plain_default_slot!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
);

// Floats have no total order; they fill value slots, or key slots under
// an explicit comparator.
value_slot!(f32, f64);

// Tuples of plain data. Ordered as keys only when every member is `Ord`.
macro_rules! plain_tuple {
    ($($name:ident),+) => {
        impl<$($name: PlainData),+> PlainData for ($($name,)+) {}

        impl<R: Runtime, $($name),+> Slot<R> for ($($name,)+)
        where
            $($name: PlainData,)+
        {
            const KIND: SlotKind = SlotKind::Plain;

            type Out<'a> = &'a Self where Self: 'a;

            #[inline]
            fn acquire(&self, _held: &Held<'_, R>) {}

            #[inline]
            fn release(&self, _held: &Held<'_, R>) {}

            #[inline]
            fn observe<'a>(&'a self, _held: &Held<'_, R>) -> &'a Self {
                self
            }
        }

        impl<R: Runtime, $($name),+> SlotDefault<R> for ($($name,)+)
        where
            $($name: PlainData + Default,)+
        {
            fn slot_default() -> Self {
                Default::default()
            }
        }

        impl<$($name: Ord),+> DefaultOrder for ($($name,)+) {
            type Order = NaturalOrder;
        }
    };
}

plain_tuple!(A, B);
plain_tuple!(A, B, C);
plain_tuple!(A, B, C, D);
