//! Projected views over a container: keys, values or `(key, value)` items.
//!
//! A projection decides which slots a dereference observes. Only those are
//! converted for the caller, so iterating `keys()` of a map never touches
//! the reference counts of its values.

use crate::cursor::{Cursor, Position};
use crate::lock::Held;
use crate::order::Comparator;
use crate::runtime::Runtime;
use crate::slot::Slot;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

/// Extracts what a dereference hands out from a stored `(key, value)`.
pub trait Projection<R: Runtime, K: Slot<R>, V: Slot<R>> {
    type Item<'a>
    where
        K: 'a,
        V: 'a;

    fn project<'a>(key: &'a K, value: &'a V, held: &Held<'_, R>) -> Self::Item<'a>;
}

/// Projects the key.
#[derive(Debug)]
pub enum Keys {}

/// Projects the value.
#[derive(Debug)]
pub enum Values {}

/// Projects `(key, value)`.
#[derive(Debug)]
pub enum Items {}

impl<R: Runtime, K: Slot<R>, V: Slot<R>> Projection<R, K, V> for Keys {
    type Item<'a> = K::Out<'a> where K: 'a, V: 'a;

    #[inline]
    fn project<'a>(key: &'a K, _value: &'a V, held: &Held<'_, R>) -> K::Out<'a> {
        key.observe(held)
    }
}

impl<R: Runtime, K: Slot<R>, V: Slot<R>> Projection<R, K, V> for Values {
    type Item<'a> = V::Out<'a> where K: 'a, V: 'a;

    #[inline]
    fn project<'a>(_key: &'a K, value: &'a V, held: &Held<'_, R>) -> V::Out<'a> {
        value.observe(held)
    }
}

impl<R: Runtime, K: Slot<R>, V: Slot<R>> Projection<R, K, V> for Items {
    type Item<'a> = (K::Out<'a>, V::Out<'a>) where K: 'a, V: 'a;

    #[inline]
    fn project<'a>(
        key: &'a K,
        value: &'a V,
        held: &Held<'_, R>,
    ) -> (K::Out<'a>, V::Out<'a>) {
        (key.observe(held), value.observe(held))
    }
}

/// A cursor that dereferences through projection `P`.
pub struct View<'a, P, R, K, V, C> {
    cursor: Cursor<'a, R, K, V, C>,
    _proj: PhantomData<fn() -> P>,
}

impl<'a, P, R, K, V, C> View<'a, P, R, K, V, C>
where
    P: Projection<R, K, V>,
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    pub(crate) fn new(cursor: Cursor<'a, R, K, V, C>) -> Self {
        Self {
            cursor,
            _proj: PhantomData,
        }
    }

    /// `None` at the end.
    pub fn get(&self) -> Option<P::Item<'a>> {
        self.cursor.project::<P>()
    }

    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    pub fn is_end(&self) -> bool {
        self.cursor.is_end()
    }

    pub fn move_next(&mut self) -> bool {
        self.cursor.move_next()
    }

    pub fn move_prev(&mut self) -> bool {
        self.cursor.move_prev()
    }

    pub fn post_next(&mut self) -> Self {
        Self::new(self.cursor.post_next())
    }

    pub fn post_prev(&mut self) -> Self {
        Self::new(self.cursor.post_prev())
    }

    /// The same position, dereferencing whole elements.
    pub fn cursor(&self) -> Cursor<'a, R, K, V, C> {
        self.cursor
    }
}

impl<'a, P, R, K, V, C> Clone for View<'a, P, R, K, V, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P, R, K, V, C> Copy for View<'a, P, R, K, V, C> {}

impl<'a, P, R, K, V, C> PartialEq for View<'a, P, R, K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
    }
}

impl<'a, P, R, K, V, C> Eq for View<'a, P, R, K, V, C> {}

impl<'a, P, R, K, V, C> fmt::Debug for View<'a, P, R, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("View").field(&self.cursor).finish()
    }
}

/// A `[begin, end)` pair of views.
pub struct ViewRange<'a, P, R, K, V, C> {
    begin: View<'a, P, R, K, V, C>,
    end: View<'a, P, R, K, V, C>,
}

impl<'a, P, R, K, V, C> ViewRange<'a, P, R, K, V, C>
where
    P: Projection<R, K, V>,
    R: Runtime,
    K: Slot<R>,
    V: Slot<R>,
    C: Comparator<K>,
{
    pub(crate) fn new(begin: Cursor<'a, R, K, V, C>, end: Cursor<'a, R, K, V, C>) -> Self {
        Self {
            begin: View::new(begin),
            end: View::new(end),
        }
    }

    pub fn begin(&self) -> View<'a, P, R, K, V, C> {
        self.begin
    }

    pub fn end(&self) -> View<'a, P, R, K, V, C> {
        self.end
    }

    pub fn iter(&self) -> ViewIter<'a, P, R, K, V, C> {
        ViewIter {
            at: self.begin.cursor,
            end: self.end.cursor,
            _proj: PhantomData,
        }
    }
}

impl<'a, P, R, K, V, C> Clone for ViewRange<'a, P, R, K, V, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P, R, K, V, C> Copy for ViewRange<'a, P, R, K, V, C> {}

impl<'a, P, R, K, V, C> PartialEq for ViewRange<'a, P, R, K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.begin == other.begin && self.end == other.end
    }
}

impl<'a, P, R, K, V, C> Eq for ViewRange<'a, P, R, K, V, C> {}

impl<'a, P, R, K, V, C> fmt::Debug for ViewRange<'a, P, R, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRange")
            .field("begin", &self.begin)
            .field("end", &self.end)
            .finish()
    }
}

impl<'a, P, R, K, V, C> IntoIterator for ViewRange<'a, P, R, K, V, C>
where
    P: Projection<R, K, V>,
    R: Runtime,
    K: Slot<R> + 'a,
    V: Slot<R> + 'a,
    C: Comparator<K>,
{
    type Item = P::Item<'a>;
    type IntoIter = ViewIter<'a, P, R, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a `ViewRange`. Each item is observed as it is yielded.
pub struct ViewIter<'a, P, R, K, V, C> {
    at: Cursor<'a, R, K, V, C>,
    end: Cursor<'a, R, K, V, C>,
    _proj: PhantomData<fn() -> P>,
}

impl<'a, P, R, K, V, C> Iterator for ViewIter<'a, P, R, K, V, C>
where
    P: Projection<R, K, V>,
    R: Runtime,
    K: Slot<R> + 'a,
    V: Slot<R> + 'a,
    C: Comparator<K>,
{
    type Item = P::Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at == self.end {
            return None;
        }
        let item = self.at.project::<P>()?;
        self.at.move_next();
        Some(item)
    }
}

impl<'a, P, R, K, V, C> FusedIterator for ViewIter<'a, P, R, K, V, C>
where
    P: Projection<R, K, V>,
    R: Runtime,
    K: Slot<R> + 'a,
    V: Slot<R> + 'a,
    C: Comparator<K>,
{
}

impl<'a, P, R, K, V, C> Clone for ViewIter<'a, P, R, K, V, C> {
    fn clone(&self) -> Self {
        Self {
            at: self.at,
            end: self.end,
            _proj: PhantomData,
        }
    }
}

impl<'a, P, R, K, V, C> fmt::Debug for ViewIter<'a, P, R, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewIter")
            .field("at", &self.at)
            .field("end", &self.end)
            .finish()
    }
}
