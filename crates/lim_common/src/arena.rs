//! Append-only storage addressed by typed handles.
//!
//! Modules, connections and merge-tree nodes refer to each other (partners,
//! parents, children) by handle rather than by pointer. Entries are never
//! removed, so a handle handed out by [`Arena::alloc`] stays valid for as long
//! as the arena lives.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A handle type that can address an [`Arena`] slot.
pub trait ArenaId: Copy {
    /// Wraps a slot number.
    fn from_raw(index: u32) -> Self;

    /// The slot number.
    fn as_raw(self) -> u32;
}

/// Dense storage of `T` addressed by handles of type `I`.
pub struct Arena<I, T> {
    slots: Vec<T>,
    _id: PhantomData<fn() -> I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An arena with no entries.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `value` and returns its handle.
    pub fn alloc(&mut self, value: T) -> I {
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(value);
        I::from_raw(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` before the first [`alloc`](Self::alloc).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries with their handles, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        (0u32..)
            .zip(self.slots.iter())
            .map(|(raw, value)| (I::from_raw(raw), value))
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T: Clone> Clone for Arena<I, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            _id: PhantomData,
        }
    }
}

impl<I, T: fmt::Debug> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.slots[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.slots[id.as_raw() as usize]
    }
}
