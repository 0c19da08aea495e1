//! Generational arena.
//!
//! Values are addressed by an [`Id`] that pairs a slot index with the generation
//! of the slot at insertion time. Removing a value bumps the generation of its
//! slot, so any `Id` still held elsewhere stops resolving instead of silently
//! aliasing whatever value reuses the slot.

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A handle to a value stored in an [`Arena`].
pub struct Id<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn new(index: usize, generation: u32) -> Id<T> {
        Id {
            index: index as u32,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// Derived implementations would needlessly require the same traits of `T`.

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Id<T> {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Id<T>) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

enum Entry<T> {
    Occupied {
        generation: u32,
        value: T,
    },
    Vacant {
        generation: u32,
        next_vacant: Option<usize>,
    },
}

pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    first_vacant: Option<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Arena<T> {
        Arena {
            entries: Vec::new(),
            first_vacant: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: Id<T>) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        match self.entries.get_mut(id.index()) {
            Some(Entry::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn insert(&mut self, value: T) -> Id<T> {
        self.len += 1;
        match self.first_vacant {
            Some(index) => {
                let (generation, next_vacant) = match self.entries[index] {
                    Entry::Vacant {
                        generation,
                        next_vacant,
                    } => (generation, next_vacant),
                    Entry::Occupied { .. } => panic!("{index}: vacant slot expected"),
                };
                self.first_vacant = next_vacant;
                self.entries[index] = Entry::Occupied { generation, value };
                Id::new(index, generation)
            }
            None => {
                let index = self.entries.len();
                self.entries.push(Entry::Occupied {
                    generation: 0,
                    value,
                });
                Id::new(index, 0)
            }
        }
    }

    /// Removes and returns the value referenced by `id`, or `None` if `id` is stale.
    pub fn remove(&mut self, id: Id<T>) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let vacant = Entry::Vacant {
            generation: id.generation.wrapping_add(1),
            next_vacant: self.first_vacant,
        };
        match std::mem::replace(&mut self.entries[id.index()], vacant) {
            Entry::Occupied { value, .. } => {
                self.first_vacant = Some(id.index());
                self.len -= 1;
                Some(value)
            }
            Entry::Vacant { .. } => None,
        }
    }

    /// Returns the ids of all values, in slot order.
    pub fn ids(&self) -> Vec<Id<T>> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Entry::Occupied { generation, .. } => Some(Id::new(index, *generation)),
                Entry::Vacant { .. } => None,
            })
            .collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Arena<T> {
        Arena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn stale_id_does_not_resolve() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        assert_eq!(arena.remove(a), None);
        assert!(arena.is_empty());

        // Slot is reused, but the old id must not see the new value.
        let b = arena.insert(2);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn get_mut_updates() {
        let mut arena = Arena::new();
        let a = arena.insert(String::from("x"));
        arena.get_mut(a).unwrap().push('y');
        assert_eq!(arena.get(a).map(|s| s.as_str()), Some("xy"));
    }

    #[test]
    fn ids_skip_vacant_slots() {
        let mut arena = Arena::new();
        let a = arena.insert('a');
        let b = arena.insert('b');
        let c = arena.insert('c');
        arena.remove(b);
        assert_eq!(arena.ids(), vec![a, c]);
    }
}
