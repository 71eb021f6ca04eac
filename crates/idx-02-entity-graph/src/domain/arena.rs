//! Slot arena with a key index, used for first-seen-wins dedup.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Entities stored in insertion order, addressable by slot or by key.
#[derive(Debug, Clone)]
pub struct Arena<K, T> {
    items: Vec<T>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the slot of `key`, inserting `make()` if it is unseen.
    ///
    /// The flag is `true` only for the call that created the entry.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> T) -> (usize, bool) {
        if let Some(&slot) = self.index.get(&key) {
            return (slot, false);
        }
        let slot = self.items.len();
        self.items.push(make());
        self.index.insert(key, slot);
        (slot, true)
    }

    pub fn slot<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.index.get(key).copied()
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.items.get_mut(slot)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K: Eq + Hash, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let mut arena: Arena<&str, u32> = Arena::new();

        let (a, first_a) = arena.get_or_insert_with("a", || 1);
        let (again, first_again) = arena.get_or_insert_with("a", || 2);
        let (b, first_b) = arena.get_or_insert_with("b", || 3);

        assert!(first_a && !first_again && first_b);
        assert_eq!(a, again);
        assert_eq!(arena.get(a), Some(&1));
        assert_eq!(arena.slot("b"), Some(b));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_items_mut_updates_in_place() {
        let mut arena: Arena<u8, u32> = Arena::default();
        arena.get_or_insert_with(1, || 10);
        arena.items_mut()[0] += 5;
        assert_eq!(arena.items(), &[15]);
    }
}
