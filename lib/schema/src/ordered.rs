//! Insertion-ordered string-keyed map.
//!
//! Object properties render in the order they were declared, and that order
//! must survive renames and removals.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A map that keeps its entries in insertion order.
///
/// Equality is order-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMap<V> {
    entries: IndexMap<String, V>,
}

impl<V> OrderedMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the position of `key`, if present.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Inserts a value.
    ///
    /// An existing key keeps its position and has its value replaced; the
    /// previous value is returned. New keys are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Removes `key`, shifting later entries down so their order is kept.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Renames `old` to `new` without moving the entry.
    ///
    /// Returns false if `old` is absent or `new` is already taken.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        if self.entries.contains_key(&new) {
            return false;
        }
        let Some(index) = self.entries.get_index_of(old) else {
            return false;
        };
        let Some((_, value)) = self.entries.shift_remove_index(index) else {
            return false;
        };
        self.entries.shift_insert(index, new, value);
        true
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the values in order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Iterates over the values mutably, in order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for OrderedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = indexmap::map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> OrderedMap<u32> {
        [("a", 1), ("b", 2), ("c", 3)].into_iter().collect()
    }

    #[test]
    fn rename_keeps_position() {
        let mut map = abc();
        assert!(map.rename("b", "d"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "d", "c"]);
        assert_eq!(map.get("d"), Some(&2));
    }

    #[test]
    fn rename_refuses_taken_key() {
        let mut map = abc();
        assert!(!map.rename("a", "c"));
        assert_eq!(map, abc());
    }

    #[test]
    fn insert_existing_key_replaces_in_place() {
        let mut map = abc();
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.get("a"), Some(&10));
    }

    #[test]
    fn equality_depends_on_order() {
        let reordered: OrderedMap<u32> = [("b", 2), ("a", 1), ("c", 3)].into_iter().collect();
        assert_ne!(abc(), reordered);
    }

    #[test]
    fn rename_of_last_entry_stays_last() {
        let mut map = abc();
        assert!(map.rename("c", "z"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "z"]);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut map = abc();
        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn json_object_order_is_kept() {
        let map: OrderedMap<u32> =
            serde_json::from_str(r#"{"zeta":1,"alpha":2,"mid":3}"#).expect("deserialize");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, r#"{"zeta":1,"alpha":2,"mid":3}"#);
    }
}
