//! Prefix index: maps every prefix of an indexed text to the set of row
//! ids carrying that prefix, for `startsWith` lookups.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
pub struct PrefixIndex {
    prefixes: BTreeMap<String, BTreeSet<u32>>,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn prefix_ends(value: &str) -> Vec<usize> {
        if value.is_empty() {
            return Vec::new();
        }
        let mut ends: Vec<usize> = value.char_indices().map(|(i, _)| i).skip(1).collect();
        ends.push(value.len());
        ends
    }

    /// Insert every prefix `v[0..1], v[0..2], ..., v[0..n]` of `value`
    /// associated with `id`.
    pub fn put(&mut self, value: &str, id: u32) {
        for end in Self::prefix_ends(value) {
            self.prefixes.entry(value[..end].to_string()).or_default().insert(id);
        }
    }

    /// Remove `id` from every prefix of `value`, dropping a prefix entry
    /// once its id set is empty.
    pub fn delete(&mut self, value: &str, id: u32) {
        for end in Self::prefix_ends(value) {
            let key = &value[..end];
            if let Some(set) = self.prefixes.get_mut(key) {
                set.remove(&id);
                if set.is_empty() {
                    self.prefixes.remove(key);
                }
            }
        }
    }

    /// All ids whose indexed value starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> Option<&BTreeSet<u32>> {
        self.prefixes.get(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_every_prefix() {
        let mut idx = PrefixIndex::new();
        idx.put("alice", 1);
        assert_eq!(idx.starts_with("a"), Some(&BTreeSet::from([1])));
        assert_eq!(idx.starts_with("al"), Some(&BTreeSet::from([1])));
        assert_eq!(idx.starts_with("alice"), Some(&BTreeSet::from([1])));
        assert_eq!(idx.starts_with("alicex"), None);
    }

    #[test]
    fn shared_prefix_across_rows() {
        let mut idx = PrefixIndex::new();
        idx.put("alice", 1);
        idx.put("alicia", 2);
        assert_eq!(idx.starts_with("ali"), Some(&BTreeSet::from([1, 2])));
        assert_eq!(idx.starts_with("alice"), Some(&BTreeSet::from([1])));
    }

    #[test]
    fn delete_drops_empty_prefix_entries() {
        let mut idx = PrefixIndex::new();
        idx.put("bob", 3);
        idx.delete("bob", 3);
        assert_eq!(idx.starts_with("b"), None);
        assert_eq!(idx.starts_with("bo"), None);
        assert_eq!(idx.starts_with("bob"), None);
    }

    #[test]
    fn empty_value_has_no_prefixes() {
        let mut idx = PrefixIndex::new();
        idx.put("", 1);
        assert_eq!(idx.starts_with(""), None);
    }
}
