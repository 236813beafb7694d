use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// `(timestamp, nodeId)` tag used to break ties across both CRDT primitives.
/// Lexicographic ordering: later timestamp wins; a larger node id breaks an
/// exact timestamp tie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub timestamp: i64,
    pub node_id: String,
}

impl Tag {
    pub fn new(timestamp: i64, node_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            node_id: node_id.into(),
        }
    }
}

/// Last-writer-wins register. A later `(timestamp, nodeId)` always wins; a
/// tied timestamp is broken by the lexicographically larger node id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LwwRegister<T> {
    value: T,
    tag: Tag,
}

impl<T: Clone> LwwRegister<T> {
    /// Constructs a register with an initial value stamped at `ts=0`, so any
    /// subsequent `set` with a positive timestamp always wins (spec §4.5.2).
    pub fn new(initial: T, node_id: impl Into<String>) -> Self {
        Self {
            value: initial,
            tag: Tag::new(0, node_id),
        }
    }

    pub fn from_parts(value: T, timestamp: i64, node_id: impl Into<String>) -> Self {
        Self {
            value,
            tag: Tag::new(timestamp, node_id),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn timestamp(&self) -> i64 {
        self.tag.timestamp
    }

    pub fn node_id(&self) -> &str {
        &self.tag.node_id
    }

    /// Accepts the new value only if `(timestamp, node_id)` is strictly
    /// greater than the current tag.
    pub fn set(&mut self, value: T, node_id: impl Into<String>, timestamp: i64) {
        let candidate = Tag::new(timestamp, node_id);
        if candidate > self.tag {
            self.value = value;
            self.tag = candidate;
        }
    }

    /// Merges two registers, keeping whichever tag wins; commutative,
    /// associative and idempotent because it is a max over a total order.
    pub fn merge(&self, other: &Self) -> Self {
        if other.tag > self.tag {
            other.clone()
        } else {
            self.clone()
        }
    }
}

/// Observed-remove set. An element is present iff at least one of its
/// add-tags has not been shadowed by a matching remove-tag (spec §4.5.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrSet<T: Eq + Hash + Clone> {
    adds: Vec<(T, Tag)>,
    removes: Vec<(T, Tag)>,
}

impl<T: Eq + Hash + Clone> Default for OrSet<T> {
    fn default() -> Self {
        Self {
            adds: Vec::new(),
            removes: Vec::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> OrSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: T, node_id: impl Into<String>, timestamp: i64) {
        self.adds.push((value, Tag::new(timestamp, node_id)));
    }

    /// Copies every current add-tag of `value` into the remove-table. A
    /// concurrent add on another replica carries a fresh tag that this
    /// remove cannot have observed, so it survives the merge — the
    /// "resurrection" behavior documented in spec §4.5.5.
    pub fn remove(&mut self, value: &T, node_id: impl Into<String>, timestamp: i64) {
        let node_id = node_id.into();
        let tags: Vec<Tag> = self
            .adds
            .iter()
            .filter(|(v, _)| v == value)
            .map(|(_, tag)| tag.clone())
            .collect();
        if tags.is_empty() {
            // Removing a value with no observed add-tag still records an
            // intent tag so merges from other replicas stay consistent.
            self.removes.push((value.clone(), Tag::new(timestamp, node_id)));
        } else {
            for tag in tags {
                self.removes.push((value.clone(), tag));
            }
        }
    }

    pub fn values(&self) -> HashSet<T> {
        let mut present = HashSet::new();
        for (value, tag) in &self.adds {
            let shadowed = self
                .removes
                .iter()
                .any(|(rv, rtag)| rv == value && rtag == tag);
            if !shadowed {
                present.insert(value.clone());
            }
        }
        present
    }

    pub fn contains(&self, value: &T) -> bool {
        self.values().contains(value)
    }

    /// Elementwise union of both tables; commutative, associative and
    /// idempotent by construction (set union).
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for entry in &other.adds {
            if !merged.adds.contains(entry) {
                merged.adds.push(entry.clone());
            }
        }
        for entry in &other.removes {
            if !merged.removes.contains(entry) {
                merged.removes.push(entry.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lww_register_later_timestamp_wins() {
        let mut reg = LwwRegister::new("A".to_string(), "N1");
        reg.set("B".to_string(), "N1", 10);
        assert_eq!(reg.get(), "B");
        reg.set("earlier".to_string(), "N1", 5);
        assert_eq!(reg.get(), "B");
    }

    #[test]
    fn lww_register_tie_breaks_on_node_id() {
        let mut n1 = LwwRegister::new("A".to_string(), "N0");
        n1.set("from-n1".to_string(), "N1", 10);
        let mut n2 = LwwRegister::new("A".to_string(), "N0");
        n2.set("from-n2".to_string(), "N2", 10);

        let merged = n1.merge(&n2);
        assert_eq!(merged.get(), "from-n2");
    }

    #[test]
    fn lww_register_merge_is_idempotent() {
        let mut reg = LwwRegister::new("A".to_string(), "N1");
        reg.set("B".to_string(), "N1", 10);
        let merged = reg.merge(&reg.clone());
        assert_eq!(merged, reg);
    }

    #[test]
    fn or_set_add_remove_and_concurrent_resurrection() {
        let mut n1: OrSet<String> = OrSet::new();
        n1.add("x".to_string(), "N1", 1);
        let mut n2 = n1.clone();

        // N1 removes x...
        n1.remove(&"x".to_string(), "N1", 2);
        assert!(!n1.contains(&"x".to_string()));

        // ...while N2 concurrently re-adds it with a fresh tag.
        n2.add("x".to_string(), "N2", 3);

        let merged = n1.merge(&n2);
        assert!(merged.contains(&"x".to_string()));
    }

    #[test]
    fn or_set_merge_is_commutative_and_idempotent() {
        let mut a: OrSet<String> = OrSet::new();
        a.add("x".to_string(), "N1", 1);
        let mut b: OrSet<String> = OrSet::new();
        b.add("y".to_string(), "N2", 2);

        assert_eq!(a.merge(&b).values(), b.merge(&a).values());
        assert_eq!(a.merge(&a).values(), a.values());
    }
}
