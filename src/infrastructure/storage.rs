//! Ordered storage for message keys.
//!
//! Both structures the deduplication cache needs are insertion/access
//! ordered maps with O(1) lookup, O(1) unlink and O(1) pop of the oldest
//! entry:
//!
//! - [`BoundedAccessCache`]: key -> occurrence history, reordered on every
//!   access, evicting the least recently used key when over capacity.
//! - [`FirstSeenIndex`]: key -> first occurrence timestamp, never reordered,
//!   so the front is always the key seen earliest.
//!
//! They share one arena-backed doubly linked list ([`LinkedMap`]): nodes
//! live in a `Vec` slab, links are slot indices, and an `ahash` map points
//! from key to slot. Evictions are returned to the caller, not signalled
//! through callbacks.

use crate::domain::history::OccurrenceHistory;
use ahash::RandomState;
use std::collections::HashMap;

type Slot = usize;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// Hash map whose entries are threaded on a doubly linked list.
///
/// The front of the list is the oldest entry, the back the newest.
#[derive(Debug)]
pub struct LinkedMap<V> {
    nodes: Vec<Option<Node<V>>>,
    free: Vec<Slot>,
    index: HashMap<String, Slot, RandomState>,
    head: Option<Slot>,
    tail: Option<Slot>,
}

impl<V> LinkedMap<V> {
    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            head: None,
            tail: None,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if a key is present. Does not reorder.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a value without reordering.
    pub fn get(&self, key: &str) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.node(slot).map(|node| &node.value)
    }

    /// Look up a value mutably and move it to the back.
    pub fn get_mut_to_back(&mut self, key: &str) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        self.unlink(slot);
        self.link_back(slot);
        self.nodes[slot].as_mut().map(|node| &mut node.value)
    }

    /// Insert a new key at the back.
    ///
    /// The caller guarantees the key is absent.
    pub fn push_back(&mut self, key: String, value: V) {
        debug_assert!(!self.index.contains_key(&key));
        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.link_back(slot);
    }

    /// Oldest entry, if any.
    pub fn front(&self) -> Option<(&str, &V)> {
        let node = self.node(self.head?)?;
        Some((node.key.as_str(), &node.value))
    }

    /// Remove and return the oldest entry.
    pub fn pop_front(&mut self) -> Option<(String, V)> {
        let slot = self.head?;
        self.take(slot)
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = *self.index.get(key)?;
        self.take(slot).map(|(_, value)| value)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// Remove every entry, yielding them oldest first.
    pub fn drain(&mut self) -> Vec<(String, V)> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(entry) = self.pop_front() {
            drained.push(entry);
        }
        self.clear();
        drained
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            map: self,
            cursor: self.head,
        }
    }

    fn node(&self, slot: Slot) -> Option<&Node<V>> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn take(&mut self, slot: Slot) -> Option<(String, V)> {
        self.unlink(slot);
        let node = self.nodes.get_mut(slot)?.take()?;
        self.index.remove(&node.key);
        self.free.push(slot);
        Some((node.key, node.value))
    }

    fn unlink(&mut self, slot: Slot) {
        let Some((prev, next)) = self.node(slot).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.nodes[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.nodes[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn link_back(&mut self, slot: Slot) {
        let old_tail = self.tail;
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.nodes[t].as_mut() {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}

/// Iterator over a [`LinkedMap`], oldest entry first.
pub struct Iter<'a, V> {
    map: &'a LinkedMap<V>,
    cursor: Option<Slot>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.map.node(self.cursor?)?;
        self.cursor = node.next;
        Some((node.key.as_str(), &node.value))
    }
}

/// An entry pushed out of a [`BoundedAccessCache`] by capacity pressure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedEntry {
    /// The evicted message key
    pub key: String,
    /// Its final occurrence history
    pub history: OccurrenceHistory,
}

/// Fixed-capacity map from message key to occurrence history with
/// least-recently-used eviction.
///
/// Every [`get`](Self::get) and [`put`](Self::put) moves the key to the
/// most-recently-used position, so access order is a total order and LRU
/// ties cannot occur.
#[derive(Debug)]
pub struct BoundedAccessCache {
    entries: LinkedMap<OccurrenceHistory>,
    capacity: usize,
    last_eviction: Option<EvictedEntry>,
}

impl BoundedAccessCache {
    /// Create a cache holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LinkedMap::with_capacity(capacity.min(4_096)),
            capacity,
            last_eviction: None,
        }
    }

    /// Look up a key's history and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&OccurrenceHistory> {
        self.entries.get_mut_to_back(key).map(|history| &*history)
    }

    /// Look up a key's history without touching its recency.
    pub fn peek(&self, key: &str) -> Option<&OccurrenceHistory> {
        self.entries.get(key)
    }

    /// Check if a key is resident without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Record an occurrence of `key` at `timestamp_ms`.
    ///
    /// Creates the history if the key is new, appends the timestamp and marks
    /// the key most recently used. If the cache is then over capacity the
    /// least recently used entry is evicted and `true` is returned; the
    /// evicted entry can be collected once with
    /// [`take_eviction`](Self::take_eviction) until the next `put`.
    pub fn put(&mut self, key: &str, timestamp_ms: u64) -> bool {
        self.last_eviction = None;

        if let Some(history) = self.entries.get_mut_to_back(key) {
            history.record(timestamp_ms);
            return false;
        }

        self.entries
            .push_back(key.to_string(), OccurrenceHistory::starting_at(timestamp_ms));

        if self.entries.len() > self.capacity {
            if let Some((key, history)) = self.entries.pop_front() {
                self.last_eviction = Some(EvictedEntry { key, history });
                return true;
            }
        }
        false
    }

    /// Take the entry evicted by the most recent [`put`](Self::put), if any.
    pub fn take_eviction(&mut self) -> Option<EvictedEntry> {
        self.last_eviction.take()
    }

    /// Remove a key, returning its history.
    pub fn remove(&mut self, key: &str) -> Option<OccurrenceHistory> {
        self.entries.remove(key)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_eviction = None;
    }

    /// Remove every entry, yielding them least recently used first.
    pub fn drain(&mut self) -> Vec<(String, OccurrenceHistory)> {
        self.last_eviction = None;
        self.entries.drain()
    }

    /// Maximum number of resident keys.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate least recently used first.
    pub fn iter(&self) -> Iter<'_, OccurrenceHistory> {
        self.entries.iter()
    }
}

/// Insertion-ordered map from message key to first occurrence timestamp.
///
/// Re-inserting an existing key neither updates nor reorders it: expiry is
/// measured from first sight.
#[derive(Debug)]
pub struct FirstSeenIndex {
    entries: LinkedMap<u64>,
}

impl FirstSeenIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: LinkedMap::with_capacity(0),
        }
    }

    /// Register a key's first occurrence. Returns `false` if already present.
    pub fn insert(&mut self, key: &str, timestamp_ms: u64) -> bool {
        if self.entries.contains(key) {
            return false;
        }
        self.entries.push_back(key.to_string(), timestamp_ms);
        true
    }

    /// First occurrence timestamp of a key.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Check if a key is indexed.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// The key seen earliest, with its timestamp.
    pub fn oldest(&self) -> Option<(&str, u64)> {
        self.entries.front().map(|(key, ts)| (key, *ts))
    }

    /// Remove and return the key seen earliest.
    pub fn pop_oldest(&mut self) -> Option<(String, u64)> {
        self.entries.pop_front()
    }

    /// Remove a key.
    pub fn remove(&mut self, key: &str) -> Option<u64> {
        self.entries.remove(key)
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate earliest first.
    pub fn iter(&self) -> Iter<'_, u64> {
        self.entries.iter()
    }
}

impl Default for FirstSeenIndex {
    fn default() -> Self {
        Self::new()
    }
}
