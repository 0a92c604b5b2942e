//! Recency cache with an active tier and a demoted, best-effort tier.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::cache::types::{CacheConfig, CacheError, CacheStats};

/// Which retention tier an entry currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    /// Strongly retained, bounded by `capacity`, ordered by recency.
    Active,
    /// Best-effort, bounded by `demoted_capacity`, evicted silently.
    Demoted,
}

/// Arena slot for a cached entry.
///
/// Recency lists are threaded through the arena with index links so there are
/// no cyclic references; `prev`/`next` are `None` at the list ends.
#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    tier: Tier,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Head/tail bookkeeping for one recency list.
#[derive(Debug, Default, Clone, Copy)]
struct ListEnds {
    /// Most recently used entry.
    head: Option<usize>,
    /// Least recently used entry.
    tail: Option<usize>,
    len: usize,
}

/// Capacity-bounded recency cache with two retention tiers.
///
/// The most recently used `capacity` values sit in the active tier. Inserting
/// beyond capacity *demotes* the least-recently-used active entry to the
/// demoted tier instead of destroying it; a later `get` can re-promote it.
/// The demoted tier has its own larger bound and evicts its oldest entry
/// outright once exceeded — callers must treat demoted entries as ephemeral.
///
/// Not synchronized: drive it from a single consumer context.
///
/// # Example
///
/// ```
/// use iconflow::cache::{CacheConfig, RecencyCache};
///
/// let mut cache: RecencyCache<String, Vec<u8>> =
///     RecencyCache::new(CacheConfig::with_capacity(8)).unwrap();
/// cache.put("icon:42".to_string(), vec![1, 2, 3]);
/// assert_eq!(cache.get(&"icon:42".to_string()), Some(&vec![1, 2, 3]));
/// ```
pub struct RecencyCache<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    /// Indices of vacated slots, reused before growing the arena.
    free: Vec<usize>,
    /// Key to arena slot.
    index: HashMap<K, usize>,
    active: ListEnds,
    demoted: ListEnds,
    config: CacheConfig,
    stats: CacheStats,
}

impl<K, V> RecencyCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] for a capacity below 2 or a
    /// demoted bound smaller than the active capacity.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            active: ListEnds::default(),
            demoted: ListEnds::default(),
            config,
            stats: CacheStats::default(),
        })
    }

    /// Create a cache with the given active capacity and default demoted bound.
    pub fn with_capacity(capacity: usize) -> Result<Self, CacheError> {
        Self::new(CacheConfig::with_capacity(capacity))
    }

    /// Get the cached value for `key`, or `None` on a miss.
    ///
    /// An active hit promotes the entry to most-recently-used. A demoted hit
    /// re-enters the active tier at the front, demoting the oldest active
    /// entry if that overflows the capacity.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&idx) = self.index.get(key) else {
            self.stats.misses += 1;
            return None;
        };

        self.stats.hits += 1;
        let tier = self.node(idx).tier;
        self.unlink(idx);
        self.push_front(idx, Tier::Active);
        if tier == Tier::Demoted {
            self.stats.promotions += 1;
            trace!(slot = idx, "re-promoted demoted cache entry");
        }
        self.demote_while_over_capacity();

        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Insert or overwrite `key` as an active, most-recently-used entry.
    ///
    /// If the active tier overflows, its least-recently-used entry is demoted
    /// (not deleted).
    pub fn put(&mut self, key: K, value: V) {
        self.stats.insertions += 1;
        if let Some(&idx) = self.index.get(&key) {
            self.node_mut(idx).value = value;
            self.unlink(idx);
            self.push_front(idx, Tier::Active);
        } else {
            let idx = self.alloc(key.clone(), value, Tier::Active);
            self.index.insert(key, idx);
        }
        self.demote_while_over_capacity();
    }

    /// Insert or overwrite `key` directly in the demoted tier.
    ///
    /// Used when the consumer is not in an active consumption context and the
    /// value should not pressure the strong tier. An existing active entry for
    /// the same key is moved down rather than left behind with stale data.
    pub fn put_weak(&mut self, key: K, value: V) {
        self.stats.insertions += 1;
        if let Some(&idx) = self.index.get(&key) {
            self.node_mut(idx).value = value;
            self.unlink(idx);
            self.push_front(idx, Tier::Demoted);
        } else {
            let idx = self.alloc(key.clone(), value, Tier::Demoted);
            self.index.insert(key, idx);
        }
        self.trim_demoted();
    }

    /// Demote every active entry to the best-effort tier in one pass.
    ///
    /// The index is preserved, so subsequent lookups can still hit (and
    /// re-promote) anything the demoted bound has not yet pushed out.
    /// Typically called when the consumer becomes inactive.
    pub fn release(&mut self) {
        let released = self.active.len;
        while let Some(idx) = self.active.tail {
            self.unlink(idx);
            self.push_front(idx, Tier::Demoted);
            self.stats.demotions += 1;
        }
        self.trim_demoted();
        if released > 0 {
            debug!(entries = released, "released active cache tier");
        }
    }

    /// Remove everything, active and demoted.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.active = ListEnds::default();
        self.demoted = ListEnds::default();
    }

    /// Whether `key` is present in either tier.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Total number of entries across both tiers.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of entries in the active tier.
    pub fn active_len(&self) -> usize {
        self.active.len
    }

    /// Number of entries in the demoted tier.
    pub fn demoted_len(&self) -> usize {
        self.demoted.len
    }

    /// Configured active-tier capacity.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Arena and list plumbing
    // ─────────────────────────────────────────────────────────────────────────

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.slots[idx].as_ref().expect("cache slot vacated while linked")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.slots[idx].as_mut().expect("cache slot vacated while linked")
    }

    fn list_mut(&mut self, tier: Tier) -> &mut ListEnds {
        match tier {
            Tier::Active => &mut self.active,
            Tier::Demoted => &mut self.demoted,
        }
    }

    /// Allocate an arena slot and link it at the front of `tier`.
    fn alloc(&mut self, key: K, value: V, tier: Tier) -> usize {
        let node = Node {
            key,
            value,
            tier,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.push_front(idx, tier);
        idx
    }

    /// Detach `idx` from whichever list currently holds it.
    fn unlink(&mut self, idx: usize) {
        let (prev, next, tier) = {
            let node = self.node(idx);
            (node.prev, node.next, node.tier)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.list_mut(tier).head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.list_mut(tier).tail = prev,
        }
        self.list_mut(tier).len -= 1;

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    /// Link an unlinked `idx` at the most-recently-used end of `tier`.
    fn push_front(&mut self, idx: usize, tier: Tier) {
        let old_head = self.list_mut(tier).head;
        {
            let node = self.node_mut(idx);
            node.tier = tier;
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(idx);
        }
        let ends = self.list_mut(tier);
        ends.head = Some(idx);
        if ends.tail.is_none() {
            ends.tail = Some(idx);
        }
        ends.len += 1;
    }

    /// Demote active LRU entries until the active tier fits its capacity.
    fn demote_while_over_capacity(&mut self) {
        while self.active.len > self.config.capacity {
            let idx = self.active.tail.expect("active list over capacity but empty");
            self.unlink(idx);
            self.push_front(idx, Tier::Demoted);
            self.stats.demotions += 1;
            trace!(slot = idx, "demoted least-recently-used active entry");
        }
        self.trim_demoted();
    }

    /// Evict demoted tail entries until the demoted tier fits its bound.
    fn trim_demoted(&mut self) {
        while self.demoted.len > self.config.demoted_capacity {
            let idx = self.demoted.tail.expect("demoted list over bound but empty");
            self.unlink(idx);
            let node = self.slots[idx].take().expect("evicting vacant cache slot");
            self.index.remove(&node.key);
            self.free.push(idx);
            self.stats.reclaimed += 1;
            debug!(slot = idx, "evicted demoted cache entry");
        }
    }
}
