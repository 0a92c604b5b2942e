//! Recency-ordered admission queue for task entries.
//!
//! One arena of task slots, an index from key to slot, and an intrusive
//! doubly-linked list (index links, no cyclic references) over the *queued*
//! entries, most recently requested first. In-flight entries are unlinked
//! from the list but stay in the index so that re-submissions coalesce onto
//! them and the delivery point can fetch their current target.
//!
//! The bound counts queued plus in-flight entries; overflow drops the list
//! tail, which is always a queued entry because the loader keeps its capacity
//! strictly above the worker count.

use std::collections::HashMap;
use std::hash::Hash;

/// Arena slot for one task entry.
#[derive(Debug)]
struct Node<K, P, X, T> {
    key: K,
    param: P,
    extra: X,
    target: T,
    prev: Option<usize>,
    next: Option<usize>,
    /// Linked into the pending list (false once a worker has taken it).
    queued: bool,
}

/// Outcome of an admission attempt.
#[derive(Debug)]
pub(crate) enum Submission<K> {
    /// A new task entry was created at the front of the queue.
    New {
        /// Key of the entry dropped to make room, if the bound was exceeded.
        evicted: Option<K>,
    },
    /// An entry for the key already existed; its target/extra were rebound.
    Coalesced,
}

/// Bounded, recency-ordered backlog of task entries.
#[derive(Debug)]
pub(crate) struct AdmissionQueue<K, P, X, T> {
    slots: Vec<Option<Node<K, P, X, T>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    /// Most recently requested queued entry.
    head: Option<usize>,
    /// Least recently requested queued entry.
    tail: Option<usize>,
    queued: usize,
    capacity: usize,
}

impl<K, P, X, T> AdmissionQueue<K, P, X, T>
where
    K: Eq + Hash + Clone,
    P: Clone,
    X: Clone,
{
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            queued: 0,
            capacity,
        }
    }

    /// Admit a request for `key`.
    ///
    /// An existing entry (queued or in flight) is rebound to the new
    /// target/extra; if it is still queued it moves to the front. Otherwise a
    /// new entry is created at the front and, if that exceeds the bound, the
    /// tail entry is dropped and its key returned.
    pub(crate) fn submit(&mut self, key: K, param: P, extra: X, target: T) -> Submission<K> {
        if let Some(&idx) = self.index.get(&key) {
            let node = self.node_mut(idx);
            node.target = target;
            node.extra = extra;
            if node.queued {
                self.unlink(idx);
                self.link_front(idx);
            }
            return Submission::Coalesced;
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            param,
            extra,
            target,
            prev: None,
            next: None,
            queued: true,
        });
        self.index.insert(key, idx);
        self.link_front(idx);

        let mut evicted = None;
        if self.index.len() > self.capacity {
            if let Some(t) = self.tail {
                self.unlink(t);
                let node = self.slots[t].take().expect("evicting vacant task slot");
                self.index.remove(&node.key);
                self.free.push(t);
                evicted = Some(node.key);
            }
        }
        Submission::New { evicted }
    }

    /// Take the most recently requested queued entry for execution.
    ///
    /// The entry leaves the pending list but stays in the index as in-flight;
    /// key/param/extra are cloned for the worker's load call.
    pub(crate) fn take_front(&mut self) -> Option<(K, P, X)> {
        let idx = self.head?;
        self.unlink(idx);
        let node = self.node_mut(idx);
        node.queued = false;
        Some((node.key.clone(), node.param.clone(), node.extra.clone()))
    }

    /// Remove the entry for `key`, returning its current extra and target.
    ///
    /// Called by the delivery point once a result is honored. Returns `None`
    /// if the entry was removed by an intervening invalidation.
    pub(crate) fn remove(&mut self, key: &K) -> Option<(X, T)> {
        let idx = self.index.remove(key)?;
        if self.node_mut(idx).queued {
            self.unlink(idx);
        }
        let node = self.slots[idx].take().expect("removing vacant task slot");
        self.free.push(idx);
        Some((node.extra, node.target))
    }

    /// Number of queued (not yet taken) entries.
    pub(crate) fn pending(&self) -> usize {
        self.queued
    }

    /// Number of tracked entries, queued plus in flight.
    pub(crate) fn tracked(&self) -> usize {
        self.index.len()
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, P, X, T> {
        self.slots[idx].as_mut().expect("task slot vacated while indexed")
    }

    fn alloc(&mut self, node: Node<K, P, X, T>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
            node.queued = true;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.queued += 1;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node_mut(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
        self.queued -= 1;
    }
}

impl<K, P, X, T> AdmissionQueue<K, P, X, T> {
    /// Drop every entry, queued and in flight.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.queued = 0;
    }
}
