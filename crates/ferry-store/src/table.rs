//! Chained hash table over string keys.

use std::fmt;

use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::hash::{fnv1a_hash, HashFn};

type Link<V> = Option<Box<Node<V>>>;

struct Node<V> {
    key: String,
    value: V,
    next: Link<V>,
}

/// Chained hash table keyed by owned strings.
///
/// The bucket count is fixed at creation and only changes through
/// [`resize`](Self::resize). Each bucket is a singly linked chain; new
/// nodes are prepended.
///
/// The table owns its payloads: a value belongs to the table from a
/// successful [`insert`](Self::insert) until [`remove`](Self::remove) hands
/// it back, or until the table is dropped (which drops it). Payloads are
/// never inspected.
pub struct KeyedStore<V> {
    buckets: Vec<Link<V>>,
    hash: HashFn,
    len: usize,
}

/// Byte offsets per path (e.g. resume points for chunked copies).
pub type OffsetStore = KeyedStore<i64>;

/// Floating accumulators per path (e.g. bytes moved, elapsed seconds).
pub type AccumulatorStore = KeyedStore<f64>;

/// Opaque owned records per path.
pub type HandleStore<T> = KeyedStore<Box<T>>;

/// Snapshot of a table's shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    pub entries: usize,
    pub buckets: usize,
    pub empty_buckets: usize,
    pub longest_chain: usize,
    pub load_factor: f64,
}

fn bucket_index(hash: HashFn, key: &str, buckets: usize) -> usize {
    (hash(key) % buckets as u64) as usize
}

fn alloc_buckets<V>(count: usize) -> StoreResult<Vec<Link<V>>> {
    if count == 0 {
        return Err(StoreError::ZeroBuckets);
    }
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(count)
        .map_err(|_| StoreError::Allocation { buckets: count })?;
    buckets.resize_with(count, || None);
    Ok(buckets)
}

impl<V> KeyedStore<V> {
    /// Create a table with `bucket_count` empty chains and FNV-1a hashing.
    pub fn new(bucket_count: usize) -> StoreResult<Self> {
        Self::with_hasher(bucket_count, fnv1a_hash)
    }

    /// Create a table with a caller-supplied hash function.
    pub fn with_hasher(bucket_count: usize, hash: HashFn) -> StoreResult<Self> {
        Ok(Self {
            buckets: alloc_buckets(bucket_count)?,
            hash,
            len: 0,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn index(&self, key: &str) -> usize {
        bucket_index(self.hash, key, self.buckets.len())
    }

    fn find(&self, key: &str) -> Option<&Node<V>> {
        let mut cursor = self.buckets[self.index(key)].as_deref();
        while let Some(node) = cursor {
            if node.key == key {
                return Some(node);
            }
            cursor = node.next.as_deref();
        }
        None
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut Node<V>> {
        let idx = self.index(key);
        let mut cursor = self.buckets[idx].as_deref_mut();
        while let Some(node) = cursor {
            if node.key == key {
                return Some(node);
            }
            cursor = node.next.as_deref_mut();
        }
        None
    }

    /// Insert a new key.
    ///
    /// Fails with [`StoreError::Duplicate`] if the key is already present;
    /// the table is left unchanged and `value` is dropped.
    pub fn insert(&mut self, key: &str, value: V) -> StoreResult<()> {
        if self.find(key).is_some() {
            trace!(key, "duplicate insert rejected");
            return Err(StoreError::duplicate(key));
        }
        self.push_front(key, value);
        Ok(())
    }

    fn push_front(&mut self, key: &str, value: V) {
        let idx = self.index(key);
        let head = self.buckets[idx].take();
        self.buckets[idx] = Some(Box::new(Node {
            key: key.to_owned(),
            value,
            next: head,
        }));
        self.len += 1;
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.find(key).map(|node| &node.value)
    }

    /// Look up a key for in-place mutation.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.find_mut(key).map(|node| &mut node.value)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Overwrite the payload of an existing key, returning the old one.
    ///
    /// The node is neither reallocated nor relinked.
    pub fn update(&mut self, key: &str, value: V) -> StoreResult<V> {
        match self.find_mut(key) {
            Some(node) => Ok(std::mem::replace(&mut node.value, value)),
            None => Err(StoreError::not_found(key)),
        }
    }

    /// Mutate the payload of an existing key in place.
    pub fn update_with(&mut self, key: &str, f: impl FnOnce(&mut V)) -> StoreResult<()> {
        match self.find_mut(key) {
            Some(node) => {
                f(&mut node.value);
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    /// Unlink a key and hand its payload back to the caller.
    pub fn remove(&mut self, key: &str) -> StoreResult<V> {
        let idx = self.index(key);

        let mut position = 0;
        let mut cursor = self.buckets[idx].as_deref();
        loop {
            match cursor {
                Some(node) if node.key == key => break,
                Some(node) => {
                    position += 1;
                    cursor = node.next.as_deref();
                }
                None => return Err(StoreError::not_found(key)),
            }
        }

        let mut link = &mut self.buckets[idx];
        for _ in 0..position {
            match link {
                Some(node) => link = &mut node.next,
                None => return Err(StoreError::not_found(key)),
            }
        }

        match link.take() {
            Some(mut node) => {
                *link = node.next.take();
                self.len -= 1;
                Ok(node.value)
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    /// Rehash every node into `new_bucket_count` chains.
    ///
    /// The new bucket array is allocated before anything moves, so a failed
    /// resize leaves the table exactly as it was. Nodes are relinked, not
    /// reallocated.
    pub fn resize(&mut self, new_bucket_count: usize) -> StoreResult<()> {
        let mut buckets = alloc_buckets(new_bucket_count)?;
        let old_count = self.buckets.len();

        for mut head in std::mem::take(&mut self.buckets) {
            while let Some(mut node) = head {
                head = node.next.take();
                let idx = bucket_index(self.hash, &node.key, new_bucket_count);
                node.next = buckets[idx].take();
                buckets[idx] = Some(node);
            }
        }
        self.buckets = buckets;

        debug!(
            from = old_count,
            to = new_bucket_count,
            entries = self.len,
            "keyed store resized"
        );
        Ok(())
    }

    /// Drop every entry, keeping the bucket count.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            let mut head = bucket.take();
            while let Some(mut node) = head {
                head = node.next.take();
            }
        }
        self.len = 0;
    }

    /// Iterate over `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            node: None,
            remaining: self.len,
        }
    }

    /// Iterate over keys in bucket order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Chain-length statistics, useful when picking a resize target.
    pub fn stats(&self) -> StoreStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for bucket in &self.buckets {
            let mut length = 0;
            let mut cursor = bucket.as_deref();
            while let Some(node) = cursor {
                length += 1;
                cursor = node.next.as_deref();
            }
            if length == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(length);
        }
        StoreStats {
            entries: self.len,
            buckets: self.buckets.len(),
            empty_buckets,
            longest_chain,
            load_factor: self.len as f64 / self.buckets.len() as f64,
        }
    }
}

impl KeyedStore<f64> {
    /// Add `delta` to an accumulator, inserting it at zero first if absent.
    pub fn accumulate(&mut self, key: &str, delta: f64) -> f64 {
        if let Some(total) = self.get_mut(key) {
            *total += delta;
            return *total;
        }
        self.push_front(key, delta);
        delta
    }
}

// Chains can be long under a weak hash; unlink iteratively so dropping
// never recurses once per node.
impl<V> Drop for KeyedStore<V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V: fmt::Debug> fmt::Debug for KeyedStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over a [`KeyedStore`].
pub struct Iter<'a, V> {
    buckets: std::slice::Iter<'a, Link<V>>,
    node: Option<&'a Node<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                self.remaining -= 1;
                return Some((node.key.as_str(), &node.value));
            }
            self.node = self.buckets.next()?.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> IntoIterator for &'a KeyedStore<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
