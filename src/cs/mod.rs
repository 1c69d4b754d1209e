// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The (optional) Content Store: a bounded cache of Content Objects keyed by
//! name and, where present, key id / content hash, with approximate-LRU
//! eviction and TTL sourced from each object's own expiry field (spec.md
//! §4.4).
//!
//! Eviction victim search is a linear scan over the whole store rather than
//! an intrusive doubly-linked list — a deliberate simplification over the
//! exact-LRU design note in SPEC_FULL.md, acceptable because `cs_capacity`
//! is expected to stay in the low thousands for a forwarder process.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::{codec::ContentObject, codec::Interest, name::Name};

struct CsEntry {
    co: ContentObject,
    expiry: Option<Instant>,
    last_used: u64,
}

pub struct Cs {
    /// Gates [`Cs::insert`] — the `CacheStore` control toggle (spec.md §6).
    store_enabled: bool,
    /// Gates [`Cs::lookup`] — the `CacheServe` control toggle (spec.md §6).
    serve_enabled: bool,
    capacity: usize,
    buckets: FxHashMap<Name, Vec<CsEntry>>,
    len: usize,
    clock: u64,
}

impl Cs {
    /// `enabled` seeds both the store and serve toggles, matching the
    /// config record's single `cs_enabled` startup flag (spec.md §6); the
    /// two can then diverge at runtime via the `CacheStore`/`CacheServe`
    /// control ops.
    pub fn new(capacity: usize, enabled: bool) -> Self {
        Self {
            store_enabled: enabled,
            serve_enabled: enabled,
            capacity,
            buckets: FxHashMap::default(),
            len: 0,
            clock: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store_enabled || self.serve_enabled
    }

    pub fn set_store_enabled(&mut self, enabled: bool) {
        self.store_enabled = enabled;
    }

    pub fn set_serve_enabled(&mut self, enabled: bool) {
        self.serve_enabled = enabled;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Satisfies `interest` from the cache, if both the store is enabled and
    /// a non-expired, restriction-compatible object is held. Lazily purges
    /// any expired entry it encounters along the way.
    pub fn lookup(&mut self, interest: &Interest, now: Instant) -> Option<ContentObject> {
        if !self.serve_enabled {
            return None;
        }
        let tick = self.clock + 1;
        let bucket = self.buckets.get_mut(&interest.name)?;
        bucket.retain(|e| e.expiry.map(|exp| exp > now).unwrap_or(true));

        let hit = bucket.iter_mut().find(|e| {
            let key_id_ok = match &interest.key_id_restriction {
                Some(want) => e.co.key_id.as_ref() == Some(want),
                None => true,
            };
            let hash_ok = match interest.content_object_hash_restriction {
                Some(want) => e.co.content_hash() == want,
                None => true,
            };
            key_id_ok && hash_ok
        });
        let result = hit.map(|e| {
            e.last_used = tick;
            e.co.clone()
        });
        self.clock = tick;
        if bucket.is_empty() {
            self.buckets.remove(&interest.name);
        }
        result
    }

    /// Admits a Content Object, replacing any existing entry with the same
    /// name/key-id/hash identity, evicting the least-recently-used entry
    /// store-wide if at capacity.
    pub fn insert(&mut self, co: ContentObject, now: Instant) {
        if !self.store_enabled || self.capacity == 0 {
            return;
        }
        let expiry = co.expiry_ms.map(|ms| now + Duration::from_millis(ms));
        let used = self.tick();

        let bucket = self.buckets.entry(co.name.clone()).or_default();
        if let Some(existing) = bucket
            .iter_mut()
            .find(|e| e.co.key_id == co.key_id && e.co.content_hash() == co.content_hash())
        {
            existing.co = co;
            existing.expiry = expiry;
            existing.last_used = used;
            return;
        }

        if self.len >= self.capacity {
            self.evict_one();
        }
        let name = co.name.clone();
        self.buckets.entry(name).or_default().push(CsEntry { co, expiry, last_used: used });
        self.len += 1;
    }

    fn evict_one(&mut self) {
        let victim = self
            .buckets
            .iter()
            .flat_map(|(name, bucket)| {
                bucket.iter().enumerate().map(move |(i, e)| (name.clone(), i, e.last_used))
            })
            .min_by_key(|(_, _, used)| *used);

        let Some((name, idx, _)) = victim else { return };
        if let Some(bucket) = self.buckets.get_mut(&name) {
            bucket.remove(idx);
            if bucket.is_empty() {
                self.buckets.remove(&name);
            }
            self.len -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::name::{Component, LABEL_NAME};

    fn name(v: &str) -> Name {
        Name::from_components(vec![Component::new(
            LABEL_NAME,
            Bytes::copy_from_slice(v.as_bytes()),
        )])
        .unwrap()
    }

    #[test]
    fn store_and_serve_toggle_independently() {
        let mut cs = Cs::new(10, true);
        let now = Instant::now();
        cs.set_serve_enabled(false);
        cs.insert(ContentObject::new(name("a"), Bytes::from_static(b"x")), now);
        assert_eq!(cs.len(), 1);
        assert!(cs.lookup(&Interest::new(name("a"), 5), now).is_none());

        cs.set_serve_enabled(true);
        cs.set_store_enabled(false);
        assert!(cs.lookup(&Interest::new(name("a"), 5), now).is_some());
        cs.insert(ContentObject::new(name("b"), Bytes::from_static(b"y")), now);
        assert_eq!(cs.len(), 1);
    }

    #[test]
    fn disabled_store_never_caches() {
        let mut cs = Cs::new(10, false);
        let now = Instant::now();
        cs.insert(ContentObject::new(name("a"), Bytes::from_static(b"x")), now);
        assert_eq!(cs.len(), 0);
        let hit = cs.lookup(&Interest::new(name("a"), 5), now);
        assert!(hit.is_none());
    }

    #[test]
    fn hit_then_served_content_matches_requested_name() {
        let mut cs = Cs::new(10, true);
        let now = Instant::now();
        cs.insert(ContentObject::new(name("a"), Bytes::from_static(b"x")), now);
        let hit = cs.lookup(&Interest::new(name("a"), 5), now).unwrap();
        assert_eq!(hit.payload, Bytes::from_static(b"x"));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let mut cs = Cs::new(10, true);
        let now = Instant::now();
        let mut co = ContentObject::new(name("a"), Bytes::from_static(b"x"));
        co.expiry_ms = Some(1);
        cs.insert(co, now);
        let later = now + Duration::from_secs(1);
        assert!(cs.lookup(&Interest::new(name("a"), 5), later).is_none());
        assert!(cs.is_empty());
    }

    #[test]
    fn eviction_drops_the_least_recently_used_entry() {
        let mut cs = Cs::new(1, true);
        let now = Instant::now();
        cs.insert(ContentObject::new(name("a"), Bytes::from_static(b"1")), now);
        cs.insert(ContentObject::new(name("b"), Bytes::from_static(b"2")), now);
        assert_eq!(cs.len(), 1);
        assert!(cs.lookup(&Interest::new(name("a"), 5), now).is_none());
        assert!(cs.lookup(&Interest::new(name("b"), 5), now).is_some());
    }

    #[test]
    fn clear_empties_the_store() {
        let mut cs = Cs::new(10, true);
        let now = Instant::now();
        cs.insert(ContentObject::new(name("a"), Bytes::from_static(b"x")), now);
        cs.clear();
        assert!(cs.is_empty());
    }
}
