// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The Pending Interest Table: aggregates concurrent Interests for the same
//! name (and compatible key-id/hash restrictions) into one entry with a
//! merged ingress set, and matches arriving Content Objects back against it
//! (spec.md §4.3).
//!
//! Entries are bucketed by name, mirroring the [`crate::fib`] table's
//! per-depth hash buckets — here there is only one depth (exact name match),
//! but several entries can share a bucket when their restriction tuples
//! differ, the same way an aggregation table in the original CCNx forwarder
//! chains entries under one name.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::{
    codec::{ContentObject, Interest},
    error::CapacityError,
    name::Name,
};

#[derive(Debug, Clone)]
pub struct PitEntry {
    pub name: Name,
    pub key_id_restriction: Option<bytes::Bytes>,
    pub content_object_hash_restriction: Option<[u8; 32]>,
    pub ingress: Vec<u32>,
    /// Connections already forwarded to. Disjoint from `ingress` at creation
    /// (spec.md §3 invariant) — enforces "at most one forwarding per
    /// Interest per next-hop" without re-consulting the FIB on aggregation.
    pub egress: Vec<u32>,
    pub expiry: Instant,
}

impl PitEntry {
    fn restrictions_match(&self, interest: &Interest) -> bool {
        self.key_id_restriction == interest.key_id_restriction
            && self.content_object_hash_restriction
                == interest.content_object_hash_restriction
    }

    fn satisfied_by(&self, co: &ContentObject) -> bool {
        let key_id_ok = match &self.key_id_restriction {
            Some(want) => co.key_id.as_ref() == Some(want),
            None => true,
        };
        let hash_ok = match &self.content_object_hash_restriction {
            Some(want) => *want == co.content_hash(),
            None => true,
        };
        key_id_ok && hash_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Aggregated,
    /// No new entry was created because `compute_egress` resolved to an
    /// empty next-hop set (spec.md §4.5 step 6: "if empty, drop" happens
    /// *before* step 7's PIT insert) — the PIT is left untouched rather than
    /// holding a dead entry that a future Content Object could never
    /// satisfy.
    NoRoute,
}

#[derive(Debug)]
pub struct Pit {
    buckets: FxHashMap<Name, Vec<PitEntry>>,
    len: usize,
    capacity: usize,
    default_lifetime: Duration,
}

impl Pit {
    pub fn new(capacity: usize, default_lifetime: Duration) -> Self {
        Self { buckets: FxHashMap::default(), len: 0, capacity, default_lifetime }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records an Interest arriving on `ingress_connection`. A second
    /// Interest for the same name and restrictions extends the existing
    /// entry's expiry and adds to its ingress set instead of allocating a
    /// new one (spec.md §4.3 aggregation) — `compute_egress` (typically a
    /// FIB lookup) is only invoked when a genuinely new entry is created, so
    /// an aggregating Interest never re-consults the FIB.
    pub fn insert_interest<F>(
        &mut self,
        interest: &Interest,
        ingress_connection: u32,
        now: Instant,
        compute_egress: F,
    ) -> Result<(InsertOutcome, Vec<u32>), CapacityError>
    where F: FnOnce() -> Vec<u32> {
        if let Some(bucket) = self.buckets.get_mut(&interest.name)
            && let Some(entry) = bucket.iter_mut().find(|e| e.restrictions_match(interest))
        {
            let candidate_expiry = now + self.default_lifetime;
            if candidate_expiry > entry.expiry {
                entry.expiry = candidate_expiry;
            }
            if !entry.ingress.contains(&ingress_connection) {
                entry.ingress.push(ingress_connection);
            }
            return Ok((InsertOutcome::Aggregated, entry.egress.clone()));
        }

        let egress: Vec<u32> =
            compute_egress().into_iter().filter(|c| *c != ingress_connection).collect();
        if egress.is_empty() {
            return Ok((InsertOutcome::NoRoute, egress));
        }

        if self.len >= self.capacity {
            return Err(CapacityError::PitFull);
        }

        self.buckets.entry(interest.name.clone()).or_default().push(PitEntry {
            name: interest.name.clone(),
            key_id_restriction: interest.key_id_restriction.clone(),
            content_object_hash_restriction: interest.content_object_hash_restriction,
            ingress: vec![ingress_connection],
            egress: egress.clone(),
            expiry: now + self.default_lifetime,
        });
        self.len += 1;
        Ok((InsertOutcome::Created, egress))
    }

    /// Removes and returns every PIT entry satisfied by `co`, with their
    /// merged (deduplicated) ingress connection set as the reverse path to
    /// forward the Content Object down.
    pub fn consume(&mut self, co: &ContentObject) -> Vec<u32> {
        let Some(bucket) = self.buckets.get_mut(&co.name) else {
            return Vec::new();
        };

        let mut reverse_path = Vec::new();
        bucket.retain(|entry| {
            if entry.satisfied_by(co) {
                for cid in &entry.ingress {
                    if !reverse_path.contains(cid) {
                        reverse_path.push(*cid);
                    }
                }
                self.len -= 1;
                false
            } else {
                true
            }
        });
        if bucket.is_empty() {
            self.buckets.remove(&co.name);
        }
        reverse_path
    }

    /// Sweeps every entry whose expiry has passed. Returns the count removed
    /// so the caller can bump `pit_expirations` once per entry.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|e| e.expiry > now);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        self.len -= removed;
        removed
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
    fn aggregates_interests_for_same_name() {
        let mut pit = Pit::new(16, Duration::from_secs(2));
        let now = Instant::now();
        let i = Interest::new(name("foo"), 5);

        let (outcome, _) = pit.insert_interest(&i, 1, now, || vec![99]).unwrap();
        assert_eq!(outcome, InsertOutcome::Created);
        let (outcome, _) = pit.insert_interest(&i, 2, now, || panic!("must not re-lookup")).unwrap();
        assert_eq!(outcome, InsertOutcome::Aggregated);
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn new_entry_egress_excludes_ingress() {
        let mut pit = Pit::new(16, Duration::from_secs(2));
        let now = Instant::now();
        let i = Interest::new(name("foo"), 5);
        let (_, egress) = pit.insert_interest(&i, 1, now, || vec![1, 99]).unwrap();
        assert_eq!(egress, vec![99]);
    }

    #[test]
    fn content_object_satisfies_and_drains_entry() {
        let mut pit = Pit::new(16, Duration::from_secs(2));
        let now = Instant::now();
        let i = Interest::new(name("foo"), 5);
        pit.insert_interest(&i, 1, now, || vec![99]).unwrap();
        pit.insert_interest(&i, 2, now, || panic!("must not re-lookup")).unwrap();

        let co = ContentObject::new(name("foo"), Bytes::from_static(b"payload"));
        let reverse_path = pit.consume(&co);
        assert_eq!(reverse_path.len(), 2);
        assert!(reverse_path.contains(&1));
        assert!(reverse_path.contains(&2));
        assert!(pit.is_empty());
    }

    #[test]
    fn unsolicited_content_object_finds_nothing() {
        let mut pit = Pit::new(16, Duration::from_secs(2));
        let co = ContentObject::new(name("bar"), Bytes::from_static(b"x"));
        assert!(pit.consume(&co).is_empty());
    }

    #[test]
    fn expiry_sweep_removes_stale_entries() {
        let mut pit = Pit::new(16, Duration::from_millis(1));
        let now = Instant::now();
        let i = Interest::new(name("foo"), 5);
        pit.insert_interest(&i, 1, now, || vec![99]).unwrap();

        let later = now + Duration::from_secs(1);
        assert_eq!(pit.expire(later), 1);
        assert!(pit.is_empty());
    }

    #[test]
    fn capacity_is_enforced_for_new_names_not_aggregation() {
        let mut pit = Pit::new(1, Duration::from_secs(2));
        let now = Instant::now();
        pit.insert_interest(&Interest::new(name("a"), 5), 1, now, || vec![99]).unwrap();
        assert_eq!(
            pit.insert_interest(&Interest::new(name("b"), 5), 1, now, || vec![99]).unwrap_err(),
            CapacityError::PitFull
        );
        // Aggregating onto the existing entry still succeeds even at capacity.
        let (outcome, _) = pit
            .insert_interest(&Interest::new(name("a"), 5), 2, now, || panic!("must not re-lookup"))
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Aggregated);
    }

    #[test]
    fn no_route_leaves_the_pit_untouched() {
        let mut pit = Pit::new(16, Duration::from_secs(2));
        let now = Instant::now();
        let i = Interest::new(name("nowhere"), 5);
        let (outcome, egress) = pit.insert_interest(&i, 1, now, Vec::new).unwrap();
        assert_eq!(outcome, InsertOutcome::NoRoute);
        assert!(egress.is_empty());
        assert!(pit.is_empty());

        // A later Interest for the same name still gets a fresh lookup
        // rather than aggregating onto a dead entry.
        let (outcome, egress) = pit.insert_interest(&i, 2, now, || vec![7]).unwrap();
        assert_eq!(outcome, InsertOutcome::Created);
        assert_eq!(egress, vec![7]);
    }
}
