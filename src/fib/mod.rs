// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The Forwarding Information Base: a longest-prefix-match index over
//! structured names with virtual anchor nodes and refcounting.
//!
//! Grounded directly on the lookup/insert/delete algorithms of the original
//! CCNx FIB (`cicn_fib_lookup`, `cicn_fib_entry_insert`,
//! `cicn_fib_entry_delete`), translated from its open-addressed hash table
//! into per-depth hash buckets so the precomputed [`crate::name::PrefixHashes`]
//! of a query name drives every probe without rehashing.

use rustc_hash::FxHashMap;

use crate::{
    error::{CapacityError, ForwarderError},
    name::{MAX_NAME_COMPONENTS, Name},
};

pub const NHOP_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub connection_id: u32,
    pub weight: u32,
}

#[derive(Debug, Clone)]
pub struct FibEntry {
    pub prefix: Name,
    pub next_hops: Vec<NextHop>,
    pub virtual_: bool,
    pub refcount: u32,
    pub max_components: usize,
}

impl FibEntry {
    fn new_virtual(prefix: Name) -> Self {
        let depth = prefix.len();
        Self { prefix, next_hops: Vec::new(), virtual_: true, refcount: 1, max_components: depth }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Updated,
}

/// Returned by [`Fib::insert`]/[`Fib::remove`] when the call is a pure
/// capacity/identity error rather than a success.
pub type FibResult<T> = Result<T, ForwarderError>;

#[derive(Debug, Default)]
pub struct Fib {
    buckets: FxHashMap<u64, Vec<FibEntry>>,
    default_entry: Option<FibEntry>,
    len: usize,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_default(&mut self, connection_id: u32, weight: u32) {
        let entry = self.default_entry.get_or_insert_with(|| FibEntry {
            prefix: Name::from_components(Vec::new()).expect("empty name is valid"),
            next_hops: Vec::new(),
            virtual_: false,
            refcount: 1,
            max_components: 0,
        });
        entry.virtual_ = false;
        if let Some(nh) = entry.next_hops.iter_mut().find(|n| n.connection_id == connection_id) {
            nh.weight = weight;
        } else {
            entry.next_hops.push(NextHop { connection_id, weight });
        }
    }

    fn bucket_find<'a>(
        buckets: &'a FxHashMap<u64, Vec<FibEntry>>,
        hash: u64,
        prefix: &Name,
    ) -> Option<&'a FibEntry> {
        buckets.get(&hash)?.iter().find(|e| &e.prefix == prefix)
    }

    fn bucket_find_mut<'a>(
        buckets: &'a mut FxHashMap<u64, Vec<FibEntry>>,
        hash: u64,
        prefix: &Name,
    ) -> Option<&'a mut FibEntry> {
        buckets.get_mut(&hash)?.iter_mut().find(|e| &e.prefix == prefix)
    }

    /// Longest-prefix-match lookup (spec.md §4.2 algorithm).
    pub fn lookup(&self, name: &Name) -> Option<&FibEntry> {
        let hashes = name.prefix_hashes();
        let mut result = self.default_entry.as_ref();

        for depth in 1..=name.len() {
            let prefix = prefix_name(name, depth);
            let probe = Self::bucket_find(&self.buckets, hashes.at(depth), &prefix);
            match probe {
                Some(entry) if !entry.virtual_ => result = Some(entry),
                Some(_virtual_entry) => {},
                None => break,
            }
        }
        result
    }

    /// Adds (or updates the weight of) a next-hop on the entry anchored at
    /// `prefix`, creating virtual ancestors as needed. Rolls back any
    /// virtual node created during this call if next-hop attachment fails
    /// with [`CapacityError::NhopLimit`] (spec.md §9's atomic-insert
    /// resolution).
    pub fn insert(
        &mut self,
        prefix: &Name,
        connection_id: u32,
        weight: u32,
    ) -> FibResult<InsertOutcome> {
        if prefix.len() > MAX_NAME_COMPONENTS {
            return Err(CapacityError::PfxCompLimit.into());
        }
        if prefix.is_empty() {
            self.set_default(connection_id, weight);
            return Ok(InsertOutcome::Inserted);
        }

        let hashes = prefix.prefix_hashes();
        let mut newly_created_depths = Vec::new();

        for depth in 1..=prefix.len() {
            let key = prefix_name(prefix, depth);
            let hash = hashes.at(depth);
            if Self::bucket_find(&self.buckets, hash, &key).is_none() {
                self.buckets.entry(hash).or_default().push(FibEntry::new_virtual(key));
                newly_created_depths.push(depth);
                self.len += 1;
            }
        }

        let target_hash = hashes.at(prefix.len());
        let target = Self::bucket_find_mut(&mut self.buckets, target_hash, prefix)
            .expect("just ensured present");
        let was_virtual = target.virtual_;
        target.virtual_ = false;
        target.max_components = target.max_components.max(prefix.len());

        let outcome = if let Some(nh) =
            target.next_hops.iter_mut().find(|n| n.connection_id == connection_id)
        {
            if nh.weight == weight && !was_virtual {
                self.rollback(&newly_created_depths, &hashes, prefix);
                return Err(ForwarderError::AlreadyExists);
            }
            nh.weight = weight;
            InsertOutcome::Updated
        } else if target.next_hops.len() < NHOP_CAPACITY {
            target.next_hops.push(NextHop { connection_id, weight });
            InsertOutcome::Inserted
        } else {
            self.rollback(&newly_created_depths, &hashes, prefix);
            return Err(CapacityError::NhopLimit.into());
        };

        for depth in (1..prefix.len()).rev() {
            let key = prefix_name(prefix, depth);
            let hash = hashes.at(depth);
            let child_is_new = newly_created_depths.contains(&(depth + 1));
            if let Some(ancestor) = Self::bucket_find_mut(&mut self.buckets, hash, &key) {
                if child_is_new {
                    ancestor.refcount += 1;
                }
                ancestor.max_components = ancestor.max_components.max(prefix.len());
            }
        }

        Ok(outcome)
    }

    /// Reverses the virtual nodes created by a failed `insert()` call so a
    /// rejected insertion never leaves orphan anchors.
    fn rollback(&mut self, newly_created_depths: &[usize], hashes: &crate::name::PrefixHashes, prefix: &Name) {
        for &depth in newly_created_depths {
            let key = prefix_name(prefix, depth);
            let hash = hashes.at(depth);
            if let Some(bucket) = self.buckets.get_mut(&hash) {
                bucket.retain(|e| e.prefix != key);
                self.len -= 1;
            }
        }
    }

    /// Removes a next-hop (or every next-hop if `connection_id` is `None`)
    /// from the entry anchored at `prefix`, garbage-collecting virtual
    /// ancestors that become unreferenced (spec.md §4.2 algorithm).
    pub fn remove(&mut self, prefix: &Name, connection_id: Option<u32>) -> FibResult<()> {
        if prefix.is_empty() {
            if let Some(entry) = &mut self.default_entry {
                match connection_id {
                    Some(cid) => entry.next_hops.retain(|n| n.connection_id != cid),
                    None => entry.next_hops.clear(),
                }
                return Ok(());
            }
            return Err(ForwarderError::NotFound);
        }

        let hashes = prefix.prefix_hashes();
        let target_hash = hashes.at(prefix.len());
        let target = Self::bucket_find_mut(&mut self.buckets, target_hash, prefix)
            .ok_or(ForwarderError::NotFound)?;

        match connection_id {
            Some(cid) => {
                let before = target.next_hops.len();
                target.next_hops.retain(|n| n.connection_id != cid);
                if target.next_hops.len() == before {
                    return Err(ForwarderError::NotFound);
                }
                if !target.next_hops.is_empty() {
                    return Ok(());
                }
            },
            None => target.next_hops.clear(),
        }

        if target.refcount > 1 {
            target.virtual_ = true;
            return Ok(());
        }

        // No descendants: delete the entry entirely and walk ancestors.
        if let Some(bucket) = self.buckets.get_mut(&target_hash) {
            bucket.retain(|e| &e.prefix != prefix);
            self.len -= 1;
        }

        let mut removed_count = 1u32;
        for depth in (1..prefix.len()).rev() {
            let key = prefix_name(prefix, depth);
            let hash = hashes.at(depth);
            let Some(ancestor) = Self::bucket_find_mut(&mut self.buckets, hash, &key) else {
                continue;
            };
            ancestor.refcount = ancestor.refcount.saturating_sub(removed_count);
            if ancestor.virtual_ && ancestor.refcount <= 1 {
                if let Some(bucket) = self.buckets.get_mut(&hash) {
                    bucket.retain(|e| e.prefix != key);
                    self.len -= 1;
                }
                removed_count += 1;
            }
        }

        Ok(())
    }

    /// Removes every next-hop bound to `connection_id` across the whole
    /// table, used to react to a closed connection (spec.md §7 implicit
    /// route withdrawal). Returns the prefixes whose only next-hop was this
    /// connection.
    pub fn withdraw_connection(&mut self, connection_id: u32) -> Vec<Name> {
        let mut withdrawn = Vec::new();
        let prefixes: Vec<Name> = self
            .buckets
            .values()
            .flatten()
            .filter(|e| !e.virtual_ && e.next_hops.iter().any(|n| n.connection_id == connection_id))
            .map(|e| e.prefix.clone())
            .collect();
        for prefix in prefixes {
            let had_other = self
                .lookup_exact(&prefix)
                .map(|e| e.next_hops.len() > 1)
                .unwrap_or(false);
            if self.remove(&prefix, Some(connection_id)).is_ok() && !had_other {
                withdrawn.push(prefix);
            }
        }
        withdrawn
    }

    fn lookup_exact(&self, prefix: &Name) -> Option<&FibEntry> {
        if prefix.is_empty() {
            return self.default_entry.as_ref();
        }
        let hashes = prefix.prefix_hashes();
        Self::bucket_find(&self.buckets, hashes.at(prefix.len()), prefix)
    }
}

fn prefix_name(name: &Name, depth: usize) -> Name {
    Name::from_components(name.prefix(depth).to_vec()).expect("depth bounded by caller")
}
