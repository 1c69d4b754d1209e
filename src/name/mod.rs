// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Structured, immutable names and their precomputed prefix-hash vectors.
//!
//! A name is an ordered sequence of labelled components. Component values
//! are shared (`Bytes`) rather than copied so that a name parsed out of an
//! inbound packet can be held by the PIT without re-allocating its bytes.

pub mod text;

use std::{fmt, hash::Hasher};

use bytes::Bytes;
use rustc_hash::FxHasher;
use thiserror::Error;

/// Names deeper than this are rejected by the codec (`PFX_COMP_LIMIT`).
pub const MAX_NAME_COMPONENTS: usize = 17;

/// Well-known label types; anything else is carried as an opaque `u16`.
pub const LABEL_NAME: u16 = 0;
pub const LABEL_CHUNK: u16 = 1;
pub const LABEL_VERSION: u16 = 2;
pub const LABEL_META: u16 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name exceeds the maximum of {MAX_NAME_COMPONENTS} components")]
    TooDeep,
}

/// A single labelled, opaque-valued segment of a [`Name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    pub label: u16,
    pub value: Bytes,
}

impl Component {
    pub fn new(label: u16, value: impl Into<Bytes>) -> Self {
        Self { label, value: value.into() }
    }
}

/// An immutable, ordered sequence of components.
///
/// Two names are equal iff they have the same length and every component
/// compares equal in both label and value bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn from_components(components: Vec<Component>) -> Result<Self, NameError> {
        if components.len() > MAX_NAME_COMPONENTS {
            return Err(NameError::TooDeep);
        }
        Ok(Self { components })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// `self` is a prefix of `other` iff `self.len() <= other.len()` and
    /// every component up to `self.len()` compares equal.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len()
            && self.components.iter().zip(other.components.iter()).all(|(a, b)| a == b)
    }

    /// The first `depth` components, as a borrowed view (no allocation).
    pub fn prefix(&self, depth: usize) -> &[Component] {
        &self.components[..depth.min(self.components.len())]
    }

    /// Precompute the `k+1`-length hash vector for every prefix depth
    /// `0..=len()`, where `h[0]` is the hash of the empty prefix.
    pub fn prefix_hashes(&self) -> PrefixHashes {
        let mut hashes = Vec::with_capacity(self.components.len() + 1);
        let mut hasher = FxHasher::default();
        hashes.push(hasher.finish());
        for c in &self.components {
            hasher.write_u16(c.label);
            hasher.write(&c.value);
            hashes.push(hasher.finish());
        }
        PrefixHashes { hashes }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        text::format(self, f)
    }
}

/// The precomputed per-depth hash vector of a [`Name`].
///
/// `hashes[i]` is the hash of the first `i` components (`hashes[0]` is the
/// hash of the empty prefix, used by a default FIB entry).
#[derive(Debug, Clone)]
pub struct PrefixHashes {
    hashes: Vec<u64>,
}

impl PrefixHashes {
    pub fn depth(&self) -> usize {
        self.hashes.len() - 1
    }

    pub fn at(&self, depth: usize) -> u64 {
        self.hashes[depth]
    }
}
