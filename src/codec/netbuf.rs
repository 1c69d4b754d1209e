// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A scatter-gather output vector ("netbuf") produced by the encoder.
//!
//! Encoding never assembles one monolithic copy: the fixed header, each TLV
//! length-prefix, and each body slice are pushed as independent, possibly
//! shared, [`Bytes`] segments. Callers that need a single contiguous buffer
//! (e.g. a transport that has no vectored-write support) fall back to
//! [`NetBuf::linearize`].

use bytes::{Bytes, BytesMut};

#[derive(Debug, Default, Clone)]
pub struct NetBuf {
    segments: Vec<Bytes>,
}

impl NetBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<Bytes>) {
        let segment = segment.into();
        if !segment.is_empty() {
            self.segments.push(segment);
        }
    }

    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    pub fn total_len(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    /// Vectored-write view: one `&[u8]` per segment.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(|b| b.as_ref())
    }

    /// Copies every segment into a single contiguous buffer. Only needed by
    /// transports without vectored writes; the common path sends
    /// `iter()` directly.
    pub fn linearize(&self) -> Bytes {
        if self.segments.len() == 1 {
            return self.segments[0].clone();
        }
        let mut out = BytesMut::with_capacity(self.total_len());
        for s in &self.segments {
            out.extend_from_slice(s);
        }
        out.freeze()
    }
}

impl FromIterator<Bytes> for NetBuf {
    fn from_iter<T: IntoIterator<Item = Bytes>>(iter: T) -> Self {
        let mut buf = NetBuf::new();
        for seg in iter {
            buf.push(seg);
        }
        buf
    }
}
