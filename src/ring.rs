// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A lock-free single-producer/single-consumer bounded ring, the sole
//! synchronization point between a listener thread and the dispatcher
//! (spec.md §5). `capacity` must be a power of two; the ring holds at most
//! `capacity - 1` items — one slot is always left empty so that
//! `writer_head == reader_tail` unambiguously means "empty".

use std::{
    cell::UnsafeCell,
    sync::atomic::{AtomicUsize, Ordering},
};

pub struct SpscRing<T> {
    buffer: Box<[UnsafeCell<Option<T>>]>,
    mask: usize,
    writer_head: AtomicUsize,
    reader_tail: AtomicUsize,
}

// Safety: `try_push` is only ever called by the single producer and
// `try_pop` only by the single consumer; the atomics establish the
// happens-before edges needed for each side to observe the other's writes
// to the shared slot it is about to touch.
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T> SpscRing<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two() && capacity > 0, "capacity must be a power of 2");
        let buffer: Vec<UnsafeCell<Option<T>>> =
            (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        Self {
            buffer: buffer.into_boxed_slice(),
            mask: capacity - 1,
            writer_head: AtomicUsize::new(0),
            reader_tail: AtomicUsize::new(0),
        }
    }

    /// Producer-only. Returns the value back on a full ring.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let head = self.writer_head.load(Ordering::Relaxed);
        let tail = self.reader_tail.load(Ordering::Acquire);
        let next = head.wrapping_add(1) & self.mask;

        if next == tail {
            return Err(value);
        }

        // Safety: slot `head` is only reachable by the consumer once we
        // publish `next` below, so we have exclusive access to it now.
        unsafe {
            *self.buffer[head].get() = Some(value);
        }
        self.writer_head.store(next, Ordering::Release);
        Ok(())
    }

    /// Consumer-only.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.reader_tail.load(Ordering::Relaxed);
        let head = self.writer_head.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let next = tail.wrapping_add(1) & self.mask;
        // Safety: slot `tail` was published by the producer (head has moved
        // past it) and no other consumer can race us for it.
        let value = unsafe { (*self.buffer[tail].get()).take() };
        self.reader_tail.store(next, Ordering::Release);
        value
    }

    /// Upper bound on the number of items currently queued (may be stale by
    /// the time the caller acts on it if called from neither thread).
    pub fn remaining(&self) -> usize {
        let head = self.writer_head.load(Ordering::Acquire);
        let tail = self.reader_tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }

    pub fn capacity(&self) -> usize {
        self.mask
    }
}
