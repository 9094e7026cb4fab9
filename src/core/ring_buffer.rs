//! Lock-free SPSC ring buffer
//!
//! Fixed array of `capacity + 1` slots with a producer index (`head`) and a
//! consumer index (`tail`). The spare slot tells full from empty, so no
//! shared counter is touched on the hot path.
//!
//! The queue is handed out as a `Producer` / `Consumer` pair. Neither end
//! is `Clone` and both operations take `&mut self`, so single-producer and
//! single-consumer use is enforced by ownership.

use crate::{Result, XsError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared slot storage and indices
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// Next slot the producer writes
    head: CachePadded<AtomicUsize>,
    /// Next slot the consumer reads
    tail: CachePadded<AtomicUsize>,
}

// Slots are only touched through the unique Producer/Consumer handles, and
// the head/tail release-acquire pairs hand each slot over between them.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T: Copy + Default> RingBuffer<T> {
    /// Allocate a queue holding up to `capacity` items and split it
    ///
    /// # Errors
    /// Returns `InvalidCapacity` for a zero capacity, which could never
    /// accept an item.
    pub fn with_capacity(capacity: usize) -> Result<(Producer<T>, Consumer<T>)> {
        if capacity == 0 || capacity == usize::MAX {
            return Err(XsError::InvalidCapacity {
                component: "ring buffer",
                capacity,
            });
        }

        let slots = (0..capacity + 1).map(|_| UnsafeCell::new(T::default())).collect();
        let shared = Arc::new(Self {
            slots,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        });

        Ok((
            Producer {
                ring: Arc::clone(&shared),
            },
            Consumer { ring: shared },
        ))
    }
}

impl<T> RingBuffer<T> {
    /// Maximum number of queued items
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Approximate number of queued items
    ///
    /// Relaxed loads: good for telemetry, not for correctness decisions.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        if head >= tail {
            head - tail
        } else {
            self.slots.len() - tail + head
        }
    }

    /// Approximate emptiness check
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Relaxed)
    }

    /// Approximate fullness check
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline(always)]
    fn next_index(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.slots.len() {
            0
        } else {
            next
        }
    }
}

impl<T: Copy> RingBuffer<T> {
    /// Caller must be the unique producer
    #[inline(always)]
    fn push(&self, item: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = self.next_index(head);

        if next_head == tail {
            return false;
        }

        // The consumer released this slot before publishing `tail` past it.
        unsafe {
            *self.slots[head].get() = item;
        }
        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Caller must be the unique consumer
    #[inline(always)]
    fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        // The producer finished writing this slot before publishing `head`.
        let item = unsafe { *self.slots[tail].get() };
        self.tail.store(self.next_index(tail), Ordering::Release);
        Some(item)
    }
}

/// Writing end of the queue
pub struct Producer<T> {
    ring: Arc<RingBuffer<T>>,
}

impl<T: Copy> Producer<T> {
    /// Offer an item; returns false (item rejected) when the queue is full
    #[inline(always)]
    pub fn push(&mut self, item: T) -> bool {
        self.ring.push(item)
    }
}

impl<T> Producer<T> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Read-only telemetry handle
    pub fn gauge(&self) -> QueueGauge<T> {
        QueueGauge {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Reading end of the queue
pub struct Consumer<T> {
    ring: Arc<RingBuffer<T>>,
}

impl<T: Copy> Consumer<T> {
    /// Take the oldest item, or `None` when the queue is empty
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        self.ring.pop()
    }
}

impl<T> Consumer<T> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Read-only telemetry handle
    pub fn gauge(&self) -> QueueGauge<T> {
        QueueGauge {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Depth/capacity probe usable from any thread
pub struct QueueGauge<T> {
    ring: Arc<RingBuffer<T>>,
}

impl<T> Clone for QueueGauge<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T> QueueGauge<T> {
    /// Approximate current depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}
