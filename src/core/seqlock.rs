//! Single-writer, multi-reader sequence lock
//!
//! The counter is even when stable and odd while a write is in progress.
//! Readers never mutate it: they capture an even token, read, then check
//! the token is unchanged and retry the whole read otherwise.
//!
//! Retries and spins are unbounded. A reader under sustained write
//! contention can in principle retry forever; the writer never blocks.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{fence, AtomicU64, Ordering};

/// Sequence lock guarding data that lives elsewhere
///
/// Exactly one thread may write at a time. Concurrent writers are not
/// detected in release builds.
#[derive(Debug, Default)]
pub struct SeqLock {
    seq: CachePadded<AtomicU64>,
}

impl SeqLock {
    /// Create new seqlock with sequence 0
    pub const fn new() -> Self {
        Self {
            seq: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Enter the write section (sequence becomes odd)
    ///
    /// Must be paired with exactly one `write_unlock`. Not reentrant.
    #[inline(always)]
    pub fn write_lock(&self) {
        let prev = self.seq.fetch_add(1, Ordering::Acquire);
        debug_assert!(prev & 1 == 0, "seqlock: write_lock during another write");
        // Guarded stores must not become visible before the odd sequence.
        fence(Ordering::Release);
    }

    /// Leave the write section (sequence becomes even), publishing the batch
    #[inline(always)]
    pub fn write_unlock(&self) {
        let prev = self.seq.fetch_add(1, Ordering::Release);
        debug_assert!(prev & 1 == 1, "seqlock: write_unlock without write_lock");
    }

    /// RAII write section; unlocks on drop
    #[inline(always)]
    pub fn write(&self) -> SeqLockWriteGuard<'_> {
        self.write_lock();
        SeqLockWriteGuard { lock: self }
    }

    /// Spin until no write is in progress and return the even sequence
    #[inline(always)]
    pub fn read_begin(&self) -> u64 {
        loop {
            let seq = self.seq.load(Ordering::Acquire);
            if seq & 1 == 0 {
                return seq;
            }
            std::hint::spin_loop();
        }
    }

    /// True if a write started or finished since `start_seq` was captured
    ///
    /// The acquire fence keeps every read made between `read_begin` and
    /// this call ordered before the final sequence load.
    #[inline(always)]
    pub fn read_retry(&self, start_seq: u64) -> bool {
        fence(Ordering::Acquire);
        self.seq.load(Ordering::Relaxed) != start_seq
    }

    /// Current raw sequence (diagnostics only)
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Number of completed write sections
    #[inline]
    pub fn writes_completed(&self) -> u64 {
        self.sequence() / 2
    }
}

/// Write section held for the lifetime of the guard
pub struct SeqLockWriteGuard<'a> {
    lock: &'a SeqLock,
}

impl Drop for SeqLockWriteGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}
