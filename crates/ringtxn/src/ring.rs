use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use bytemuck::Pod;
use crossbeam_utils::CachePadded;
use thiserror::Error;

use crate::arena::Arena;
use crate::invariants::{debug_assert_bounded_size, debug_assert_record_len};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::read::ReadTransaction;
use crate::write::WriteTransaction;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This SPSC buffer frames variable-length records in a byte arena and
// publishes them through a single occupancy counter:
//
// ## Occupancy Counter (`size`)
//
// `size` is the number of committed-but-unconsumed bytes. It is the only
// cross-role synchronization point on the hot path:
//
// **Producer (write commit):**
// 1. Write payload and timestamp into unclaimed arena bytes (no ordering)
// 2. Write the 4-byte record length at `end` (no ordering)
// 3. `size.fetch_add(record_len, Release)`: publishes every prior write
//
// **Consumer (`try_read` / re-sync):**
// 1. `size.load(Acquire)`: pairs with the producer's Release increment;
//    once a record's length is covered by the observed occupancy, all of
//    its bytes are visible
// 2. Read header and payload from the arena (no ordering)
// 3. `size.fetch_sub(record_len, Release)` at commit: publishes the drain
//    so the producer's Acquire load of `size` licenses overwriting
//
// ## Single-Writer Cursors
//
// `end` is read and written only while holding the producer slot, `start`
// only while holding the consumer slot. Both live in `UnsafeCell` without
// atomics. The slot flags (`writing`, `reading`) are acquired with
// `swap(true, Acquire)` and released with `store(false, Release)`, which
// both makes a second same-role `try_*` fail deterministically and carries
// the cursor hand-off edge when a role migrates between threads.
//
// ## Field Layout
//
// Producer-hot, consumer-hot, and shared state are split into
// `CachePadded` groups so the two roles do not false-share cache lines.
//
// =============================================================================

/// Configuration errors for [`RingBuffer::reserve`] and
/// [`RingBuffer::borrow`]. The buffer state is unchanged on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// `reserve` on a buffer that borrowed its arena.
    #[error("arena is borrowed; reserve would reallocate caller memory")]
    BorrowedMode,
    /// `borrow` on a buffer that already installed an arena.
    #[error("an arena is already installed")]
    AlreadyInstalled,
    /// `borrow` with a null region pointer.
    #[error("borrowed region pointer is null")]
    NullRegion,
    /// `borrow` with a region smaller than one record header.
    #[error("capacity {got} is below the minimum {min}")]
    BelowMinimum {
        /// The capacity the caller offered.
        got: u32,
        /// The smallest legal capacity for this timestamp type.
        min: u32,
    },
    /// `borrow` with a non-power-of-two region length.
    #[error("capacity {0} is not a power of two")]
    NotPowerOfTwo(u32),
    /// `reserve` request too large for the cursor space.
    #[error("requested capacity overflows the cursor space")]
    CapacityOverflow,
}

/// Producer-owned state: write cursor plus the write-transaction slot.
struct ProducerSide {
    /// Next record's byte offset, wrap-masked. Touched only while `writing`
    /// is held.
    cursor: UnsafeCell<u32>,
    writing: AtomicBool,
}

/// Consumer-owned state, mirror of [`ProducerSide`].
struct ConsumerSide {
    cursor: UnsafeCell<u32>,
    reading: AtomicBool,
}

/// Lock-free SPSC transactional ring buffer over timestamped,
/// variable-length records.
///
/// `T` is the timestamp type stored in every record header; any
/// [`Pod`] type works (`f32`, `u64`, a `#[repr(C)]` tick struct, ...).
///
/// A buffer starts without an arena. The owner installs one with
/// [`reserve`](Self::reserve) (heap-owned) or [`borrow`](Self::borrow)
/// (caller-provided) before sharing the buffer with the two role threads;
/// both take `&mut self`, so configuration cannot race with live roles.
///
/// # Example
///
/// ```
/// use ringtxn::RingBuffer;
///
/// let mut buf = RingBuffer::<u64>::new();
/// buf.reserve(1024).unwrap();
///
/// if let Some(mut tx) = buf.try_write(7) {
///     tx.push_back(42u32);
///     tx.push_bytes(b"payload");
/// } // commits on scope exit
///
/// let mut tx = buf.try_read().unwrap();
/// assert_eq!(tx.timestamp(), 7);
/// assert_eq!(tx.pop_front::<u32>(), Some(42));
/// ```
pub struct RingBuffer<T> {
    producer: CachePadded<ProducerSide>,
    consumer: CachePadded<ConsumerSide>,
    /// Committed-but-unconsumed bytes. The publication fence (see the
    /// strategy block above).
    size: CachePadded<AtomicU32>,
    arena: Arena,
    metrics: Metrics,
    metrics_enabled: bool,
    _timestamp: PhantomData<T>,
}

// SAFETY: role discipline partitions all non-atomic state. The cursors are
// guarded by their slot flags, arena bytes by the occupancy protocol, and
// the borrowed-arena pointer by the `borrow` contract.
unsafe impl<T: Pod + Send> Send for RingBuffer<T> {}
unsafe impl<T: Pod + Send> Sync for RingBuffer<T> {}

impl<T: Pod> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> RingBuffer<T> {
    /// Bytes of one serialized record header: 4-byte length prefix plus the
    /// timestamp.
    pub const HEADER_BYTES: u32 = (mem::size_of::<u32>() + mem::size_of::<T>()) as u32;

    /// Byte offset of the timestamp slot inside a header.
    pub(crate) const TIMESTAMP_OFFSET: u32 = mem::size_of::<u32>() as u32;

    /// Creates a buffer in its neutral state, with no arena installed.
    pub fn new() -> Self {
        Self {
            producer: CachePadded::new(ProducerSide {
                cursor: UnsafeCell::new(0),
                writing: AtomicBool::new(false),
            }),
            consumer: CachePadded::new(ConsumerSide {
                cursor: UnsafeCell::new(0),
                reading: AtomicBool::new(false),
            }),
            size: CachePadded::new(AtomicU32::new(0)),
            arena: Arena::new(),
            metrics: Metrics::new(),
            metrics_enabled: false,
            _timestamp: PhantomData,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Smallest legal arena capacity: one record header.
    #[inline]
    pub const fn min_capacity() -> u32 {
        Self::HEADER_BYTES
    }

    /// Logical arena capacity in bytes, 0 before an arena is installed.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.arena.capacity()
    }

    /// Whether an arena is installed and transactions may start.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.arena.is_set()
    }

    /// Committed-but-unconsumed bytes. Diagnostic: exact only on the role
    /// threads themselves or on a quiesced buffer.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size.load(Ordering::Relaxed)
    }

    /// Consumer-side check for pending records. Pairs with the producer's
    /// Release commit, so a `true` here means `try_read` will see a record.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.size.load(Ordering::Acquire) > 0
    }

    /// Snapshot of the commit counters; all-zero unless metrics were
    /// enabled before the roles started.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.metrics_enabled {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    /// Enables or disables commit counting. Owner-phase only.
    pub fn set_metrics_enabled(&mut self, enabled: bool) {
        self.metrics_enabled = enabled;
    }

    #[inline]
    pub(crate) fn index_of(&self, offset: u32) -> u32 {
        offset & self.arena.mask()
    }

    #[inline]
    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Acquire-load of the occupancy counter, for write-side free-space
    /// re-sync.
    #[inline]
    pub(crate) fn occupancy(&self) -> u32 {
        self.size.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // OWNER API: arena installation
    // ---------------------------------------------------------------------

    /// Installs (or re-installs) an owned arena of at least `n` bytes.
    ///
    /// `max(n, min_capacity())` is rounded up to the next power of two.
    /// When the rounded capacity fits the existing allocation it is reused
    /// with a truncated logical capacity; otherwise the arena reallocates.
    /// Cursors and occupancy reset either way.
    ///
    /// Fails with [`RingError::BorrowedMode`] once the buffer has borrowed
    /// its arena.
    pub fn reserve(&mut self, n: u32) -> Result<(), RingError> {
        if self.arena.is_borrowed() {
            return Err(RingError::BorrowedMode);
        }
        let capacity = n
            .max(Self::min_capacity())
            .checked_next_power_of_two()
            .ok_or(RingError::CapacityOverflow)?;
        if capacity as usize <= self.arena.owned_len() {
            self.arena.truncate(capacity);
        } else {
            self.arena.allocate(capacity);
        }
        self.reset_cursors();
        Ok(())
    }

    /// Installs a caller-provided arena of exactly `n` bytes.
    ///
    /// `n` must be a power of two no smaller than
    /// [`min_capacity`](Self::min_capacity), and `region` non-null. A
    /// successful borrow is irreversible: later `reserve` calls fail. A
    /// *failed* borrow leaves the buffer free to enter owned mode instead.
    ///
    /// # Safety
    ///
    /// `region` must point to `n` writable bytes that outlive the buffer
    /// and are accessed through no other path while the buffer lives.
    pub unsafe fn borrow(&mut self, region: *mut u8, n: u32) -> Result<(), RingError> {
        if region.is_null() {
            return Err(RingError::NullRegion);
        }
        if n < Self::min_capacity() {
            return Err(RingError::BelowMinimum {
                got: n,
                min: Self::min_capacity(),
            });
        }
        if !n.is_power_of_two() {
            return Err(RingError::NotPowerOfTwo(n));
        }
        if self.arena.is_set() {
            return Err(RingError::AlreadyInstalled);
        }
        // SAFETY: forwarded caller contract.
        unsafe { self.arena.install_borrowed(region, n) };
        self.reset_cursors();
        Ok(())
    }

    fn reset_cursors(&mut self) {
        *self.producer.cursor.get_mut() = 0;
        *self.consumer.cursor.get_mut() = 0;
        *self.size.get_mut() = 0;
        *self.producer.writing.get_mut() = false;
        *self.consumer.reading.get_mut() = false;
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Opens a write transaction stamped with `timestamp`.
    ///
    /// Returns `None` when the buffer has no arena, a write transaction is
    /// already live, or fewer than [`HEADER_BYTES`](Self::HEADER_BYTES)
    /// free bytes remain. The timestamp lands in the arena immediately; the
    /// length prefix is deferred to commit.
    pub fn try_write(&self, timestamp: T) -> Option<WriteTransaction<'_, T>> {
        if !self.arena.is_set() {
            return None;
        }
        if self.producer.writing.swap(true, Ordering::Acquire) {
            return None;
        }
        let free = self.capacity() - self.size.load(Ordering::Acquire);
        if free < Self::HEADER_BYTES {
            if self.metrics_enabled {
                self.metrics.add_write_rejected();
            }
            self.producer.writing.store(false, Ordering::Release);
            return None;
        }
        // SAFETY: we hold the producer slot, so the cursor is ours.
        let end = unsafe { *self.producer.cursor.get() };
        // SAFETY: [end, end + HEADER_BYTES) is unclaimed write space; the
        // free check above covers it.
        unsafe {
            self.arena
                .write_value(self.index_of(end + Self::TIMESTAMP_OFFSET), timestamp);
        }
        Some(WriteTransaction::open(self, timestamp, end, free))
    }

    /// Publishes the current write transaction: length prefix at `end`,
    /// cursor advance, Release increment of the occupancy.
    pub(crate) fn finish_write(&self, record_len: u32) {
        debug_assert_record_len!(record_len, Self::HEADER_BYTES);
        // SAFETY: still holding the producer slot.
        let end = unsafe { *self.producer.cursor.get() };
        // SAFETY: the length slot was reserved by try_write.
        unsafe { self.arena.write_value::<u32>(end, record_len) };
        unsafe { *self.producer.cursor.get() = self.index_of(end + record_len) };
        let occupied = self.size.fetch_add(record_len, Ordering::Release) + record_len;
        debug_assert_bounded_size!(occupied, self.capacity());
        self.producer.writing.store(false, Ordering::Release);
        if self.metrics_enabled {
            self.metrics.add_committed(u64::from(record_len));
        }
    }

    /// Abandons the current write transaction without publishing.
    pub(crate) fn abort_write(&self) {
        self.producer.writing.store(false, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Opens a read transaction on the oldest unconsumed record.
    ///
    /// Returns `None` when the buffer has no arena, a read transaction is
    /// already live, or no record is pending. The header is copied out on
    /// creation.
    pub fn try_read(&self) -> Option<ReadTransaction<'_, T>> {
        if !self.arena.is_set() {
            return None;
        }
        if self.consumer.reading.swap(true, Ordering::Acquire) {
            return None;
        }
        if self.size.load(Ordering::Acquire) == 0 {
            self.consumer.reading.store(false, Ordering::Release);
            return None;
        }
        // SAFETY: we hold the consumer slot, so the cursor is ours.
        let start = unsafe { *self.consumer.cursor.get() };
        // SAFETY: the Acquire load above covers the record at `start`; its
        // header bytes are published.
        let record_len: u32 = unsafe { self.arena.read_value(start) };
        let timestamp: T = unsafe {
            self.arena
                .read_value(self.index_of(start + Self::TIMESTAMP_OFFSET))
        };
        Some(ReadTransaction::open(self, timestamp, start, record_len))
    }

    /// Reclaims the record under the current read transaction: cursor
    /// advance, Release decrement of the occupancy.
    pub(crate) fn finish_read(&self, record_len: u32) {
        // SAFETY: still holding the consumer slot.
        let start = unsafe { *self.consumer.cursor.get() };
        unsafe { *self.consumer.cursor.get() = self.index_of(start + record_len) };
        let occupied = self.size.fetch_sub(record_len, Ordering::Release);
        debug_assert_bounded_size!(occupied, self.capacity());
        debug_assert!(occupied >= record_len, "drained more than was occupied");
        self.consumer.reading.store(false, Ordering::Release);
        if self.metrics_enabled {
            self.metrics.add_consumed(u64::from(record_len));
        }
    }

    /// Abandons the current read transaction; the record stays pending.
    pub(crate) fn abort_read(&self) {
        self.consumer.reading.store(false, Ordering::Release);
    }
}
