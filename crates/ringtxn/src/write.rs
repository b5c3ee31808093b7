use std::mem;

use bytemuck::Pod;

use crate::invariants::debug_assert_tx_live;
use crate::ring::RingBuffer;

/// Scoped producer handle: appends build one record, published atomically
/// at scope exit.
///
/// Obtained from [`RingBuffer::try_write`]. The record's timestamp is in
/// the arena from the start; the 4-byte length prefix is written last, at
/// commit, so the consumer can never observe a half-built record.
///
/// The transaction commits when it goes out of scope (or on an explicit
/// [`commit`](Self::commit)) unless [`invalidate`](Self::invalidate) was
/// called first, in which case every appended byte is abandoned.
///
/// Not `Clone`/`Copy`: a second handle could double-publish. Moving is
/// fine; the moved-from binding is gone.
pub struct WriteTransaction<'a, T: Pod> {
    ring: &'a RingBuffer<T>,
    timestamp: T,
    /// Declared record length so far, header included.
    record_len: u32,
    /// Arena offset of the next append, wrap-masked.
    index: u32,
    /// Bytes appendable under the last occupancy observation.
    available: u32,
    valid: bool,
}

impl<'a, T: Pod> WriteTransaction<'a, T> {
    pub(crate) fn open(ring: &'a RingBuffer<T>, timestamp: T, end: u32, free: u32) -> Self {
        Self {
            ring,
            timestamp,
            record_len: RingBuffer::<T>::HEADER_BYTES,
            index: ring.index_of(end + RingBuffer::<T>::HEADER_BYTES),
            available: free - RingBuffer::<T>::HEADER_BYTES,
            valid: true,
        }
    }

    /// Whether the transaction will publish at scope exit.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Payload bytes appended so far (header excluded).
    #[inline]
    pub fn size(&self) -> u32 {
        debug_assert_tx_live!(self.valid);
        self.record_len - RingBuffer::<T>::HEADER_BYTES
    }

    /// The timestamp this record was opened with.
    #[inline]
    pub fn timestamp(&self) -> T {
        debug_assert_tx_live!(self.valid);
        self.timestamp
    }

    /// Appends one fixed-width value. Returns `false`, with no partial
    /// write, when the transaction is invalid or the value does not fit.
    pub fn push_back<P: Pod>(&mut self, value: P) -> bool {
        let n = mem::size_of::<P>() as u32;
        if !self.ensure_room(n) {
            return false;
        }
        // SAFETY: ensure_room claimed [index, index + n) as write space.
        unsafe { self.ring.arena().write_value(self.index, value) };
        self.advance(n);
        true
    }

    /// Appends raw bytes. Same failure contract as
    /// [`push_back`](Self::push_back).
    pub fn push_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > u32::MAX as usize {
            return false;
        }
        let n = bytes.len() as u32;
        if !self.ensure_room(n) {
            return false;
        }
        // SAFETY: ensure_room claimed [index, index + n) as write space.
        unsafe { self.ring.arena().write_bytes(self.index, bytes) };
        self.advance(n);
        true
    }

    /// Abandons the record. Nothing publishes at scope exit; the bytes
    /// already in the arena become garbage for the next write to overwrite.
    pub fn invalidate(&mut self) {
        if self.valid {
            self.valid = false;
            self.ring.abort_write();
        }
    }

    /// Publishes the record now instead of at scope exit.
    pub fn commit(self) {
        // Drop performs the publish.
        drop(self);
    }

    /// Checks `n` bytes of append room, re-syncing the cached availability
    /// against the occupancy counter once; the consumer may have drained
    /// records since the last observation.
    fn ensure_room(&mut self, n: u32) -> bool {
        if !self.valid {
            return false;
        }
        if self.available >= n {
            return true;
        }
        let free = self.ring.capacity() - self.ring.occupancy();
        self.available = free - self.record_len;
        self.available >= n
    }

    #[inline]
    fn advance(&mut self, n: u32) {
        self.index = self.ring.index_of(self.index + n);
        self.available -= n;
        self.record_len += n;
    }
}

impl<T: Pod> Drop for WriteTransaction<'_, T> {
    fn drop(&mut self) {
        if self.valid {
            self.valid = false;
            self.ring.finish_write(self.record_len);
        }
    }
}

/// Appends each value to a [`WriteTransaction`] in order, stopping at the
/// first failure. Expands to the number of values appended.
///
/// A failed append leaves the transaction valid; smaller appends (or a
/// commit of what fit) may still follow.
///
/// ```
/// use ringtxn::{push_all, RingBuffer};
///
/// let mut buf = RingBuffer::<u64>::new();
/// buf.reserve(64).unwrap();
/// let mut tx = buf.try_write(0).unwrap();
/// assert_eq!(push_all!(tx, 1u32, 2u16, 3u8), 3);
/// ```
#[macro_export]
macro_rules! push_all {
    ($tx:expr $(, $value:expr)+ $(,)?) => {{
        let tx = &mut $tx;
        let mut appended = 0usize;
        let mut open = true;
        $(
            if open {
                if tx.push_back($value) {
                    appended += 1;
                } else {
                    open = false;
                }
            }
        )+
        let _ = open;
        appended
    }};
}
