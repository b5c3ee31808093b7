//! ringtxn - Lock-Free SPSC Transactional Ring Buffer
//!
//! A single-producer single-consumer ring buffer that frames
//! variable-length, timestamped records in a circular byte arena. Appends
//! and pops are grouped into scoped *transactions*: a write transaction
//! publishes all of its bytes atomically on scope exit, a read transaction
//! reclaims a whole record likewise, and either side can abandon its work
//! with `invalidate()`.
//!
//! # Key Features
//!
//! - One acquire/release occupancy counter as the only cross-role
//!   synchronization on the hot path
//! - Commit-on-drop transaction handles (no half-published records, no
//!   leaked transaction slots)
//! - Typed appends/pops for any [`bytemuck::Pod`] value plus raw-byte and
//!   zero-copy split-slice access
//! - Owned or caller-borrowed arenas, capacity always a power of two
//!
//! # Example
//!
//! ```
//! use ringtxn::{push_all, RingBuffer};
//!
//! let mut buf = RingBuffer::<u64>::new();
//! buf.reserve(4096).unwrap();
//!
//! // Producer side
//! if let Some(mut tx) = buf.try_write(1) {
//!     assert_eq!(push_all!(tx, 0xABu8, 7u32), 2);
//!     tx.push_bytes(b"sample");
//! } // commits here
//!
//! // Consumer side
//! let mut rx = buf.try_read().unwrap();
//! assert_eq!(rx.timestamp(), 1);
//! assert_eq!(rx.pop_front::<u8>(), Some(0xAB));
//! assert_eq!(rx.pop_front::<u32>(), Some(7));
//! rx.pop_bytes(6, |chunk| assert_eq!(chunk, b"sample"));
//! ```
//!
//! # Roles
//!
//! Exactly three: an *owner* that installs the arena (`reserve`/`borrow`,
//! both `&mut self`) before sharing the buffer, then one *producer* thread
//! calling [`RingBuffer::try_write`] and one *consumer* thread calling
//! [`RingBuffer::try_read`]. A same-role `try_*` while a transaction is
//! live fails deterministically, so even a misbehaving caller cannot tear
//! records.

mod arena;
mod invariants;
mod metrics;
mod read;
mod ring;
mod write;

pub use bytemuck::Pod;
pub use metrics::MetricsSnapshot;
pub use read::ReadTransaction;
pub use ring::{RingBuffer, RingError};
pub use write::WriteTransaction;
