//! Debug assertion macros for ring buffer invariants.
//!
//! Active in debug builds only (`debug_assert!`), so there is zero overhead
//! in release builds. Release builds surface every failure as a sentinel
//! return instead; these macros catch protocol violations earlier during
//! development.

/// Assert that a capacity is a non-zero power of two.
///
/// **Invariant**: `capacity.is_power_of_two()`
///
/// Used in: `Arena::allocate`, `Arena::truncate`, `Arena::install_borrowed`
macro_rules! debug_assert_pow2 {
    ($capacity:expr) => {
        debug_assert!(
            $capacity.is_power_of_two(),
            "capacity {} is not a power of two",
            $capacity
        )
    };
}

/// Assert that a cursor lies inside the arena.
///
/// **Invariant**: `cursor < capacity` (cursors are stored wrap-masked)
///
/// Used in: `Arena` byte primitives, `RingBuffer` commit paths
macro_rules! debug_assert_in_arena {
    ($cursor:expr, $capacity:expr) => {
        debug_assert!(
            $cursor < $capacity,
            "cursor {} outside arena of capacity {}",
            $cursor,
            $capacity
        )
    };
}

/// Assert that the occupancy counter stays within capacity.
///
/// **Invariant**: `0 ≤ size ≤ capacity`
///
/// Used in: write commit (after `fetch_add`), read commit (before `fetch_sub`)
macro_rules! debug_assert_bounded_size {
    ($size:expr, $capacity:expr) => {
        debug_assert!(
            $size <= $capacity,
            "occupancy {} exceeds capacity {}",
            $size,
            $capacity
        )
    };
}

/// Assert that a record's declared length covers at least its own header.
///
/// **Invariant**: `record.size ≥ header bytes`
///
/// Used in: `try_read` after peeking the size prefix, write commit
macro_rules! debug_assert_record_len {
    ($len:expr, $header:expr) => {
        debug_assert!(
            $len >= $header,
            "record length {} below header size {}",
            $len,
            $header
        )
    };
}

/// Assert that a transaction handle is still live.
///
/// **Invariant**: accessors are only meaningful between `try_*` and
/// commit/invalidate
///
/// Used in: `WriteTransaction`/`ReadTransaction` accessors
macro_rules! debug_assert_tx_live {
    ($valid:expr) => {
        debug_assert!($valid, "use of an invalidated transaction handle")
    };
}

pub(crate) use debug_assert_bounded_size;
pub(crate) use debug_assert_in_arena;
pub(crate) use debug_assert_pow2;
pub(crate) use debug_assert_record_len;
pub(crate) use debug_assert_tx_live;
