//! Append/drain byte pipe.
//!
//! Uses a zero-filled `bytes::BytesMut` as backing storage with two cursors:
//! - `write_cursor`: end of committed data
//! - `read_cursor`: start of data not yet drained
//!
//! Invariant: `0 <= read_cursor <= write_cursor <= capacity`.
//!
//! Appending goes through `reserve` + `commit`; draining goes through
//! `undrained` + `advance_read`. Growth keeps cursor offsets intact.
//!
//! # Example
//!
//! ```
//! use workpipe::protocol::Pipe;
//!
//! let mut pipe = Pipe::with_capacity(16);
//!
//! let space = pipe.reserve(5);
//! space[..5].copy_from_slice(b"hello");
//! pipe.commit(5);
//!
//! assert_eq!(pipe.undrained(), b"hello");
//! pipe.advance_read(5);
//! assert!(pipe.is_empty());
//! ```

use bytes::BytesMut;

use crate::error::{Result, WorkpipeError};

/// Default initial capacity (64KB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 64 * 1024;

/// Default soft capacity at which growth is logged (64MB).
pub const DEFAULT_WARN_CAPACITY: usize = 64 * 1024 * 1024;

/// Smallest allocation made on growth.
const MIN_GROWTH: usize = 256;

/// Largest capacity a pipe may grow to; allocations cannot exceed it.
const MAX_CAPACITY: usize = isize::MAX as usize;

/// Growable byte buffer with independent write and read cursors.
///
/// A pipe is single-writer/single-drainer: `reserve`/`commit` and
/// `undrained`/`advance_read` all take `&mut self` or borrow the buffer, so
/// the borrow checker rules out interleaving without external locking.
#[derive(Debug)]
pub struct Pipe {
    /// Backing storage; its length is the pipe capacity.
    buffer: BytesMut,
    /// Bytes valid from the start of the buffer.
    write_cursor: usize,
    /// Bytes already consumed by the drain loop.
    read_cursor: usize,
    /// Size of the range handed out by the last `reserve`.
    reserved: usize,
    /// Growth past this size is logged.
    warn_capacity: usize,
}

impl Pipe {
    /// Create a new pipe with default settings.
    ///
    /// Default capacity: 64KB.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Create a new pipe with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::zeroed(capacity),
            write_cursor: 0,
            read_cursor: 0,
            reserved: 0,
            warn_capacity: DEFAULT_WARN_CAPACITY,
        }
    }

    /// Set the soft capacity at which growth is logged.
    pub fn with_warn_capacity(mut self, warn_capacity: usize) -> Self {
        self.warn_capacity = warn_capacity;
        self
    }

    /// Return a writable range starting at `write_cursor`.
    ///
    /// The range is at least `min_bytes` long; the buffer grows if needed.
    /// Nothing becomes visible to the drain side until [`commit`](Self::commit).
    ///
    /// # Panics
    ///
    /// Panics if the pipe cannot grow to hold `min_bytes` more bytes. Use
    /// [`try_reserve`](Self::try_reserve) to get an error instead.
    pub fn reserve(&mut self, min_bytes: usize) -> &mut [u8] {
        match self.try_reserve(min_bytes) {
            Ok(space) => space,
            Err(e) => panic!("reserve failed: {}", e),
        }
    }

    /// Fallible [`reserve`](Self::reserve).
    ///
    /// Fails with `PayloadOverflow` if `write_cursor + min_bytes` exceeds the
    /// largest possible capacity. The pipe is left unchanged on error.
    pub fn try_reserve(&mut self, min_bytes: usize) -> Result<&mut [u8]> {
        let available = self.buffer.len() - self.write_cursor;
        if available < min_bytes {
            let required = self
                .write_cursor
                .checked_add(min_bytes)
                .filter(|&required| required <= MAX_CAPACITY)
                .ok_or(WorkpipeError::PayloadOverflow {
                    needed: min_bytes,
                    available: MAX_CAPACITY - self.write_cursor,
                })?;
            self.grow(required);
        }
        self.reserved = self.buffer.len() - self.write_cursor;
        Ok(&mut self.buffer[self.write_cursor..])
    }

    /// Advance `write_cursor` by `n_bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `n_bytes` exceeds the range returned by the last `reserve`.
    pub fn commit(&mut self, n_bytes: usize) {
        assert!(
            n_bytes <= self.reserved,
            "commit of {} bytes exceeds reserved {}",
            n_bytes,
            self.reserved
        );
        self.write_cursor += n_bytes;
        self.reserved = 0;
    }

    /// Bytes available to the drain loop: `[read_cursor, write_cursor)`.
    #[inline]
    pub fn undrained(&self) -> &[u8] {
        &self.buffer[self.read_cursor..self.write_cursor]
    }

    /// Advance `read_cursor` by `n_bytes`.
    ///
    /// # Panics
    ///
    /// Panics if that would move `read_cursor` past `write_cursor`.
    pub fn advance_read(&mut self, n_bytes: usize) {
        assert!(
            n_bytes <= self.write_cursor - self.read_cursor,
            "advance of {} bytes exceeds {} undrained",
            n_bytes,
            self.write_cursor - self.read_cursor
        );
        self.read_cursor += n_bytes;
    }

    /// Drop every undrained byte, as if the drain loop had consumed them.
    pub fn discard_undrained(&mut self) -> usize {
        let dropped = self.write_cursor - self.read_cursor;
        self.read_cursor = self.write_cursor;
        dropped
    }

    /// Shift undrained bytes to offset 0.
    ///
    /// Capacity is kept; only the cursors move.
    pub fn compact(&mut self) {
        if self.read_cursor == 0 {
            return;
        }
        if self.read_cursor < self.write_cursor {
            self.buffer
                .copy_within(self.read_cursor..self.write_cursor, 0);
        }
        self.write_cursor -= self.read_cursor;
        self.read_cursor = 0;
    }

    /// Reset both cursors, discarding any undrained data.
    pub fn clear(&mut self) {
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.reserved = 0;
    }

    /// Number of undrained bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.write_cursor - self.read_cursor
    }

    /// Check if there is nothing left to drain.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_cursor == self.write_cursor
    }

    /// Current backing buffer size.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Offset of the end of committed data.
    #[inline]
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Offset of the start of undrained data.
    #[inline]
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    fn grow(&mut self, required: usize) {
        let old_capacity = self.buffer.len();
        let new_capacity = required
            .max(old_capacity.saturating_mul(2))
            .max(MIN_GROWTH)
            .min(MAX_CAPACITY);

        self.buffer.resize(new_capacity, 0);

        if new_capacity >= self.warn_capacity {
            tracing::warn!(
                "Pipe grew from {} to {} bytes, past soft capacity {}",
                old_capacity,
                new_capacity,
                self.warn_capacity
            );
        } else {
            tracing::trace!("Pipe grew from {} to {} bytes", old_capacity, new_capacity);
        }
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(pipe: &mut Pipe, data: &[u8]) {
        let space = pipe.reserve(data.len());
        space[..data.len()].copy_from_slice(data);
        pipe.commit(data.len());
    }

    fn assert_cursor_invariant(pipe: &Pipe) {
        assert!(pipe.read_cursor() <= pipe.write_cursor());
        assert!(pipe.write_cursor() <= pipe.capacity());
    }

    #[test]
    fn test_new_pipe_is_empty() {
        let pipe = Pipe::new();
        assert!(pipe.is_empty());
        assert_eq!(pipe.len(), 0);
        assert_eq!(pipe.capacity(), DEFAULT_INITIAL_CAPACITY);
        assert!(pipe.undrained().is_empty());
    }

    #[test]
    fn test_reserve_commit_makes_bytes_visible() {
        let mut pipe = Pipe::with_capacity(32);
        append(&mut pipe, b"first");

        assert_eq!(pipe.undrained(), b"first");
        assert_eq!(pipe.write_cursor(), 5);
        assert_eq!(pipe.read_cursor(), 0);
    }

    #[test]
    fn test_reserve_without_commit_is_invisible() {
        let mut pipe = Pipe::with_capacity(32);
        let space = pipe.reserve(4);
        space[..4].copy_from_slice(b"junk");

        assert!(pipe.is_empty());
        assert_eq!(pipe.write_cursor(), 0);
    }

    #[test]
    fn test_partial_commit() {
        let mut pipe = Pipe::with_capacity(32);
        let space = pipe.reserve(8);
        space[..3].copy_from_slice(b"abc");
        pipe.commit(3);

        assert_eq!(pipe.undrained(), b"abc");
    }

    #[test]
    fn test_reserve_returns_at_least_min_bytes() {
        let mut pipe = Pipe::with_capacity(4);
        let space = pipe.reserve(100);
        assert!(space.len() >= 100);
        assert!(pipe.capacity() >= 100);
    }

    #[test]
    fn test_try_reserve_rejects_impossible_size() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"abc");

        let result = pipe.try_reserve(usize::MAX);

        assert!(matches!(
            result,
            Err(WorkpipeError::PayloadOverflow {
                needed: usize::MAX,
                ..
            })
        ));
        assert_eq!(pipe.capacity(), 16);
        assert_eq!(pipe.undrained(), b"abc");
    }

    #[test]
    fn test_try_reserve_rejects_size_past_max_capacity() {
        let mut pipe = Pipe::with_capacity(0);
        assert!(pipe.try_reserve(MAX_CAPACITY + 1).is_err());
        assert_eq!(pipe.capacity(), 0);
    }

    #[test]
    #[should_panic(expected = "reserve failed")]
    fn test_reserve_impossible_size_panics() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"abc");
        let _ = pipe.reserve(usize::MAX);
    }

    #[test]
    fn test_growth_preserves_cursors_and_data() {
        let mut pipe = Pipe::with_capacity(8);
        append(&mut pipe, b"abcdef");
        pipe.advance_read(2);

        append(&mut pipe, &[0xAB; 1024]);

        assert_eq!(pipe.read_cursor(), 2);
        assert_eq!(pipe.write_cursor(), 6 + 1024);
        assert_eq!(&pipe.undrained()[..4], b"cdef");
        assert!(pipe.undrained()[4..].iter().all(|&b| b == 0xAB));
        assert_cursor_invariant(&pipe);
    }

    #[test]
    fn test_zero_capacity_pipe_grows() {
        let mut pipe = Pipe::with_capacity(0);
        append(&mut pipe, b"x");
        assert_eq!(pipe.undrained(), b"x");
        assert!(pipe.capacity() >= MIN_GROWTH);
    }

    #[test]
    fn test_advance_read_drains_in_order() {
        let mut pipe = Pipe::with_capacity(32);
        append(&mut pipe, b"one");
        append(&mut pipe, b"two");

        assert_eq!(&pipe.undrained()[..3], b"one");
        pipe.advance_read(3);
        assert_eq!(pipe.undrained(), b"two");
        pipe.advance_read(3);
        assert!(pipe.is_empty());
        assert_eq!(pipe.read_cursor(), pipe.write_cursor());
    }

    #[test]
    #[should_panic(expected = "exceeds reserved")]
    fn test_commit_past_reserved_panics() {
        let mut pipe = Pipe::with_capacity(4);
        let _ = pipe.reserve(4);
        pipe.commit(5);
    }

    #[test]
    #[should_panic(expected = "exceeds reserved")]
    fn test_commit_without_reserve_panics() {
        let mut pipe = Pipe::with_capacity(4);
        pipe.commit(1);
    }

    #[test]
    #[should_panic(expected = "undrained")]
    fn test_advance_past_write_cursor_panics() {
        let mut pipe = Pipe::with_capacity(8);
        append(&mut pipe, b"ab");
        pipe.advance_read(3);
    }

    #[test]
    fn test_drained_pipe_does_not_shrink() {
        let mut pipe = Pipe::with_capacity(8);
        append(&mut pipe, &[1; 512]);
        let grown = pipe.capacity();
        pipe.advance_read(512);

        assert!(pipe.is_empty());
        assert_eq!(pipe.capacity(), grown);
        assert_eq!(pipe.write_cursor(), 512);
    }

    #[test]
    fn test_compact_partial() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"hello world");
        pipe.advance_read(6);

        pipe.compact();

        assert_eq!(pipe.read_cursor(), 0);
        assert_eq!(pipe.write_cursor(), 5);
        assert_eq!(pipe.undrained(), b"world");
    }

    #[test]
    fn test_compact_fully_drained_resets_cursors() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"data");
        pipe.advance_read(4);

        pipe.compact();

        assert_eq!(pipe.read_cursor(), 0);
        assert_eq!(pipe.write_cursor(), 0);
        assert_eq!(pipe.capacity(), 16);
    }

    #[test]
    fn test_compact_without_reads_is_noop() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"data");
        pipe.compact();
        assert_eq!(pipe.undrained(), b"data");
        assert_eq!(pipe.write_cursor(), 4);
    }

    #[test]
    fn test_discard_undrained() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"abcdef");
        pipe.advance_read(2);

        assert_eq!(pipe.discard_undrained(), 4);
        assert!(pipe.is_empty());
        assert_cursor_invariant(&pipe);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut pipe = Pipe::with_capacity(16);
        append(&mut pipe, b"abc");
        pipe.advance_read(1);

        pipe.clear();

        assert!(pipe.is_empty());
        assert_eq!(pipe.write_cursor(), 0);
        assert_eq!(pipe.read_cursor(), 0);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut pipe = Pipe::with_capacity(1);
        for byte in b"incremental" {
            append(&mut pipe, &[*byte]);
            assert_cursor_invariant(&pipe);
        }
        assert_eq!(pipe.undrained(), b"incremental");
    }
}
