//! Read Buffers
//!
//! A small free-list of fixed size buffers shared by every reader of a
//! directory, and the handle readers return payloads in.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

/// Size of a pooled read buffer. Most entries fit in one read of this size.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Bounded free-list of `READ_BUFFER_SIZE` buffers
pub struct BufferPool {
    free: ArrayQueue<Vec<u8>>,
}

impl BufferPool {
    /// Create a pool retaining at most `capacity` idle buffers
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            free: ArrayQueue::new(capacity.max(1)),
        })
    }

    /// Take a buffer of exactly `READ_BUFFER_SIZE` bytes
    pub(crate) fn get(&self) -> Vec<u8> {
        match self.free.pop() {
            Some(buf) => buf,
            None => vec![0u8; READ_BUFFER_SIZE],
        }
    }

    /// Return a buffer; dropped if the pool is already full
    pub(crate) fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() < READ_BUFFER_SIZE {
            return;
        }
        buf.resize(READ_BUFFER_SIZE, 0);
        let _ = self.free.push(buf);
    }

    /// Number of idle buffers currently held
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.free.len())
            .field("capacity", &self.free.capacity())
            .finish()
    }
}

/// Payload of a log entry read from a segment.
///
/// Derefs to the payload bytes only; the frame header and padding are not
/// visible. Dropping (or `close`) hands pooled memory back to the pool.
pub struct PooledBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
    pool: Option<Arc<BufferPool>>,
}

impl PooledBuffer {
    pub(crate) fn pooled(buf: Vec<u8>, start: usize, end: usize, pool: Arc<BufferPool>) -> Self {
        Self {
            buf,
            start,
            end,
            pool: Some(pool),
        }
    }

    pub(crate) fn owned(buf: Vec<u8>, start: usize, end: usize) -> Self {
        Self {
            buf,
            start,
            end,
            pool: None,
        }
    }

    /// Whether the bytes live in a buffer borrowed from the pool
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// Release the buffer back to its pool
    pub fn close(self) {}

    /// Copy the payload out and release the buffer
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.pool.is_none() {
            let mut buf = std::mem::take(&mut self.buf);
            buf.truncate(self.end);
            buf.drain(..self.start);
            return buf;
        }
        self.to_vec()
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &(self.end - self.start))
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(std::mem::take(&mut self.buf));
        }
    }
}
