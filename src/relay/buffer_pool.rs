//! Reusable copy buffers for body streaming.
//!
//! # Responsibilities
//! - Hand out fixed-size byte buffers to copy operations
//! - Take buffers back when the copy finishes, whatever the outcome
//!
//! # Design Decisions
//! - A miss allocates a fresh buffer; `acquire` never waits
//! - Buffers return through a guard's `Drop`, so every exit path releases
//! - Idle buffers are capped so a burst does not pin memory forever

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Size of every pooled buffer.
pub const BUFFER_SIZE: usize = 4096;

/// Upper bound on buffers kept idle in a pool.
pub const MAX_IDLE_BUFFERS: usize = 1024;

static GLOBAL_POOL: OnceLock<Arc<BufferPool>> = OnceLock::new();

/// Process-wide pool shared by all relay sessions.
pub fn global() -> Arc<BufferPool> {
    GLOBAL_POOL
        .get_or_init(|| Arc::new(BufferPool::new(MAX_IDLE_BUFFERS)))
        .clone()
}

/// A pool of `BUFFER_SIZE` byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Box<[u8]>>>,
    max_idle: usize,
    /// Buffers ever allocated by this pool.
    allocated: AtomicUsize,
}

impl BufferPool {
    /// Create an empty pool keeping at most `max_idle` buffers.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Check out a buffer. Reuses an idle one when available.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let reused = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop());

        let buf = reused.unwrap_or_else(|| {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            vec![0u8; BUFFER_SIZE].into_boxed_slice()
        });

        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    /// Return a buffer explicitly. Same as dropping it.
    pub fn release(&self, buffer: PooledBuffer) {
        drop(buffer);
    }

    fn put(&self, buf: Box<[u8]>) {
        if buf.len() != BUFFER_SIZE {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(buf);
            }
        }
    }

    /// Number of buffers currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Number of buffers this pool has allocated so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(MAX_IDLE_BUFFERS)
    }
}

/// A buffer checked out from a [`BufferPool`].
/// Goes back to its pool when dropped.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Box<[u8]>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_buffer_has_fixed_size() {
        let pool = Arc::new(BufferPool::default());
        let buf = pool.acquire();
        assert_eq!(buf.len(), BUFFER_SIZE);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn dropped_buffer_is_reused() {
        let pool = Arc::new(BufferPool::default());

        let buf = pool.acquire();
        drop(buf);
        assert_eq!(pool.idle(), 1);

        let _again = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn miss_allocates_instead_of_waiting() {
        let pool = Arc::new(BufferPool::default());
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.allocated(), 2);

        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn idle_buffers_are_capped() {
        let pool = Arc::new(BufferPool::new(1));
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn concurrent_acquire_release() {
        let pool = Arc::new(BufferPool::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        buf[0] = 1;
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(pool.allocated() <= 8);
        assert_eq!(pool.idle(), pool.allocated());
    }
}
