use std::collections::VecDeque;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

/// Extra capacity reserved on every fresh allocation so that prepending a
/// header (VLAN tag, encapsulation) to a packet already in flight rarely
/// needs a fresh allocation.
const ALLOCATION_PADDING: usize = 50;

/// Chunks larger than this never get returned to the free list; letting an
/// oversized one-off allocation sit in the pool forever would waste memory
/// on every subsequent small allocation that reuses it.
const FREE_LIST_CAP: usize = 1000;

struct FreeListState {
    chunks: VecDeque<Box<Chunk>>,
    high_water_mark: usize,
}

static FREE_LIST: OnceLock<Mutex<FreeListState>> = OnceLock::new();

fn free_list() -> &'static Mutex<FreeListState> {
    FREE_LIST.get_or_init(|| {
        Mutex::new(FreeListState { chunks: VecDeque::new(), high_water_mark: 0 })
    })
}

struct Chunk {
    data: Vec<u8>,
    len: usize,
    refcount: AtomicUsize,
}

impl Chunk {
    fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

/// A reference-counted, recyclable byte buffer.
///
/// Cloning is a pointer copy plus an atomic increment, not a data copy —
/// `Buffer` is the cheap handle that lets a `Packet` be shared across
/// scheduler closures without cloning payload bytes. Reference counting is
/// done by hand on a raw pointer rather than via `Arc` so that the last
/// drop can route the backing chunk through the free list instead of
/// deallocating it, which `Arc` has no hook for.
pub struct Buffer {
    ptr: NonNull<Chunk>,
}

unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Allocates a buffer holding `data`, reusing a pooled chunk when one
    /// large enough is available.
    pub fn new(data: &[u8]) -> Buffer {
        let mut chunk = take_from_pool(data.len()).unwrap_or_else(|| {
            Box::new(Chunk {
                data: Vec::with_capacity(data.len() + ALLOCATION_PADDING),
                len: 0,
                refcount: AtomicUsize::new(0),
            })
        });
        chunk.data.clear();
        chunk.data.extend_from_slice(data);
        chunk.len = data.len();
        chunk.refcount.store(1, Ordering::Relaxed);
        let ptr = NonNull::from(Box::leak(chunk));
        Buffer { ptr }
    }

    pub fn len(&self) -> usize {
        unsafe { self.ptr.as_ref().len }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe {
            let chunk = self.ptr.as_ref();
            &chunk.data[..chunk.len]
        }
    }

    /// Number of outstanding handles to this chunk, including `self`.
    pub fn strong_count(&self) -> usize {
        unsafe { self.ptr.as_ref().refcount.load(Ordering::Acquire) }
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        unsafe {
            self.ptr.as_ref().refcount.fetch_add(1, Ordering::Relaxed);
        }
        Buffer { ptr: self.ptr }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let previous = unsafe { self.ptr.as_ref().refcount.fetch_sub(1, Ordering::AcqRel) };
        if previous == 1 {
            let chunk = unsafe { Box::from_raw(self.ptr.as_ptr()) };
            recycle(chunk);
        }
    }
}

/// Pops chunks from the tail of the free list, discarding each one too
/// small to satisfy `min_len`, until a fit is found or the list runs out.
/// Chunks scanned past and discarded this way are gone for good — they
/// don't go back on the list, since the same size mismatch would just
/// cause them to be scanned past again next time.
fn take_from_pool(min_len: usize) -> Option<Box<Chunk>> {
    let mut state = free_list().lock().unwrap();
    while let Some(chunk) = state.chunks.pop_back() {
        if chunk.capacity() >= min_len {
            return Some(chunk);
        }
        drop(chunk);
    }
    None
}

/// Returns a chunk to the pool, or drops it, following the high-water-mark
/// policy: the mark only ever grows, and only chunks at least as large as
/// the current mark are worth keeping, so the pool converges on holding
/// the largest sizes actually seen rather than filling up with whatever
/// was freed first.
fn recycle(chunk: Box<Chunk>) {
    let mut state = free_list().lock().unwrap();
    let size = chunk.capacity();
    state.high_water_mark = state.high_water_mark.max(size);
    if size < state.high_water_mark || state.chunks.len() >= FREE_LIST_CAP {
        drop(chunk);
    } else {
        state.chunks.push_back(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_storage_and_refcounts() {
        let a = Buffer::new(b"hello");
        assert_eq!(a.strong_count(), 1);
        let b = a.clone();
        assert_eq!(a.strong_count(), 2);
        assert_eq!(b.as_slice(), b"hello");
        drop(b);
        assert_eq!(a.strong_count(), 1);
    }

    #[test]
    fn recycled_chunk_is_reused() {
        let a = Buffer::new(&vec![0u8; 4096]);
        drop(a);
        let b = Buffer::new(&vec![1u8; 10]);
        assert_eq!(b.as_slice().len(), 10);
    }

    #[test]
    fn too_small_chunks_are_destroyed_while_scanning_for_a_fit() {
        drop(Buffer::new(&vec![0u8; 10]));
        drop(Buffer::new(&vec![0u8; 200]));
        assert!(free_list().lock().unwrap().chunks.len() >= 2);

        // Nothing pooled is big enough; both should be popped and
        // destroyed rather than left sitting in the free list.
        let huge = Buffer::new(&vec![0u8; 10_000]);
        assert_eq!(free_list().lock().unwrap().chunks.len(), 0);
        assert_eq!(huge.len(), 10_000);
    }
}
