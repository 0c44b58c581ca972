use crate::block_node::BlockNode;

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// most blocks kept around for reuse, extra released blocks are freed
pub const MAX_CACHED_BLOCKS: usize = 4;

/// A free list of spare blocks, hold a few blocks to avoid a possibly
/// locking malloc on the producer hot path.
///
/// The stack has exactly two roles: one remover (`acquire`, the producer of
/// the owning queue) and one adder (`release`, the consumer of the owning
/// queue). Because only one thread ever detaches nodes, a node can not be
/// freed or recycled while `acquire` still reads its link, which is what
/// keeps the plain CAS loops free of the ABA problem. Allowing a second
/// remover needs generation tagged nodes first.
pub struct BlockStack<T> {
    top: AtomicPtr<BlockNode<T>>,
    // approximate number of resident blocks, only bounds growth
    count: AtomicUsize,
}

impl<T> BlockStack<T> {
    pub const fn new() -> Self {
        BlockStack {
            top: AtomicPtr::new(ptr::null_mut()),
            count: AtomicUsize::new(0),
        }
    }

    /// get a ready to use block with a null link, recycled if possible
    ///
    /// # Safety
    ///
    /// must only be called from the single remover thread
    pub unsafe fn acquire(&self) -> *mut BlockNode<T> {
        let mut top = self.top.load(Ordering::Acquire);
        // really low contention here, so a cas loop is fine
        loop {
            if top.is_null() {
                return BlockNode::new();
            }

            // we are the only remover, `top` can't be detached under us
            let next = (*top).next.load(Ordering::Relaxed);
            match self
                .top
                .compare_exchange_weak(top, next, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(cur) => top = cur,
            }
        }

        self.count.fetch_sub(1, Ordering::Relaxed);
        (*top).next.store(ptr::null_mut(), Ordering::Relaxed);
        top
    }

    /// hand a block back, it's either cached or freed right away
    ///
    /// # Safety
    ///
    /// must only be called from the single adder thread, the caller must
    /// own `block` and it must not be reachable from anywhere else
    pub unsafe fn release(&self, block: *mut BlockNode<T>) {
        if self.count.load(Ordering::Relaxed) >= MAX_CACHED_BLOCKS {
            BlockNode::free(block);
            return;
        }

        self.count.fetch_add(1, Ordering::Relaxed);
        let mut top = self.top.load(Ordering::Relaxed);
        loop {
            (*block).next.store(top, Ordering::Relaxed);
            match self
                .top
                .compare_exchange_weak(top, block, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(cur) => top = cur,
            }
        }
    }

    /// approximate number of cached blocks
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl<T> Default for BlockStack<T> {
    fn default() -> Self {
        BlockStack::new()
    }
}

impl<T> Drop for BlockStack<T> {
    fn drop(&mut self) {
        let mut top = *self.top.get_mut();
        while !top.is_null() {
            let next = unsafe { &*top }.next.load(Ordering::Relaxed);
            unsafe { BlockNode::free(top) };
            top = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn recycle_block() {
        let stack = BlockStack::<usize>::new();
        assert_eq!(stack.len(), 0);
        let a = unsafe { stack.acquire() };
        let b = unsafe { stack.acquire() };
        assert_ne!(a, b);

        unsafe { stack.release(a) };
        unsafe { stack.release(b) };
        assert_eq!(stack.len(), 2);

        // last in, first out
        let c = unsafe { stack.acquire() };
        assert_eq!(c, b);
        assert!(unsafe { &*c }.next.load(Ordering::Relaxed).is_null());
        assert_eq!(stack.len(), 1);
        unsafe { BlockNode::free(c) };
    }

    #[test]
    fn cached_blocks_are_bounded() {
        let stack = BlockStack::<usize>::new();
        let blocks: Vec<_> = (0..MAX_CACHED_BLOCKS * 3)
            .map(|_| unsafe { stack.acquire() })
            .collect();
        for b in blocks {
            unsafe { stack.release(b) };
            assert!(stack.len() <= MAX_CACHED_BLOCKS);
        }
        assert_eq!(stack.len(), MAX_CACHED_BLOCKS);
    }

    #[test]
    fn acquire_release_in_parallel() {
        struct Blocks(Vec<*mut BlockNode<usize>>);
        unsafe impl Send for Blocks {}

        let stack = Arc::new(BlockStack::<usize>::new());
        let total = 10_000;
        let (tx, rx) = std::sync::mpsc::channel::<Blocks>();

        let s = stack.clone();
        let adder = thread::spawn(move || {
            for Blocks(blocks) in rx {
                for b in blocks {
                    unsafe { s.release(b) };
                    assert!(s.len() <= MAX_CACHED_BLOCKS);
                }
            }
        });

        for _ in 0..total / 8 {
            let blocks = (0..8).map(|_| unsafe { stack.acquire() }).collect();
            tx.send(Blocks(blocks)).unwrap();
        }
        drop(tx);
        adder.join().unwrap();
        assert!(stack.len() <= MAX_CACHED_BLOCKS);
    }
}
