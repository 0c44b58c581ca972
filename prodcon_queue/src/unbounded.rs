use crossbeam_utils::CachePadded;
use smallvec::SmallVec;

use crate::atomic::{AtomicPtr, AtomicU64};
use crate::block_node::{bulk_end, offset, BlockNode, BLOCK_SIZE};
use crate::block_stack::BlockStack;
use crate::SpscQueue;

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::Ordering;

/// consumer side data
struct Head<T> {
    /// next index to pop
    index: AtomicU64,
    /// stale copy of the producer index, refreshed only when drained
    tail_cache: AtomicU64,
    /// the block being drained
    block: AtomicPtr<BlockNode<T>>,
}

/// producer side data
struct Tail<T> {
    /// next index to push
    index: AtomicU64,
    /// the block being filled
    block: AtomicPtr<BlockNode<T>>,
}

/// spsc unbounded queue
///
/// handles live in a chain of fixed size blocks addressed by a 64 bit
/// logical index, the slot offset is `index % BLOCK_SIZE`. the producer links
/// a new block when it is about to use offset 0, the consumer retires its
/// block when it reaches offset 0. retired blocks go to a small free list
/// that the producer takes new blocks from.
///
/// only one thread may call `push` and only one thread may call `pop` or
/// `bulk_pop`
pub struct Queue<T> {
    // ----------------------------------------
    // use for pop
    head: CachePadded<Head<T>>,

    // -----------------------------------------
    // use for push
    tail: CachePadded<Tail<T>>,

    // -----------------------------------------
    // shared by both sides, push takes and pop gives
    blocks: CachePadded<BlockStack<T>>,

    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// create a spsc queue
    pub fn new() -> Self {
        // start at one so the first push doesn't link a new block
        Self::with_index(1)
    }

    fn with_index(index: u64) -> Self {
        let init_block = BlockNode::<T>::new();
        Queue {
            head: Head {
                index: AtomicU64::new(index),
                tail_cache: AtomicU64::new(index),
                block: AtomicPtr::new(init_block),
            }
            .into(),
            tail: Tail {
                index: AtomicU64::new(index),
                block: AtomicPtr::new(init_block),
            }
            .into(),
            blocks: BlockStack::new().into(),
            _marker: PhantomData,
        }
    }

    // link a fresh block after the current tail block
    #[inline(never)]
    fn add_tail(&self, tail: *mut BlockNode<T>) -> *mut BlockNode<T> {
        // safety: push is the only caller, so this is the single remover
        let block = unsafe { self.blocks.acquire() };
        // the link is published by the release store of the tail index
        unsafe { &*tail }.next.store(block, Ordering::Relaxed);
        self.tail.block.store(block, Ordering::Relaxed);
        block
    }

    // retire the drained head block and move to its successor
    #[inline(never)]
    fn remove_head(&self) {
        let head = unsafe { self.head.block.unsync_load() };
        // the producer already passed the boundary, the link is visible
        let next = unsafe { &*head }.next.load(Ordering::Relaxed);
        debug_assert!(!next.is_null());
        self.head.block.store(next, Ordering::Relaxed);
        // safety: pop is the only caller, so this is the single adder
        unsafe { self.blocks.release(head) };
    }

    /// push a handle to the queue, never fails
    pub fn push(&self, v: NonNull<T>) {
        let index = unsafe { self.tail.index.unsync_load() };
        let mut tail = unsafe { self.tail.block.unsync_load() };
        if offset(index) == 0 {
            tail = self.add_tail(tail);
        }

        // store the data
        unsafe { &*tail }.set(index, v);
        // commit the push
        self.tail.index.store(index.wrapping_add(1), Ordering::Release);
    }

    /// pop from the queue, if it's empty return None
    pub fn pop(&self) -> Option<NonNull<T>> {
        let index = unsafe { self.head.index.unsync_load() };
        if index == unsafe { self.head.tail_cache.unsync_load() } {
            let push_index = self.tail.index.load(Ordering::Acquire);
            self.head.tail_cache.store(push_index, Ordering::Relaxed);
            if index == push_index {
                return None;
            }
        }

        if offset(index) == 0 {
            self.remove_head();
        }

        let head = unsafe { &*self.head.block.unsync_load() };
        // get the data
        let v = head.get(index);

        // commit the pop
        self.head.index.store(index.wrapping_add(1), Ordering::Relaxed);
        v
    }

    /// pop every available handle up to the end of the current block
    pub fn bulk_pop(&self) -> SmallVec<[NonNull<T>; BLOCK_SIZE]> {
        let index = unsafe { self.head.index.unsync_load() };
        let push_index = self.tail.index.load(Ordering::Acquire);
        self.head.tail_cache.store(push_index, Ordering::Relaxed);
        if index == push_index {
            return SmallVec::new();
        }

        if offset(index) == 0 {
            self.remove_head();
        }

        let head = unsafe { &*self.head.block.unsync_load() };
        // only pop within a block
        let end = bulk_end(index, push_index);
        let mut values = SmallVec::new();
        head.bulk_get(index, end, &mut values);

        // commit the pop
        self.head.index.store(end, Ordering::Relaxed);
        values
    }

    /// get the size of queue
    #[inline]
    pub fn len(&self) -> usize {
        let pop_index = self.head.index.load(Ordering::Relaxed);
        let push_index = self.tail.index.load(Ordering::Acquire);
        push_index.wrapping_sub(pop_index) as usize
    }

    /// if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// approximate number of spare blocks kept for reuse
    #[inline]
    pub fn cached_blocks(&self) -> usize {
        self.blocks.len()
    }

    // blocks in the active chain, consumer side only
    #[cfg(test)]
    fn chain_len(&self) -> usize {
        let mut block = unsafe { self.head.block.unsync_load() };
        let mut n = 0;
        while !block.is_null() {
            n += 1;
            block = unsafe { &*block }.next.load(Ordering::Relaxed);
        }
        n
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Queue::new()
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("unbounded::Queue")
            .field("head", &self.head.index)
            .field("tail", &self.tail.index)
            .field("cached_blocks", &self.cached_blocks())
            .finish()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // drain the handles, they are owned by the caller
        while !self.bulk_pop().is_empty() {}

        let mut block = self.head.block.load(Ordering::Relaxed);
        debug_assert_eq!(block, self.tail.block.load(Ordering::Relaxed));
        while !block.is_null() {
            let next = unsafe { &*block }.next.load(Ordering::Relaxed);
            unsafe { BlockNode::free(block) };
            block = next;
        }
        // the free list releases its own blocks
    }
}

impl<T: Send> SpscQueue<T> for Queue<T> {
    #[inline]
    fn push(&self, v: NonNull<T>) -> bool {
        Queue::push(self, v);
        true
    }

    #[inline]
    fn pop(&self) -> Option<NonNull<T>> {
        Queue::pop(self)
    }

    #[inline]
    fn len(&self) -> usize {
        Queue::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_stack::MAX_CACHED_BLOCKS;

    fn value(v: NonNull<usize>) -> usize {
        unsafe { *v.as_ref() }
    }

    #[test]
    fn queue_sanity() {
        let items: Vec<usize> = (0..300).collect();
        let q = Queue::<usize>::new();
        assert_eq!(q.len(), 0);
        assert_eq!(q.pop(), None);
        for v in &items {
            q.push(NonNull::from(v));
        }
        assert_eq!(q.len(), 300);
        println!("{q:?}");

        for i in 0..300 {
            assert_eq!(q.pop().map(value), Some(i));
        }
        assert_eq!(q.pop(), None);
        assert_eq!(q.len(), 0);
        assert_eq!(q.chain_len(), 1);
    }

    #[test]
    fn drain_leaves_one_block() {
        let items: Vec<usize> = (0..BLOCK_SIZE * 5 + 7).collect();
        let q = Queue::<usize>::new();
        for v in &items {
            q.push(NonNull::from(v));
        }
        assert_eq!(q.chain_len(), 6);

        let mut popped = Vec::new();
        while let Some(v) = q.pop() {
            popped.push(value(v));
        }
        assert_eq!(popped, items);
        assert_eq!(q.chain_len(), 1);
        assert!(q.cached_blocks() <= MAX_CACHED_BLOCKS);
    }

    #[test]
    fn partial_drains_keep_order_at_boundaries() {
        let items: Vec<usize> = (0..BLOCK_SIZE * 8).collect();
        let q = Queue::<usize>::new();
        let mut popped = Vec::new();
        // push in bursts that straddle block boundaries, pop a bit less each time
        for chunk in items.chunks(BLOCK_SIZE / 2 + 3) {
            for v in chunk {
                q.push(NonNull::from(v));
            }
            for _ in 0..chunk.len() - 1 {
                popped.push(q.pop().map(value).unwrap());
            }
        }
        while let Some(v) = q.pop() {
            popped.push(value(v));
        }
        assert_eq!(popped, items);
    }

    #[test]
    fn blocks_are_recycled() {
        let items: Vec<usize> = (0..BLOCK_SIZE * 20).collect();
        let q = Queue::<usize>::new();
        for v in &items {
            q.push(NonNull::from(v));
        }
        for _ in &items {
            assert!(q.pop().is_some());
            assert!(q.cached_blocks() <= MAX_CACHED_BLOCKS);
        }
        assert_eq!(q.cached_blocks(), MAX_CACHED_BLOCKS);

        // steady state push/pop takes its blocks from the free list
        for v in &items {
            q.push(NonNull::from(v));
            assert_eq!(q.pop().map(value), Some(*v));
        }
        assert!(q.cached_blocks() >= MAX_CACHED_BLOCKS - 1);
        assert!(q.cached_blocks() <= MAX_CACHED_BLOCKS);
    }

    #[test]
    fn index_wraps_around() {
        let items: Vec<usize> = (0..BLOCK_SIZE * 3).collect();
        let q = Queue::<usize>::with_index(u64::MAX - BLOCK_SIZE as u64 - 5);
        for v in &items {
            q.push(NonNull::from(v));
        }
        assert_eq!(q.len(), items.len());
        for i in 0..items.len() {
            assert_eq!(q.pop().map(value), Some(i));
        }
        assert_eq!(q.pop(), None);
        assert_eq!(q.chain_len(), 1);
    }

    #[test]
    fn bulk_pop_test() {
        let items: Vec<usize> = (0..BLOCK_SIZE + 17).collect();
        let q = Queue::<usize>::new();
        for v in &items {
            q.push(NonNull::from(v));
        }
        // the first block skips slot 0
        let vec = q.bulk_pop();
        assert_eq!(vec.len(), BLOCK_SIZE - 1);
        assert_eq!(q.len(), items.len() - (BLOCK_SIZE - 1));
        let v = q.bulk_pop();
        assert_eq!(value(v[0]), BLOCK_SIZE - 1);
        assert_eq!(v.len(), 18);
        assert_eq!(q.len(), 0);
        assert!(q.bulk_pop().is_empty());
        println!("{q:?}");

        for (i, item) in vec.iter().enumerate() {
            assert_eq!(value(*item), i);
        }
    }

    #[test]
    fn drop_with_pending_items() {
        let items: Vec<usize> = (0..BLOCK_SIZE * 3).collect();
        let q = Queue::<usize>::new();
        for v in &items {
            q.push(NonNull::from(v));
        }
        for _ in 0..BLOCK_SIZE {
            q.pop();
        }
        drop(q);
        // the handles are not owned by the queue
        assert_eq!(items.len(), BLOCK_SIZE * 3);
    }
}
