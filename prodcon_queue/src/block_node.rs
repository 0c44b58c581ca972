use std::alloc::{self, Layout};
use std::cell::UnsafeCell;
use std::cmp;
use std::ptr::NonNull;
use std::sync::atomic::AtomicPtr;

// size for block_node
pub const BLOCK_SIZE: usize = 1 << BLOCK_SHIFT;
// block mask
pub const BLOCK_MASK: usize = BLOCK_SIZE - 1;
// block shift
pub const BLOCK_SHIFT: usize = 8;

/// slot offset of a logical queue index inside its block
#[inline]
pub fn offset(index: u64) -> usize {
    (index & BLOCK_MASK as u64) as usize
}

/// A slot in a block, `None` until the producer fills it.
struct Slot<T> {
    value: UnsafeCell<Option<NonNull<T>>>,
}

/// a block node holds a fixed run of handle slots plus the link to the
/// next block in the chain. the node is aligned to its own cache lines so
/// that neighbouring heap objects never share a line with it
///
/// a block is owned by exactly one of: the active chain of a queue, or the
/// free list of that queue. ownership moves as a raw pointer produced by
/// `BlockNode::new` and is given back to the allocator by `BlockNode::free`
#[repr(C, align(128))]
pub struct BlockNode<T> {
    pub next: AtomicPtr<BlockNode<T>>,
    data: [Slot<T>; BLOCK_SIZE],
}

impl<T> BlockNode<T> {
    /// allocate a block with a null link and all slots empty
    ///
    /// the all zero bit pattern is a valid empty block, so the node is
    /// allocated zeroed instead of being built on the stack first.
    /// an allocation failure is reported through `handle_alloc_error`
    pub fn new() -> *mut BlockNode<T> {
        let layout = Layout::new::<BlockNode<T>>();
        let block = unsafe { alloc::alloc_zeroed(layout) } as *mut BlockNode<T>;
        if block.is_null() {
            alloc::handle_alloc_error(layout);
        }
        block
    }

    /// release a block back to the global allocator
    ///
    /// # Safety
    ///
    /// `block` must come from `BlockNode::new`, be owned by the caller and
    /// not be reachable from any chain or free list
    pub unsafe fn free(block: *mut BlockNode<T>) {
        alloc::dealloc(block as *mut u8, Layout::new::<BlockNode<T>>());
    }

    /// write index with data
    #[inline]
    pub fn set(&self, index: u64, v: NonNull<T>) {
        unsafe {
            let slot = self.data.get_unchecked(offset(index));
            *slot.value.get() = Some(v);
        }
    }

    /// read out indexed value, the slot keeps its content until overwritten
    #[inline]
    pub fn get(&self, index: u64) -> Option<NonNull<T>> {
        unsafe {
            let slot = self.data.get_unchecked(offset(index));
            *slot.value.get()
        }
    }

    /// bulk get until the end of this block
    /// you must make sure that end is not passing the end of this block
    /// use bulk_end() for the end para
    #[inline]
    pub fn bulk_get<V: Extend<NonNull<T>>>(&self, start: u64, end: u64, vec: &mut V) -> usize {
        let size = end.wrapping_sub(start) as usize;
        vec.extend((0..size as u64).filter_map(|i| self.get(start.wrapping_add(i))));
        size
    }
}

/// return the bulk end with in the block
#[inline]
pub fn bulk_end(start: u64, end: u64) -> u64 {
    let size0 = end.wrapping_sub(start);
    let size1 = (BLOCK_SIZE - offset(start)) as u64;
    // only pop within a block
    start.wrapping_add(cmp::min(size0, size1))
}
