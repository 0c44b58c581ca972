use crossbeam_utils::CachePadded;

use crate::atomic::AtomicUsize;
use crate::SpscQueue;

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::Ordering;

/// A slot in the ring.
struct Slot<T> {
    value: UnsafeCell<Option<NonNull<T>>>,
}

impl<T> Slot<T> {
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: Self = Self {
        value: UnsafeCell::new(None),
    };
}

/// spsc bounded queue over a fixed ring of `N` slots
///
/// one slot always stays empty to tell full from empty, so at most `N - 1`
/// handles are resident at a time. the ring and both cursors live on their
/// own cache lines, the write cursor is only mutated by the producer and the
/// read cursor only by the consumer.
///
/// only one thread may call `push` and only one thread may call `pop`
pub struct Queue<T, const N: usize> {
    slots: CachePadded<[Slot<T>; N]>,
    // owned by the consumer
    read: CachePadded<AtomicUsize>,
    // owned by the producer
    write: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send, const N: usize> Send for Queue<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for Queue<T, N> {}

impl<T, const N: usize> Queue<T, N> {
    const VALID_SIZE: () = assert!(N >= 2, "bounded queue needs at least 2 slots");

    /// create an empty queue
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_SIZE;
        Queue {
            slots: CachePadded::new([Slot::EMPTY; N]),
            read: CachePadded::new(AtomicUsize::new(0)),
            write: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// number of handles the queue can hold at once
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    fn next(index: usize) -> usize {
        let next = index + 1;
        if next == N {
            0
        } else {
            next
        }
    }

    /// push a handle, return false if the queue is full
    pub fn push(&self, v: NonNull<T>) -> bool {
        let write = unsafe { self.write.unsync_load() };
        let next = Self::next(write);
        // pairs with the release store in pop, the slot is free to reuse
        if next == self.read.load(Ordering::Acquire) {
            // queue is full
            return false;
        }

        unsafe {
            let slot = self.slots.get_unchecked(write);
            *slot.value.get() = Some(v);
        }
        // publish the slot together with the cursor
        self.write.store(next, Ordering::Release);
        true
    }

    /// pop the oldest handle, if it's empty return None
    pub fn pop(&self) -> Option<NonNull<T>> {
        let read = unsafe { self.read.unsync_load() };
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }

        let v = unsafe {
            let slot = self.slots.get_unchecked(read);
            *slot.value.get()
        };
        self.read.store(Self::next(read), Ordering::Release);
        v
    }

    /// get the size of queue
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        (write + N - read) % N
    }

    /// if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Queue::new()
    }
}

impl<T, const N: usize> fmt::Debug for Queue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("bounded::Queue")
            .field("capacity", &self.capacity())
            .field("read", &*self.read)
            .field("write", &*self.write)
            .finish()
    }
}

impl<T: Send, const N: usize> SpscQueue<T> for Queue<T, N> {
    #[inline]
    fn push(&self, v: NonNull<T>) -> bool {
        Queue::push(self, v)
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

    fn handles(v: &[u32]) -> Vec<NonNull<u32>> {
        v.iter().map(NonNull::from).collect()
    }

    #[test]
    fn queue_sanity() {
        let items = [0, 1, 2, 3];
        let h = handles(&items);
        let (a, b, c, d) = (h[0], h[1], h[2], h[3]);
        let q = Queue::<u32, 4>::new();
        assert_eq!(q.capacity(), 3);
        assert!(q.is_empty());

        assert!(q.push(a));
        assert!(q.push(b));
        assert!(q.push(c));
        assert_eq!(q.len(), 3);
        // one slot is always kept free
        assert!(!q.push(d));

        assert_eq!(q.pop(), Some(a));
        assert!(q.push(d));
        assert_eq!(q.pop(), Some(b));
        assert_eq!(q.pop(), Some(c));
        assert_eq!(q.pop(), Some(d));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
        println!("{q:?}");
    }

    #[test]
    fn full_queue_is_unchanged() {
        let items: Vec<u32> = (0..8).collect();
        let h = handles(&items);
        let q = Queue::<u32, 8>::new();
        for v in &h[..7] {
            assert!(q.push(*v));
        }
        assert!(!q.push(h[7]));
        assert!(!q.push(h[7]));
        assert_eq!(q.len(), 7);
        for v in &h[..7] {
            assert_eq!(q.pop(), Some(*v));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn smallest_queue_holds_one() {
        let x = 7u32;
        let q = Queue::<u32, 2>::new();
        for _ in 0..10 {
            assert!(q.push(NonNull::from(&x)));
            assert!(!q.push(NonNull::from(&x)));
            assert_eq!(q.pop(), Some(NonNull::from(&x)));
            assert_eq!(q.pop(), None);
        }
    }

    #[test]
    fn cursors_wrap_around() {
        let items: Vec<u32> = (0..1000).collect();
        let q = Queue::<u32, 5>::new();
        let mut popped = Vec::new();
        for chunk in items.chunks(3) {
            for v in chunk {
                assert!(q.push(NonNull::from(v)));
            }
            while let Some(v) = q.pop() {
                popped.push(unsafe { *v.as_ref() });
            }
        }
        assert_eq!(popped, items);
    }
}
