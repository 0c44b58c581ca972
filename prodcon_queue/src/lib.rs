//! Lock-free single producer single consumer queues.
//!
//! Both queues pass opaque `NonNull<T>` handles from exactly one producer
//! thread to exactly one consumer thread. The queues never read, drop or
//! free what a handle points to, and neither operation ever blocks:
//!
//! * [`bounded::Queue`] is a fixed ring of `N` slots holding up to `N - 1`
//!   handles, `push` reports a full queue by returning `false`.
//! * [`unbounded::Queue`] is a chain of blocks that grows on demand and
//!   recycles drained blocks through a small private free list.
//!
//! An empty queue is reported by `pop` returning `None`.
#![cfg_attr(all(nightly, test), feature(test))]

mod atomic;
mod block_node;
mod block_stack;

pub mod bounded;
pub mod unbounded;

pub use block_node::BLOCK_SIZE;
pub use block_stack::MAX_CACHED_BLOCKS;

use std::ptr::NonNull;

/// The capability shared by the queues.
///
/// Only one thread may ever call `push` and only one thread may ever call
/// `pop` on the same queue, the two may be different threads.
pub trait SpscQueue<T>: Send + Sync {
    /// push a handle, return false if the queue is full
    fn push(&self, v: NonNull<T>) -> bool;

    /// pop the oldest handle, return None if the queue is empty
    fn pop(&self) -> Option<NonNull<T>>;

    /// number of handles in the queue, only a snapshot under concurrency
    fn len(&self) -> usize;

    /// if the queue is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}



#[cfg(all(nightly, test))]
mod bench {
    extern crate test;
    use self::test::Bencher;

    use super::test_queue::{PpBlockPush, ScBlockPop};
    use super::*;
    use std::sync::Arc;
    use std::thread;

    static ITEM: usize = 1;

    fn multi_1p1c<Q: SpscQueue<usize> + Default + 'static>(b: &mut Bencher) {
        b.iter(|| {
            let q = Arc::new(Q::default());
            let total_work: usize = 1_000_000;
            let _q = q.clone();
            thread::spawn(move || {
                for _ in 0..total_work {
                    _q.block_push(NonNull::from(&ITEM));
                }
            });

            for _ in 0..total_work {
                q.block_pop();
            }
        });
    }

    #[bench]
    fn bounded_1p1c_bench(b: &mut Bencher) {
        multi_1p1c::<bounded::Queue<usize, 4096>>(b);
    }

    #[bench]
    fn unbounded_1p1c_bench(b: &mut Bencher) {
        multi_1p1c::<unbounded::Queue<usize>>(b);
    }

    #[bench]
    fn unbounded_single_thread(b: &mut Bencher) {
        let q = unbounded::Queue::new();
        b.iter(|| {
            q.push(NonNull::from(&ITEM));
            assert_eq!(q.pop(), Some(NonNull::from(&ITEM)));
        });
    }

    #[bench]
    fn unbounded_bulk_pop_1p1c(b: &mut Bencher) {
        b.iter(|| {
            let q = Arc::new(unbounded::Queue::new());
            let total_work: usize = 1_000_000;
            let _q = q.clone();
            thread::spawn(move || {
                for _ in 0..total_work {
                    _q.push(NonNull::from(&ITEM));
                }
            });

            let mut size = 0;
            while size < total_work {
                size += q.bulk_pop().len();
            }
        });
    }
}
