//! bounded busy wait used by the benchmark drivers
//!
//! this is not part of the queue contract, the queues never wait

use std::hint;

/// busy wait for `n` iterations without touching shared memory
#[inline]
pub fn spin(n: usize) {
    for _ in 0..hint::black_box(n) {
        hint::spin_loop();
    }
}
