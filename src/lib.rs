//! # Lock-free Producer Consumer Queues
//!
//! `prodcon` ships two single producer single consumer queues for passing
//! pointer sized handles between exactly two threads, together with the
//! throughput benchmark that drives them.
//!
//! ## Features
//!
//! * Fixed capacity ring buffer queue without allocation after construction
//! * Unbounded block linked queue with a private block recycling free list
//! * Cache line isolated cursors on both queues
//! * Non blocking `push`/`pop`, full and empty are plain return values
//! * Configurable producer/consumer benchmark with optional core pinning
//!

#[macro_use]
#[doc(hidden)]
extern crate log;

mod config;

pub mod bench;
pub mod spin;

pub use bench::{bench_all, bench_queue, BenchReport, Policy, Token};
pub use config::{config, Config};
pub use prodcon_queue::{bounded, unbounded, SpscQueue, BLOCK_SIZE, MAX_CACHED_BLOCKS};
