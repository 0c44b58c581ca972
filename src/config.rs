//! `prodcon` benchmark configuration interface
//!

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// default configs
const DEFAULT_ITEMS: usize = 300_000_000;
// iterations of the busy wait used for backoff and simulated work
const DEFAULT_SPIN: usize = 30;

static ITEMS: AtomicUsize = AtomicUsize::new(DEFAULT_ITEMS);
static SPIN: AtomicUsize = AtomicUsize::new(DEFAULT_SPIN);
static BACKOFF: AtomicBool = AtomicBool::new(false);
static WORK: AtomicBool = AtomicBool::new(true);
static PIN_THREADS: AtomicBool = AtomicBool::new(false);

/// `prodcon` configuration type
#[derive(Debug, Clone, Copy)]
pub struct Config;

/// get the benchmark configuration instance
pub fn config() -> Config {
    Config
}

/// the config should be set before a benchmark starts
///
/// a running benchmark reads every value once when it starts, later
/// changes apply to the next run
impl Config {
    /// set how many items the producer pushes per run
    ///
    /// if you pass 0 to it, will use internal default
    pub fn set_items(&self, items: usize) -> &Self {
        let items = if items == 0 { DEFAULT_ITEMS } else { items };
        info!("set items={:?}", items);
        ITEMS.store(items, Ordering::Release);
        self
    }

    /// get the number of items pushed per run
    pub fn get_items(&self) -> usize {
        ITEMS.load(Ordering::Acquire)
    }

    /// set the busy wait length used by `spin`
    pub fn set_spin(&self, spin: usize) -> &Self {
        info!("set spin={:?}", spin);
        SPIN.store(spin, Ordering::Release);
        self
    }

    /// get the busy wait length
    pub fn get_spin(&self) -> usize {
        SPIN.load(Ordering::Acquire)
    }

    /// spin after a failed push or an empty pop instead of retrying at once
    pub fn set_backoff(&self, backoff: bool) -> &Self {
        info!("set backoff={:?}", backoff);
        BACKOFF.store(backoff, Ordering::Release);
        self
    }

    /// get the backoff flag
    pub fn get_backoff(&self) -> bool {
        BACKOFF.load(Ordering::Acquire)
    }

    /// spin after every transferred item to simulate some work on both sides
    pub fn set_work(&self, work: bool) -> &Self {
        info!("set work={:?}", work);
        WORK.store(work, Ordering::Release);
        self
    }

    /// get the simulated work flag
    pub fn get_work(&self) -> bool {
        WORK.load(Ordering::Acquire)
    }

    /// pin the producer and the consumer to two distinct cores
    pub fn set_pin_threads(&self, pin: bool) -> &Self {
        info!("set pin threads={:?}", pin);
        PIN_THREADS.store(pin, Ordering::Release);
        self
    }

    /// get the thread pinning flag
    pub fn get_pin_threads(&self) -> bool {
        PIN_THREADS.load(Ordering::Acquire)
    }
}
