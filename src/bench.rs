//! producer consumer throughput benchmark
//!
//! one producer pushes a configured number of item handles followed by an
//! end marker, one consumer pops until it sees the end marker. the run is
//! timed with the wall clock from spawning the threads until both joined.

use std::fmt;
use std::io;
use std::ptr::NonNull;
use std::time::{Duration, Instant};

use core_affinity::CoreId;
use crossbeam::thread::Scope;
use prodcon_queue::{bounded, unbounded, SpscQueue};

use crate::config::config;
use crate::spin::spin;

/// slots of the bounded queue used by `bench_all`
pub const BOUNDED_SLOTS: usize = 4096;

/// marker type behind the handles moved through a benchmarked queue
#[derive(Debug)]
pub struct Token(u8);

static ITEM: Token = Token(1);
static END: Token = Token(2);

/// handle of a regular item
#[inline]
pub fn item() -> NonNull<Token> {
    NonNull::from(&ITEM)
}

/// handle that tells the consumer the stream is over
#[inline]
pub fn end() -> NonNull<Token> {
    NonNull::from(&END)
}

/// how the drivers behave around each queue operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// spin after a failed push or an empty pop
    pub backoff: bool,
    /// spin after every transferred item
    pub work: bool,
    /// busy wait length
    pub spin: usize,
}

impl Policy {
    /// snapshot of the global configuration
    pub fn from_config() -> Self {
        let cfg = config();
        Policy {
            backoff: cfg.get_backoff(),
            work: cfg.get_work(),
            spin: cfg.get_spin(),
        }
    }

    #[inline]
    fn push<Q: SpscQueue<Token> + ?Sized>(&self, q: &Q, v: NonNull<Token>) {
        while !q.push(v) {
            if self.backoff {
                spin(self.spin);
            }
        }
    }
}

/// producer side: push `to_push` items then the end marker
pub fn push_queue<Q: SpscQueue<Token> + ?Sized>(q: &Q, to_push: usize, policy: Policy) {
    for _ in 0..to_push {
        policy.push(q, item());
        if policy.work {
            spin(policy.spin);
        }
    }
    policy.push(q, end());
}

/// consumer side: pop until the end marker, return the number of items
pub fn pop_queue<Q: SpscQueue<Token> + ?Sized>(q: &Q, policy: Policy) -> usize {
    let end = end();
    let mut received = 0;
    loop {
        match q.pop() {
            Some(v) if v == end => return received,
            Some(_) => {
                received += 1;
                if policy.work {
                    spin(policy.spin);
                }
            }
            None => {
                if policy.backoff {
                    spin(policy.spin);
                }
            }
        }
    }
}

/// result of one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub name: String,
    pub items: usize,
    pub elapsed: Duration,
}

impl BenchReport {
    /// transferred items per second
    pub fn items_per_sec(&self) -> f64 {
        self.items as f64 / self.elapsed.as_secs_f64()
    }

    /// nanoseconds spent per transferred item
    pub fn ns_per_item(&self) -> f64 {
        if self.items == 0 {
            return 0.0;
        }
        self.elapsed.as_nanos() as f64 / self.items as f64
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "It took {} {} seconds to push/pop {} elements",
            self.name,
            self.elapsed.as_secs_f64(),
            self.items
        )?;
        write!(
            f,
            "{} pushed/popped {} elements per second, {} ns per element",
            self.name,
            self.items_per_sec(),
            self.ns_per_item()
        )
    }
}

fn worker_failed(name: &str, role: &str) -> io::Error {
    error!("{} {} thread panicked", name, role);
    io::Error::new(io::ErrorKind::Other, format!("{name}: {role} thread panicked"))
}

// two distinct cores for the producer and the consumer
fn pick_cores(pin: bool) -> (Option<CoreId>, Option<CoreId>) {
    if !pin {
        return (None, None);
    }
    if num_cpus::get() < 2 {
        warn!("only one cpu available, threads are not pinned");
        return (None, None);
    }
    match core_affinity::get_core_ids() {
        Some(ids) if ids.len() >= 2 => (Some(ids[0]), Some(ids[1])),
        _ => {
            warn!("can't get two core ids, threads are not pinned");
            (None, None)
        }
    }
}

fn pin_to(core: Option<CoreId>) {
    if let Some(core) = core {
        if !core_affinity::set_for_current(core) {
            warn!("failed to pin {:?} to {:?}", std::thread::current().name(), core);
        }
    }
}

fn run_pair<'env, Q: SpscQueue<Token>>(
    s: &Scope<'env>,
    q: &'env Q,
    name: &str,
    items: usize,
    policy: Policy,
) -> io::Result<usize> {
    let (producer_core, consumer_core) = pick_cores(config().get_pin_threads());

    let producer = s
        .builder()
        .name(format!("{name}-producer"))
        .spawn(move |_| {
            pin_to(producer_core);
            push_queue(q, items, policy)
        })?;

    let consumer = match s
        .builder()
        .name(format!("{name}-consumer"))
        .spawn(move |_| {
            pin_to(consumer_core);
            pop_queue(q, policy)
        }) {
        Ok(h) => h,
        Err(e) => {
            error!("{} failed to spawn consumer, err={}", name, e);
            // drain here so the producer can finish
            pop_queue(q, policy);
            return Err(e);
        }
    };

    if producer.join().is_err() {
        // let the consumer see the end of the stream
        policy.push(q, end());
        let _ = consumer.join();
        return Err(worker_failed(name, "producer"));
    }
    consumer.join().map_err(|_| worker_failed(name, "consumer"))
}

/// run the configured benchmark over a fresh `Q`
pub fn bench_queue<Q>(name: &str) -> io::Result<BenchReport>
where
    Q: SpscQueue<Token> + Default,
{
    let items = config().get_items();
    let policy = Policy::from_config();
    info!("bench {} start, items={}, policy={:?}", name, items, policy);

    let q = Q::default();
    let start = Instant::now();
    let received = crossbeam::scope(|s| run_pair(s, &q, name, items, policy))
        .map_err(|_| worker_failed(name, "benchmark"))??;
    let elapsed = start.elapsed();

    if received != items {
        error!("{} lost items, pushed={} popped={}", name, items, received);
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{name}: pushed {items} items but popped {received}"),
        ));
    }
    if !q.is_empty() {
        error!("{} not drained, {} items left", name, q.len());
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{name}: {} items left after the end marker", q.len()),
        ));
    }

    info!("bench {} done in {:?}", name, elapsed);
    Ok(BenchReport {
        name: name.to_owned(),
        items,
        elapsed,
    })
}

/// benchmark the unbounded queue and the bounded queue one after another
pub fn bench_all() -> io::Result<Vec<BenchReport>> {
    Ok(vec![
        bench_queue::<unbounded::Queue<Token>>("Unbounded Queue")?,
        bench_queue::<bounded::Queue<Token, BOUNDED_SLOTS>>("Bounded Queue")?,
    ])
}
